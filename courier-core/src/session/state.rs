//! Session lifecycle states and the pure transition function
//!
//! `transition` maps a state and a lifecycle event to the next state plus the
//! side effects the session must carry out. It has no I/O, so the whole state
//! machine is testable without a connection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::CloseReason;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Connection setup in progress
    Initializing,
    /// A pairing artifact is waiting to be presented
    WaitingForPairing,
    /// Link open; the queue may drain
    Connected,
    /// Link lost; a reconnect is pending
    Disconnected,
    /// Remote logout; terminal
    LoggedOut,
    /// Setup failed; terminal unless explicitly reinitialized
    Error,
}

impl SessionState {
    /// Wire name, as shown to API clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::WaitingForPairing => "WAITING_FOR_PAIRING",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::LoggedOut => "LOGGED_OUT",
            Self::Error => "ERROR",
        }
    }

    /// No automatic transition leaves this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LoggedOut | Self::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    PairingChallenge(String),
    Opened,
    Closed(CloseReason),
    SetupFailed(String),
}

/// Side effects requested by a transition, executed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the pairing artifact
    StorePairing(String),
    /// Drop the pairing artifact
    ClearPairing,
    /// Start the drain loop if there is work
    TriggerDrain,
    /// Re-run initialization according to the reconnect policy
    ScheduleReconnect,
    /// Drop the connection handle for good
    Teardown,
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub effects: Vec<Effect>,
    /// False when the event was ignored in the current state
    pub applied: bool,
}

impl Transition {
    fn to(next: SessionState, effects: Vec<Effect>) -> Self {
        Self {
            next,
            effects,
            applied: true,
        }
    }

    fn ignore(current: SessionState) -> Self {
        Self {
            next: current,
            effects: Vec::new(),
            applied: false,
        }
    }
}

/// Compute the next state and effects for `event` in `state`
pub fn transition(state: SessionState, event: &LifecycleEvent) -> Transition {
    use SessionState::*;

    match (state, event) {
        (LoggedOut, _) => Transition::ignore(state),
        // Only an explicit reinitialize leaves ERROR.
        (Error, _) => Transition::ignore(state),

        (_, LifecycleEvent::SetupFailed(_)) => {
            Transition::to(Error, vec![Effect::ClearPairing, Effect::Teardown])
        }

        (Initializing | WaitingForPairing | Disconnected, LifecycleEvent::PairingChallenge(code)) => {
            Transition::to(WaitingForPairing, vec![Effect::StorePairing(code.clone())])
        }
        (Connected, LifecycleEvent::PairingChallenge(_)) => Transition::ignore(state),

        (Initializing | WaitingForPairing | Disconnected, LifecycleEvent::Opened) => {
            Transition::to(Connected, vec![Effect::ClearPairing, Effect::TriggerDrain])
        }
        (Connected, LifecycleEvent::Opened) => Transition::ignore(state),

        (_, LifecycleEvent::Closed(reason)) if reason.is_logged_out() => {
            Transition::to(LoggedOut, vec![Effect::ClearPairing, Effect::Teardown])
        }
        (Initializing | WaitingForPairing | Connected, LifecycleEvent::Closed(_)) => {
            Transition::to(
                Disconnected,
                vec![Effect::ClearPairing, Effect::ScheduleReconnect],
            )
        }
        // A reconnect link failed before opening; try again.
        (Disconnected, LifecycleEvent::Closed(_)) => {
            Transition::to(Disconnected, vec![Effect::ScheduleReconnect])
        }
    }
}
