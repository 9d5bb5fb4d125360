//! Paced queue processor
//!
//! At most one drain loop runs per session. It delivers the queue head,
//! records the outcome, waits the pacing interval, and repeats until the
//! queue is empty or the link drops. Failed items are dropped, never retried.

use tracing::debug;

use super::handle::Session;
use super::state::SessionState;

/// Clears the draining flag if the loop ends without doing so itself
struct DrainGuard<'a> {
    session: &'a Session,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.inner.lock().draining = false;
        }
    }
}

impl Session {
    /// Start a drain loop in the background
    pub(super) fn trigger_drain(&self) {
        let Some(session) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            session.drain().await;
        });
    }

    /// Process the queue in FIFO order
    ///
    /// Runs automatically after `enqueue` and on reconnection. Returns the
    /// number of attempts made; a call while another loop is active does
    /// nothing and returns 0.
    pub async fn drain(&self) -> usize {
        {
            let mut inner = self.inner.lock();
            if inner.draining || inner.state != SessionState::Connected || inner.queue.is_empty()
            {
                return 0;
            }
            inner.draining = true;
        }

        let mut guard = DrainGuard {
            session: self,
            armed: true,
        };
        let mut attempts = 0;

        loop {
            let next = {
                let mut inner = self.inner.lock();
                let ready = inner.state == SessionState::Connected && !inner.removed;
                let next = match (ready, inner.connection.clone()) {
                    (true, Some(connection)) => inner.queue.pop().map(|m| (m, connection)),
                    _ => None,
                };
                if next.is_none() {
                    // Cleared under the same lock as the emptiness check so a
                    // concurrent enqueue either sees this loop or starts one.
                    inner.draining = false;
                    guard.armed = false;
                }
                next
            };
            let Some((message, connection)) = next else {
                break;
            };

            let outcome = connection.send(&message.destination, &message.payload).await;
            self.record_delivery(message, &outcome, true).await;
            attempts += 1;

            tokio::time::sleep(self.config.pacing_interval()).await;
        }

        debug!(session_id = %self.id(), attempts, "drain finished");
        attempts
    }
}
