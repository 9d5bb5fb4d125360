//! Session lifecycle, paced delivery and the registry

pub mod address;
mod drain;
pub mod handle;
pub mod queue;
pub mod reconnect;
pub mod registry;
pub mod state;

pub use address::normalize_destination;
pub use handle::{Session, SessionSnapshot};
pub use queue::{AttemptStatus, DeliveryLog, DeliveryRecord, OutboundQueue, QueuedMessage};
pub use reconnect::ReconnectPolicy;
pub use registry::SessionRegistry;
pub use state::{Effect, LifecycleEvent, SessionState, Transition, transition};
