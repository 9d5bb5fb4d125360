//! Connection handle abstraction

pub mod mock;
pub mod simulated;
pub mod traits;

// Re-export key types for convenience
pub use mock::{MockConnection, MockConnectionFactory, MockLink, SendAttempt};
pub use simulated::SimulatedConnectionFactory;
pub use traits::{
    CloseReason, ConnectRequest, Connection, ConnectionEvent, ConnectionFactory, ConnectionLink,
};
