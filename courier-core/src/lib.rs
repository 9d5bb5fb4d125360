//! courier-core: Core library for the courier messaging gateway
//!
//! This crate provides the foundational components for courier:
//!
//! - **Sessions** - [`Session`] owns one tenant's link, lifecycle state and paced outbound queue
//! - **Registry** - [`SessionRegistry`] creates, looks up and tears down sessions
//! - **Connections** - [`ConnectionFactory`] and [`Connection`] abstract the protocol client
//! - **Credentials** - [`CredentialStore`] persists per-session authentication material
//! - **Event system** - [`EventBus`] trait and [`MemoryEventBus`] for real-time event distribution
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use courier_core::{
//!     MemoryCredentialStore, MemoryEventBus, SessionConfig, SessionRegistry,
//!     SimulatedConnectionFactory,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SessionRegistry::new(
//!     Arc::new(SimulatedConnectionFactory::default()),
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(MemoryEventBus::new(1000)),
//!     SessionConfig::default(),
//! );
//!
//! let session = registry.create("storefront", "tenant-1").await;
//! // Once CONNECTED:
//! session.enqueue("+1 555 0100", "Your order has shipped")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 SessionRegistry                  │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │                  Session                   │  │
//! │  │  ┌──────────────┐   ┌───────────────────┐  │  │
//! │  │  │ state machine│◀──│ connection events │  │  │
//! │  │  └──────────────┘   └───────────────────┘  │  │
//! │  │  ┌──────────────┐   ┌───────────────────┐  │  │
//! │  │  │ outbound FIFO│──▶│ paced drain loop  │  │  │
//! │  │  └──────────────┘   └───────────────────┘  │  │
//! │  └────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod events;
pub mod session;

// Re-export key types for convenience
pub use config::{ReconnectConfig, SessionConfig};
pub use connection::{
    CloseReason, ConnectRequest, Connection, ConnectionEvent, ConnectionFactory, ConnectionLink,
    MockConnectionFactory, SimulatedConnectionFactory,
};
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use error::{ConnectionError, CredentialError, SessionError};
pub use events::{CourierEvent, EventBus, EventSeq, MemoryEventBus};
pub use session::{
    AttemptStatus, DeliveryRecord, Session, SessionRegistry, SessionSnapshot, SessionState,
};
