//! Per-session credential persistence
//!
//! Connections hand out opaque credential documents whenever their
//! authentication material changes. Sessions persist them so a link can be
//! re-established after a restart without pairing again.

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

/// Opaque credential document for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Protocol-specific material, never interpreted by the core
    pub data: serde_json::Value,
    /// When the material was last updated
    pub updated_at: DateTime<Utc>,
}

impl Credentials {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            updated_at: Utc::now(),
        }
    }
}

/// Storage for per-session credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load credentials, `None` when the session was never paired
    async fn load(&self, session_id: &str) -> Result<Option<Credentials>, CredentialError>;

    /// Durably replace the stored credentials
    async fn save(&self, session_id: &str, credentials: &Credentials)
    -> Result<(), CredentialError>;

    /// Remove all stored state for the session; removing nothing is not an error
    async fn remove(&self, session_id: &str) -> Result<(), CredentialError>;
}
