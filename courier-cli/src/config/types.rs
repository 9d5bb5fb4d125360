use std::path::PathBuf;

use courier_core::{ReconnectConfig, SessionConfig};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCourierConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub session: RawSessionConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Session behavior as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSessionConfig {
    pub pacing_interval_ms: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub history_limit: Option<usize>,
    pub address_domain: Option<String>,
    /// Replaced as a whole when present
    pub reconnect: Option<ReconnectConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    pub credentials_dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CourierConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address the server binds to and the client connects to
    pub host: String,

    /// Port for the courier server
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Root of the per-session credential directories
    pub credentials_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_dir: courier_paths::sessions_dir(),
        }
    }
}

/// Default port for the courier server
pub const DEFAULT_PORT: u16 = 7450;

/// Default host for the courier server
pub const DEFAULT_HOST: &str = "127.0.0.1";
