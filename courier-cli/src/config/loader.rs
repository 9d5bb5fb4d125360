use std::path::{Path, PathBuf};

use anyhow::Result;
use courier_core::SessionConfig;
use directories::ProjectDirs;

use super::types::{
    CourierConfig, DEFAULT_HOST, DEFAULT_PORT, RawCourierConfig, RawServerConfig,
    RawSessionConfig, RawStorageConfig, ServerConfig, StorageConfig,
};

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "COURIER_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CourierConfig> {
        let mut raw = RawCourierConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Load a single config file, falling back to defaults when it is missing
    pub fn load_from_path(path: &Path) -> Result<CourierConfig> {
        if !path.exists() {
            return Ok(CourierConfig::default());
        }
        Ok(Self::finalize(Self::read_raw(path)?))
    }

    fn read_raw(path: &Path) -> Result<RawCourierConfig> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "courier").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with COURIER_PROJECT_CONFIG_DIR (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".courier/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCourierConfig, overlay: RawCourierConfig) -> RawCourierConfig {
        RawCourierConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            session: RawSessionConfig {
                pacing_interval_ms: overlay
                    .session
                    .pacing_interval_ms
                    .or(base.session.pacing_interval_ms),
                queue_capacity: overlay
                    .session
                    .queue_capacity
                    .or(base.session.queue_capacity),
                history_limit: overlay.session.history_limit.or(base.session.history_limit),
                address_domain: overlay
                    .session
                    .address_domain
                    .or(base.session.address_domain),
                reconnect: overlay.session.reconnect.or(base.session.reconnect),
            },
            storage: RawStorageConfig {
                credentials_dir: overlay
                    .storage
                    .credentials_dir
                    .or(base.storage.credentials_dir),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCourierConfig) -> CourierConfig {
        let defaults = SessionConfig::default();
        CourierConfig {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            session: SessionConfig {
                pacing_interval_ms: raw
                    .session
                    .pacing_interval_ms
                    .unwrap_or(defaults.pacing_interval_ms),
                queue_capacity: raw.session.queue_capacity.unwrap_or(defaults.queue_capacity),
                history_limit: raw.session.history_limit.unwrap_or(defaults.history_limit),
                address_domain: raw
                    .session
                    .address_domain
                    .unwrap_or(defaults.address_domain),
                reconnect: raw.session.reconnect.unwrap_or(defaults.reconnect),
            },
            storage: match raw.storage.credentials_dir {
                Some(credentials_dir) => StorageConfig { credentials_dir },
                None => StorageConfig::default(),
            },
        }
    }

    /// Save config to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(config: &CourierConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(config)?;
        std::fs::write(path, toml)?;

        Ok(())
    }
}
