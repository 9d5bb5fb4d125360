//! XDG Base Directory paths for courier.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths. This matches tools like gh, docker, kubectl.

use std::path::PathBuf;

const APP_DIR: &str = "courier";

/// Get the courier config directory.
///
/// Returns `$XDG_CONFIG_HOME/courier` if set, otherwise `~/.config/courier`.
///
/// # Examples
///
/// ```
/// use courier_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the courier data directory.
///
/// Returns `$XDG_DATA_HOME/courier` if set, otherwise `~/.local/share/courier`.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default root for per-session credential directories.
///
/// # Examples
///
/// ```
/// use courier_paths::sessions_dir;
///
/// let creds = sessions_dir().join("a1b2").join("creds.json");
/// ```
pub fn sessions_dir() -> PathBuf {
    data_dir().join("sessions")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(var) {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_ends_with_courier() {
        let path = config_dir();
        assert!(
            path.ends_with("courier"),
            "config_dir should end with 'courier'"
        );
    }

    #[test]
    #[serial]
    fn test_data_dir_ends_with_courier() {
        let path = data_dir();
        assert!(path.ends_with("courier"), "data_dir should end with 'courier'");
    }

    #[test]
    #[serial]
    fn test_sessions_dir_is_under_data_dir() {
        assert_eq!(sessions_dir(), data_dir().join("sessions"));
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
        }
        let path = config_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-config/courier"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_data_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_DATA_HOME", "/tmp/test-data");
        }
        let path = data_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-data/courier"));
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
