//! File-backed credential store
//!
//! Layout: `<root>/<session_id>/creds.json`. Writes go to a temp file that is
//! renamed over the old one so a crash never leaves a torn document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{CredentialStore, Credentials};
use crate::error::CredentialError;

/// Credentials file name inside each session directory
const CREDENTIALS_FILE: &str = "creds.json";

/// Stores each session's credentials in its own directory
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    /// Create a store rooted at `root`; directories are created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the given session's state
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, session_id: &str) -> Result<Option<Credentials>, CredentialError> {
        let path = self.session_dir(session_id).join(CREDENTIALS_FILE);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(
        &self,
        session_id: &str,
        credentials: &Credentials,
    ) -> Result<(), CredentialError> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await?;

        let content = serde_json::to_string_pretty(credentials)?;
        let tmp = dir.join(format!("{}.tmp", CREDENTIALS_FILE));
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, dir.join(CREDENTIALS_FILE)).await?;

        debug!(session_id, "credentials persisted");
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), CredentialError> {
        match fs::remove_dir_all(self.session_dir(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
