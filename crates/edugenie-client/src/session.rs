//! Durable session persistence.
//!
//! A session is a bearer token plus the cached user it belongs to. Stores
//! hold exactly two keys, [`TOKEN_KEY`] and [`USER_KEY`], and write them
//! together so a reader never sees a token without its user.
//!
//! Reads never fail: storage and decoding errors are logged and reported as
//! an absent value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ClientError, Result};
use crate::models::UserSummary;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Storage key for the serialized user summary.
pub const USER_KEY: &str = "user";

/// Persistence for the current session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Writes the token and user together.
    async fn set_session(&self, token: &str, user: &UserSummary) -> Result<()>;

    /// The stored token, or `None` if absent or unreadable.
    async fn get_token(&self) -> Option<String>;

    /// The stored user, or `None` if absent or undecodable.
    async fn get_user(&self) -> Option<UserSummary>;

    /// Removes both keys. Clearing an empty store is a no-op.
    async fn clear(&self);

    /// Returns `true` if a token is stored.
    async fn has_session(&self) -> bool {
        self.get_token().await.is_some()
    }
}

/// On-disk layout of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionDocument {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    /// The user as a JSON string, not a nested object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

impl SessionDocument {
    fn user(&self) -> Option<UserSummary> {
        let raw = self.user.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user could not be decoded; treating as absent");
                None
            }
        }
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// A session store backed by a JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so both keys land in one step.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store at `path`. Nothing is touched until the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The session file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_document(&self) -> Option<SessionDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Session file is not valid JSON");
                None
            }
        }
    }

    async fn write_document(&self, document: &SessionDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::session_write(&self.path, e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, content)
            .await
            .map_err(|e| ClientError::session_write(&temp, e.to_string()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| ClientError::session_write(&self.path, e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn set_session(&self, token: &str, user: &UserSummary) -> Result<()> {
        let document = SessionDocument {
            auth_token: Some(token.to_string()),
            user: Some(serde_json::to_string(user)?),
        };
        self.write_document(&document).await?;
        tracing::debug!(path = %self.path.display(), user_id = %user.id, "Session persisted");
        Ok(())
    }

    async fn get_token(&self) -> Option<String> {
        self.read_document()
            .await
            .and_then(|document| document.auth_token)
            .filter(|token| !token.is_empty())
    }

    async fn get_user(&self) -> Option<UserSummary> {
        self.read_document().await.and_then(|document| document.user())
    }

    async fn clear(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Session file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                // Fall back to blanking the keys so the token is not reused.
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove session file");
                if let Err(e) = self.write_document(&SessionDocument::default()).await {
                    tracing::warn!(error = %e, "Failed to blank session file");
                }
            }
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// A session store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<&'static str, String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw value under `key`, bypassing validation.
    pub async fn insert_raw(&self, key: &'static str, value: impl Into<String>) {
        self.entries.write().await.insert(key, value.into());
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set_session(&self, token: &str, user: &UserSummary) -> Result<()> {
        let user = serde_json::to_string(user)?;
        let mut entries = self.entries.write().await;
        entries.insert(TOKEN_KEY, token.to_string());
        entries.insert(USER_KEY, user);
        Ok(())
    }

    async fn get_token(&self) -> Option<String> {
        self.entries
            .read()
            .await
            .get(TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .cloned()
    }

    async fn get_user(&self) -> Option<UserSummary> {
        let entries = self.entries.read().await;
        let raw = entries.get(USER_KEY)?;
        serde_json::from_str(raw)
            .map_err(|e| tracing::warn!(error = %e, "Stored user could not be decoded; treating as absent"))
            .ok()
    }

    async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
    }
}
