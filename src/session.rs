//! Persisted client-side session storage.
//!
//! The dashboard keeps its bearer token in a small JSON key/value file. The
//! token is looked up on every outgoing request with a non-blocking read, so a
//! login or logout done by another process is picked up without a restart.

use std::collections::HashMap;
use std::path::PathBuf;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "aiauto_token";

/// Storage key holding the serialized signed-in user.
pub const USER_KEY: &str = "aiauto_user";

#[derive(Debug, Clone)]
pub enum SessionStore {
    /// JSON object on disk, re-read on every lookup.
    File(PathBuf),
    /// Fixed in-memory values.
    Memory(HashMap<String, String>),
}

impl SessionStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SessionStore::File(path.into())
    }

    /// A store holding only the given token (or nothing).
    pub fn with_token(token: Option<&str>) -> Self {
        let mut values = HashMap::new();
        if let Some(token) = token {
            values.insert(TOKEN_KEY.to_string(), token.to_string());
        }
        SessionStore::Memory(values)
    }

    /// Reads a single value. Missing or unreadable storage reads as absent.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self {
            SessionStore::Memory(values) => values.get(key).cloned(),
            SessionStore::File(path) => {
                let raw = match tokio::fs::read_to_string(path).await {
                    Ok(raw) => raw,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
                    Err(e) => {
                        tracing::warn!("Failed to read session file {}: {}", path.display(), e);
                        return None;
                    }
                };

                match serde_json::from_str::<HashMap<String, serde_json::Value>>(&raw) {
                    Ok(values) => values.get(key).and_then(|v| match v {
                        serde_json::Value::String(s) => Some(s.clone()),
                        serde_json::Value::Null => None,
                        other => Some(other.to_string()),
                    }),
                    Err(e) => {
                        tracing::warn!("Session file {} is not valid JSON: {}", path.display(), e);
                        None
                    }
                }
            }
        }
    }

    /// Current bearer token, if one is stored and non-empty.
    pub async fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY).await.filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_missing_file_has_no_token() {
        let store = SessionStore::file(temp_path("session-missing"));
        assert_eq!(store.token().await, None);
    }

    #[tokio::test]
    async fn test_file_token_is_reread() {
        let path = temp_path("session-reread");
        std::fs::write(&path, r#"{"aiauto_token": "first"}"#).unwrap();
        let store = SessionStore::file(&path);
        assert_eq!(store.token().await.as_deref(), Some("first"));

        std::fs::write(&path, r#"{"aiauto_token": "second", "aiauto_user": {"name": "Ana"}}"#)
            .unwrap();
        assert_eq!(store.token().await.as_deref(), Some("second"));
        assert_eq!(store.get(USER_KEY).await.as_deref(), Some(r#"{"name":"Ana"}"#));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_malformed_file_and_blank_token() {
        let path = temp_path("session-malformed");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(SessionStore::file(&path).token().await, None);

        std::fs::write(&path, r#"{"aiauto_token": "  "}"#).unwrap();
        assert_eq!(SessionStore::file(&path).token().await, None);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_memory_store() {
        assert_eq!(SessionStore::with_token(Some("abc")).token().await.as_deref(), Some("abc"));
        assert_eq!(SessionStore::with_token(None).token().await, None);
    }
}
