//! Durable storage for the access and refresh tokens
//!
//! The [`TokenStore`] trait is the only write path for token material. Two
//! implementations are provided: [`FileTokenStore`], which keeps the tokens in
//! a JSON file so they survive process restarts, and [`MemoryTokenStore`],
//! used by tests and short-lived tooling.
//!
//! No validation of token content happens here; any string is accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Which of the two stored secrets an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key used for this token kind
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Access => "access_token",
            Self::Refresh => "refresh_token",
        }
    }
}

/// Errors raised by token persistence
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("token store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token store at {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value storage for the two session secrets
pub trait TokenStore: Send + Sync {
    /// Read a token; `None` when absent
    fn get(&self, kind: TokenKind) -> Option<String>;

    /// Store a token, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError>;

    /// Remove both tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), StorageError>;

    /// Store both tokens in one step
    ///
    /// Implementations backed by a single document should override this so
    /// the pair lands in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if either value cannot be persisted.
    fn set_pair(&self, access_token: &str, refresh_token: &str) -> Result<(), StorageError> {
        self.set(TokenKind::Access, access_token)?;
        self.set(TokenKind::Refresh, refresh_token)
    }

    /// Whether a non-empty access token is stored
    fn has_access_token(&self) -> bool {
        self.get(TokenKind::Access).is_some_and(|t| !t.is_empty())
    }
}

/// On-disk layout of the token file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
struct TokenRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl TokenRecord {
    fn get(&self, kind: TokenKind) -> Option<&String> {
        match kind {
            TokenKind::Access => self.access_token.as_ref(),
            TokenKind::Refresh => self.refresh_token.as_ref(),
        }
    }

    fn slot(&mut self, kind: TokenKind) -> &mut Option<String> {
        match kind {
            TokenKind::Access => &mut self.access_token,
            TokenKind::Refresh => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Token store persisted as a JSON document
///
/// Reads are served from an in-memory mirror loaded at open time; every write
/// goes to disk first (temp file + rename) and only then updates the mirror.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    record: RwLock<TokenRecord>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading existing tokens if the file exists
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let record = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => TokenRecord::default(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => TokenRecord::default(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        log::debug!("Opened token store at {}", path.display());
        Ok(Self {
            path,
            record: RwLock::new(record),
        })
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn persist(&self, record: &TokenRecord) -> Result<(), StorageError> {
        if record.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(self.io_error(e)),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(record).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = open_private(&tmp_path).map_err(|e| self.io_error(e))?;
        file.write_all(&json).map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))
    }

    fn update(&self, change: impl FnOnce(&mut TokenRecord)) -> Result<(), StorageError> {
        let mut guard = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        self.update(|record| *record.slot(kind) = Some(value.to_string()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.update(|record| *record = TokenRecord::default())
    }

    fn set_pair(&self, access_token: &str, refresh_token: &str) -> Result<(), StorageError> {
        self.update(|record| {
            record.access_token = Some(access_token.to_string());
            record.refresh_token = Some(refresh_token.to_string());
        })
    }
}

/// Process-local token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given tokens
    #[must_use]
    pub fn with_tokens(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        let mut tokens = HashMap::new();
        if let Some(token) = access_token {
            tokens.insert(TokenKind::Access, token.to_string());
        }
        if let Some(token) = refresh_token {
            tokens.insert(TokenKind::Refresh, token.to_string());
        }
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn set_pair(&self, access_token: &str, refresh_token: &str) -> Result<(), StorageError> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.insert(TokenKind::Access, access_token.to_string());
        tokens.insert(TokenKind::Refresh, refresh_token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");

        let store = FileTokenStore::open(&path).unwrap();
        assert_eq!(store.get(TokenKind::Access), None);
        store.set_pair("abc", "def").unwrap();
        drop(store);

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(TokenKind::Access), Some("abc".to_string()));
        assert_eq!(reopened.get(TokenKind::Refresh), Some("def".to_string()));
        assert!(reopened.has_access_token());
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(TokenKind::Access, "abc").unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(store.get(TokenKind::Access), None);

        // Clearing an already empty store is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_accepts_any_string() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::open(dir.path().join("tokens.json")).unwrap();

        store.set(TokenKind::Refresh, "not a jwt \"at all\"").unwrap();
        assert_eq!(
            store.get(TokenKind::Refresh),
            Some("not a jwt \"at all\"".to_string())
        );
        assert!(!store.has_access_token());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{not json").unwrap();

        let result = FileTokenStore::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_memory_store_set_and_clear() {
        let store = MemoryTokenStore::with_tokens(Some("abc"), None);
        assert!(store.has_access_token());

        store.set(TokenKind::Refresh, "def").unwrap();
        assert_eq!(store.get(TokenKind::Refresh), Some("def".to_string()));

        store.clear().unwrap();
        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh), None);
    }

    #[test]
    fn test_empty_access_token_is_not_a_session() {
        let store = MemoryTokenStore::with_tokens(Some(""), Some("def"));
        assert!(!store.has_access_token());
    }
}
