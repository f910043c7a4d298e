//! Save-game storage.
//!
//! A [`GameStateStore`] keeps one [`StoredRecord`] per character and
//! overwrites it on every save. The game data travels as an opaque JSON
//! string so a damaged blob can be detected and recovered from when it is
//! decoded, instead of failing the whole fetch.

use crate::character::CharacterId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current record format version.
pub const RECORD_VERSION: u32 = 1;

fn default_version() -> u32 {
    RECORD_VERSION
}

/// Reads any JSON value, keeping it only if it is a string. Missing, null or
/// mistyped scene text loads as empty and the manager fills in its default.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

/// One saved game, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    pub char_id: CharacterId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scene: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
    pub saved_at: DateTime<Utc>,
    /// JSON-encoded game data.
    pub game_data: String,
}

impl StoredRecord {
    pub fn new(
        char_id: CharacterId,
        scene: impl Into<String>,
        location: impl Into<String>,
        game_data: impl Into<String>,
    ) -> Self {
        Self {
            version: RECORD_VERSION,
            char_id,
            scene: scene.into(),
            location: location.into(),
            saved_at: Utc::now(),
            game_data: game_data.into(),
        }
    }
}

/// Keyed storage for saved games. Writes replace any earlier record for the
/// same character; concurrent writers race and the last one wins.
#[async_trait]
pub trait GameStateStore: Send + Sync {
    async fn upsert(&self, record: StoredRecord) -> Result<(), PersistError>;

    async fn fetch(&self, char_id: &CharacterId) -> Result<Option<StoredRecord>, PersistError>;

    /// Returns whether a record existed.
    async fn delete(&self, char_id: &CharacterId) -> Result<bool, PersistError>;

    async fn list(&self) -> Result<Vec<CharacterId>, PersistError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store backed by a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<CharacterId, StoredRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStateStore for InMemoryStore {
    async fn upsert(&self, record: StoredRecord) -> Result<(), PersistError> {
        self.records.write().await.insert(record.char_id, record);
        Ok(())
    }

    async fn fetch(&self, char_id: &CharacterId) -> Result<Option<StoredRecord>, PersistError> {
        Ok(self.records.read().await.get(char_id).cloned())
    }

    async fn delete(&self, char_id: &CharacterId) -> Result<bool, PersistError> {
        Ok(self.records.write().await.remove(char_id).is_some())
    }

    async fn list(&self) -> Result<Vec<CharacterId>, PersistError> {
        let mut ids: Vec<CharacterId> = self.records.read().await.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        Ok(ids)
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store with one pretty-printed JSON file per character.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a character's save.
    pub fn record_path(&self, char_id: &CharacterId) -> PathBuf {
        let sanitized = char_id
            .to_string()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect::<String>();
        self.dir.join(format!("{sanitized}.json"))
    }
}

#[async_trait]
impl GameStateStore for JsonFileStore {
    async fn upsert(&self, record: StoredRecord) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.record_path(&record.char_id);
        let content = serde_json::to_string_pretty(&record)?;
        fs::write(&path, content).await?;
        debug!(path = %path.display(), "Game state written");
        Ok(())
    }

    async fn fetch(&self, char_id: &CharacterId) -> Result<Option<StoredRecord>, PersistError> {
        let content = match fs::read_to_string(self.record_path(char_id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: StoredRecord = serde_json::from_str(&content)?;
        if record.version != RECORD_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: RECORD_VERSION,
                found: record.version,
            });
        }
        Ok(Some(record))
    }

    async fn delete(&self, char_id: &CharacterId) -> Result<bool, PersistError> {
        match fs::remove_file(self.record_path(char_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<CharacterId>, PersistError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| uuid::Uuid::parse_str(s).ok())
                {
                    ids.push(CharacterId(id));
                }
            }
        }
        ids.sort_by_key(|id| id.0);
        Ok(ids)
    }
}
