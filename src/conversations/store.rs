//! JSON-file conversation store.
//!
//! The whole store lives in one indented JSON object keyed by conversation
//! id. Writes go to a sibling temporary file that is renamed over the target,
//! and read-modify-write cycles are serialized behind an async mutex so two
//! deliveries arriving together cannot drop each other's entry.

use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::types::{ConversationMap, ConversationRecord};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Suffix of the in-flight file written before the atomic rename.
const TMP_SUFFIX: &str = ".tmp";
/// Suffix of the copies kept when an unparsable store is about to be replaced.
const CORRUPT_SUFFIX: &str = ".corrupt";
/// Timestamp format appended to corrupt-store backups.
const BACKUP_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// Errors raised while persisting conversations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The store could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for conversation storage.
pub trait ConversationStore: Send + Sync {
    /// Load every saved conversation.
    ///
    /// A missing or unreadable backing file yields an empty map; this never
    /// fails.
    fn load(&self) -> StoreFuture<'_, ConversationMap>;

    /// Replace the stored conversations with `conversations`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be serialized or written.
    fn save<'a>(&'a self, conversations: &'a ConversationMap) -> StoreFuture<'a, StoreResult<()>>;

    /// Insert or fully overwrite the record for `conversation_id`.
    ///
    /// Other entries are written back exactly as they were read.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn upsert(
        &self,
        conversation_id: String,
        record: ConversationRecord,
    ) -> StoreFuture<'_, StoreResult<()>>;
}

/// What was found at the store location.
#[derive(Debug)]
enum ReadOutcome {
    Missing,
    Loaded(ConversationMap),
    Corrupt(String),
    Unreadable(std::io::Error),
}

/// Conversation store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileConversationStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileConversationStore {
    /// Create a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup location for a corrupt store replaced at `now`.
    ///
    /// Earlier backups are never overwritten; a numeric suffix is added when
    /// the timestamped name is already taken.
    #[must_use]
    pub fn corrupt_backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stamp = now.format(BACKUP_STAMP_FORMAT);
        let base = sibling(&self.path, &format!("{CORRUPT_SUFFIX}-{stamp}"));
        let mut candidate = base.clone();
        let mut attempt = 1_u32;
        while candidate.exists() {
            candidate = sibling(&base, &format!("-{attempt}"));
            attempt += 1;
        }
        candidate
    }

    async fn preserve_corrupt(&self, reason: &str) -> StoreResult<()> {
        let backup = self.corrupt_backup_path(Utc::now());
        tracing::error!(
            "Conversation store {} is not a JSON object ({reason}); keeping a copy at {}",
            self.path.display(),
            backup.display()
        );
        fs::copy(&self.path, &backup).await?;
        Ok(())
    }
}

impl ConversationStore for JsonFileConversationStore {
    fn load(&self) -> StoreFuture<'_, ConversationMap> {
        Box::pin(async move {
            match read_conversations(&self.path).await {
                ReadOutcome::Loaded(conversations) => conversations,
                ReadOutcome::Missing => ConversationMap::new(),
                ReadOutcome::Corrupt(reason) => {
                    tracing::warn!(
                        "Ignoring unparsable conversation store {}: {reason}",
                        self.path.display()
                    );
                    ConversationMap::new()
                }
                ReadOutcome::Unreadable(err) => {
                    tracing::warn!(
                        "Cannot read conversation store {}: {err}",
                        self.path.display()
                    );
                    ConversationMap::new()
                }
            }
        })
    }

    fn save<'a>(&'a self, conversations: &'a ConversationMap) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            write_conversations(&self.path, conversations).await
        })
    }

    fn upsert(
        &self,
        conversation_id: String,
        record: ConversationRecord,
    ) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;

            let mut conversations = match read_conversations(&self.path).await {
                ReadOutcome::Loaded(conversations) => conversations,
                ReadOutcome::Missing => ConversationMap::new(),
                ReadOutcome::Corrupt(reason) => {
                    self.preserve_corrupt(&reason).await?;
                    ConversationMap::new()
                }
                // Overwriting a file we could not read would drop its history.
                ReadOutcome::Unreadable(err) => return Err(err.into()),
            };

            conversations.insert(conversation_id, serde_json::to_value(record)?);
            write_conversations(&self.path, &conversations).await
        })
    }
}

/// Append `suffix` to the file name of `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, OsString::from);
    name.push(suffix);
    path.with_file_name(name)
}

async fn read_conversations(path: &Path) -> ReadOutcome {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return ReadOutcome::Missing,
        Err(err) if err.kind() == ErrorKind::InvalidData => {
            return ReadOutcome::Corrupt(err.to_string());
        }
        Err(err) => return ReadOutcome::Unreadable(err),
    };

    if text.trim().is_empty() {
        return ReadOutcome::Loaded(ConversationMap::new());
    }

    // Entries stay raw JSON: only an unparsable file or a non-object top
    // level counts as corrupt.
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(entries)) => ReadOutcome::Loaded(entries.into_iter().collect()),
        Ok(other) => ReadOutcome::Corrupt(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        )),
        Err(err) => ReadOutcome::Corrupt(err.to_string()),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn write_conversations(path: &Path, conversations: &ConversationMap) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(conversations)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp = sibling(path, TMP_SUFFIX);
    if let Err(err) = replace_file(&tmp, path, json.as_bytes()).await {
        // Best effort: the previous store is untouched either way.
        let _ = fs::remove_file(&tmp).await;
        return Err(err.into());
    }

    tracing::debug!(
        "Wrote {} conversation(s) to {}",
        conversations.len(),
        path.display()
    );
    Ok(())
}

/// Write `bytes` to `tmp`, flush it to disk, then move it over `path`.
async fn replace_file(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, path).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn record(summary: &str) -> ConversationRecord {
        ConversationRecord {
            summary: summary.to_string(),
            transcript: json!([{"role": "agent", "message": "Hello"}]),
            duration: Some(json!(42)),
            ..ConversationRecord::default()
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConversationStore::new(dir.path().join("conversations.json"));

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileConversationStore::new(&path);
        assert!(store.load().await.is_empty());
        // Loading alone never touches the file.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_upsert_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConversationStore::new(dir.path().join("conversations.json"));

        store.upsert("c1".to_string(), record("hi")).await.unwrap();

        let conversations = store.load().await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(
            conversations.get("c1"),
            Some(&serde_json::to_value(record("hi")).unwrap())
        );
    }

    #[tokio::test]
    async fn test_upsert_same_id_keeps_last() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConversationStore::new(dir.path().join("conversations.json"));

        store.upsert("c1".to_string(), record("first")).await.unwrap();
        store.upsert("c1".to_string(), record("second")).await.unwrap();

        let conversations = store.load().await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations["c1"]["summary"], "second");
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        let store = JsonFileConversationStore::new(&path);

        store.upsert("c1".to_string(), record("one")).await.unwrap();
        store.upsert("c2".to_string(), record("two")).await.unwrap();
        let before: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        let loaded = store.load().await;
        store.save(&loaded).await.unwrap();

        let after: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_file_is_indented_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        let store = JsonFileConversationStore::new(&path);

        store.upsert("c1".to_string(), record("hi")).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"c1\""));
        assert!(!sibling(&path, TMP_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("calls").join("conversations.json");
        let store = JsonFileConversationStore::new(&path);

        store.upsert("c1".to_string(), record("hi")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_upsert_over_corrupt_file_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        std::fs::write(&path, "{\"c0\": {\"user\": ").unwrap();
        let store = JsonFileConversationStore::new(&path);

        store.upsert("c1".to_string(), record("hi")).await.unwrap();

        let backups = corrupt_backups(dir.path());
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&backups[0]).unwrap(),
            "{\"c0\": {\"user\": "
        );
        let conversations = store.load().await;
        assert_eq!(conversations.keys().collect::<Vec<_>>(), vec!["c1"]);
    }

    fn corrupt_backups(dir: &Path) -> Vec<PathBuf> {
        let mut backups: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("conversations.json.corrupt-"))
            })
            .collect();
        backups.sort();
        backups
    }

    #[tokio::test]
    async fn test_repeated_corruption_keeps_every_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        let store = JsonFileConversationStore::new(&path);

        std::fs::write(&path, "first broken").unwrap();
        store.upsert("c1".to_string(), record("one")).await.unwrap();
        std::fs::write(&path, "second broken").unwrap();
        store.upsert("c2".to_string(), record("two")).await.unwrap();

        let mut contents: Vec<String> = corrupt_backups(dir.path())
            .iter()
            .map(|backup| std::fs::read_to_string(backup).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["first broken", "second broken"]);
    }

    #[test]
    fn test_backup_path_skips_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConversationStore::new(dir.path().join("conversations.json"));
        let now = Utc::now();

        let first = store.corrupt_backup_path(now);
        std::fs::write(&first, "old").unwrap();
        let second = store.corrupt_backup_path(now);

        assert_ne!(first, second);
        assert!(!second.exists());
    }

    #[tokio::test]
    async fn test_foreign_entries_survive_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        let existing = json!({
            "old1": {"user": 7, "transcript": [], "summary": "a"},
            "old2": {"user": "Bo", "summary": "b", "cost": "0.10"},
            "old3": {"user": "Cy", "summary": "c"}
        });
        std::fs::write(&path, serde_json::to_string_pretty(&existing).unwrap()).unwrap();
        let store = JsonFileConversationStore::new(&path);

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded["old1"], existing["old1"]);

        store.upsert("c1".to_string(), record("hi")).await.unwrap();

        let after: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(after["old1"], existing["old1"]);
        assert_eq!(after["old2"], existing["old2"]);
        assert_eq!(after["old3"], existing["old3"]);
        assert_eq!(after["c1"]["summary"], "hi");
        assert!(corrupt_backups(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_non_object_store_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let store = JsonFileConversationStore::new(&path);

        assert!(store.load().await.is_empty());
        store.upsert("c1".to_string(), record("hi")).await.unwrap();
        assert_eq!(corrupt_backups(dir.path()).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileConversationStore::new(
            dir.path().join("conversations.json"),
        ));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .upsert(format!("c{i}"), record(&format!("call {i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.len(), 16);
    }

    #[test]
    fn test_sibling_paths() {
        let path = Path::new("/data/conversations.json");
        assert_eq!(
            sibling(path, TMP_SUFFIX),
            PathBuf::from("/data/conversations.json.tmp")
        );
        assert_eq!(
            sibling(path, CORRUPT_SUFFIX),
            PathBuf::from("/data/conversations.json.corrupt")
        );
        assert_eq!(json_kind(&json!([])), "an array");
    }
}
