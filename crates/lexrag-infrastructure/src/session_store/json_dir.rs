//! Directory-backed session store, one JSON file per session.
//!
//! ```text
//! sessions/
//! ├── default.json
//! └── client~2Facme.json     # "client/acme"
//! ```

use crate::paths::LexragPaths;
use async_trait::async_trait;
use lexrag_core::error::{LexragError, Result};
use lexrag_core::session::{Session, SessionStore};
use std::path::{Path, PathBuf};
use tokio::fs;

const EXTENSION: &str = "json";

/// Persists sessions as pretty-printed JSON files.
///
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// never observes a half-written checkpoint.
pub struct JsonDirSessionStore {
    dir: PathBuf,
}

impl JsonDirSessionStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            LexragError::session(format!(
                "Failed to create sessions directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Opens the store at the default data location.
    pub async fn default_location() -> Result<Self> {
        let dir = LexragPaths::sessions_dir()
            .map_err(|e| LexragError::session(format!("Failed to get sessions directory: {e}")))?;
        Self::new(dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", encode_file_stem(session_id)))
    }
}

#[async_trait]
impl SessionStore for JsonDirSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.path_for(session_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&content).map_err(|e| {
            LexragError::session(format!(
                "Failed to parse session file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(session))
    }

    async fn put(&self, session: Session) -> Result<()> {
        let path = self.path_for(&session.id);
        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let json = serde_json::to_string_pretty(&session)?;

        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(session_id = %session.id, path = %path.display(), "Session saved");
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        for id in self.list_ids().await? {
            self.remove(&id).await?;
        }
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(decode_file_stem)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Keeps `[A-Za-z0-9_-]` and escapes every other byte as `~XX`.
fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("~{byte:02X}"));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let mut iter = stem.bytes();
    while let Some(byte) = iter.next() {
        if byte == b'~' {
            let hi = iter.next()?;
            let lo = iter.next()?;
            let hex = [hi, lo];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(byte);
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_core::refinement::RefinementState;
    use lexrag_core::session::{Checkpoint, CheckpointPhase};

    #[test]
    fn file_stem_encoding_round_trips() {
        for id in ["default", "client/acme", "a~b", "über case"] {
            let stem = encode_file_stem(id);
            assert!(!stem.contains('/'));
            assert_eq!(decode_file_stem(&stem).as_deref(), Some(id));
        }
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new("client/acme");
        session.record_checkpoint(Checkpoint::new(
            CheckpointPhase::Verified,
            RefinementState::new("Who may assign the contract?"),
        ));

        JsonDirSessionStore::new(dir.path())
            .await
            .unwrap()
            .put(session.clone())
            .await
            .unwrap();

        let reopened = JsonDirSessionStore::new(dir.path()).await.unwrap();
        assert_eq!(reopened.get("client/acme").await.unwrap(), Some(session));
        assert_eq!(reopened.list_ids().await.unwrap(), vec!["client/acme"]);
    }

    #[tokio::test]
    async fn missing_session_is_none_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirSessionStore::new(dir.path()).await.unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
        store.remove("nope").await.unwrap();
    }

    #[tokio::test]
    async fn clear_removes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirSessionStore::new(dir.path()).await.unwrap();
        store.put(Session::new("a")).await.unwrap();
        store.put(Session::new("b")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_session_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirSessionStore::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        let err = store.get("broken").await.unwrap_err();
        assert!(matches!(err, LexragError::Session(_)));
    }
}
