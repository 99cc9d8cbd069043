//! Session persistence
//!
//! Snapshots are stored as JSON under a single fixed key in a key-value
//! store. The in-memory store stands in for browser storage; the file store
//! writes one `<key>.json` file per key.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::GameError;
use crate::session::SessionSnapshot;

/// Key under which the session snapshot is stored
pub const SESSION_STORAGE_KEY: &str = "gazeverdict.session";

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, GameError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), GameError>;
    fn remove(&mut self, key: &str) -> Result<(), GameError>;
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, GameError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GameError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), GameError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store, one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GameError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| storage_error("create", &dir, e))?;
        debug!(dir = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, GameError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GameError> {
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|e| storage_error("write", &path, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), GameError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &path, e)),
        }
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> GameError {
    GameError::Storage(format!("failed to {action} {}: {err}", path.display()))
}

/// Persist a session snapshot
pub fn save_session<S: KeyValueStore + ?Sized>(
    store: &mut S,
    snapshot: &SessionSnapshot,
) -> Result<(), GameError> {
    let json = serde_json::to_string(snapshot)?;
    store.set(SESSION_STORAGE_KEY, &json)?;
    debug!(
        session_id = %snapshot.session_id,
        stage = ?snapshot.stage,
        bytes = json.len(),
        "session saved"
    );
    Ok(())
}

/// Load the persisted snapshot, if any
pub fn load_session<S: KeyValueStore + ?Sized>(
    store: &S,
) -> Result<Option<SessionSnapshot>, GameError> {
    let Some(json) = store.get(SESSION_STORAGE_KEY)? else {
        return Ok(None);
    };
    let snapshot: SessionSnapshot = serde_json::from_str(&json)?;
    info!(session_id = %snapshot.session_id, stage = ?snapshot.stage, "session loaded");
    Ok(Some(snapshot))
}

/// Remove the persisted snapshot
pub fn clear_session<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<(), GameError> {
    store.remove(SESSION_STORAGE_KEY)?;
    debug!("session cleared");
    Ok(())
}
