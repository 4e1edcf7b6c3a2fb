//! Session persistence
//!
//! A durable subset of [`PlayerState`] is written to a key-value store after
//! every mutation and read back at startup. Failures are logged and otherwise
//! ignored: persistence never blocks playback.

use crate::error::PersistenceError;
use crate::types::{PlayerState, RepeatMode, Track};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// Storage result type
pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

/// Durable key-value storage
pub trait StateStore {
    /// Read the value stored under `key`, if any
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&mut self, key: &str) -> StoreResult<()>;
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// In-memory store
///
/// Clones share the same map, so a test can hand one clone to an engine and
/// inspect (or reuse) the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, bypassing the trait
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Seed a raw value
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.to_string(), value.into());
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous record intact.
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

    /// File backing `key`; characters outside `[A-Za-z0-9._-]` become `_`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl StateStore for JsonFileStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// The persisted record
///
/// Missing fields fall back to their defaults so older records still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSession {
    pub volume: f64,
    pub is_muted: bool,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub is_expanded: bool,
    /// `-1` when nothing is selected
    pub current_index: i64,
    pub current_time_seconds: f64,
    pub playlist: Vec<Track>,
}

impl PersistedSession {
    pub fn from_state(state: &PlayerState) -> Self {
        Self {
            volume: state.volume,
            is_muted: state.is_muted,
            shuffle_enabled: state.shuffle_enabled,
            repeat_mode: state.repeat_mode,
            is_expanded: state.is_expanded,
            current_index: state
                .current_index
                .and_then(|i| i64::try_from(i).ok())
                .unwrap_or(-1),
            current_time_seconds: state.current_time_seconds,
            playlist: state.playlist.as_ref().clone(),
        }
    }

    /// Selected index, or `None` for `-1` and other negative values
    pub fn selected_index(&self) -> Option<usize> {
        usize::try_from(self.current_index).ok()
    }
}

impl Default for PersistedSession {
    fn default() -> Self {
        Self::from_state(&PlayerState::default())
    }
}

/// Reads and writes the session record under one key
///
/// Writes are skipped when the record matches the last one written, so
/// snapshot changes to transient fields never reach the store.
pub struct SessionStore {
    store: Box<dyn StateStore>,
    key: String,
    last_saved: Option<PersistedSession>,
}

impl SessionStore {
    pub fn new(store: Box<dyn StateStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            last_saved: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialize and write `state` unless the record is unchanged
    pub fn try_save(&mut self, state: &PlayerState) -> StoreResult<()> {
        let session = PersistedSession::from_state(state);
        if self.last_saved.as_ref() == Some(&session) {
            return Ok(());
        }
        let json = serde_json::to_string(&session)?;
        self.store.write(&self.key, &json)?;
        self.last_saved = Some(session);
        Ok(())
    }

    /// Read and parse the stored record
    pub fn try_restore(&self) -> StoreResult<Option<PersistedSession>> {
        match self.store.read(&self.key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Best-effort save; failures are logged
    pub fn save(&mut self, state: &PlayerState) {
        if let Err(e) = self.try_save(state) {
            warn!(key = %self.key, error = %e, "failed to persist player state");
        }
    }

    /// Best-effort restore; any failure reads as "nothing saved"
    pub fn restore(&self) -> Option<PersistedSession> {
        match self.try_restore() {
            Ok(Some(session)) => {
                debug!(key = %self.key, tracks = session.playlist.len(), "restored player state");
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "ignoring unreadable persisted state");
                None
            }
        }
    }

    /// Delete the stored record
    pub fn forget(&mut self) {
        self.last_saved = None;
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "failed to remove persisted state");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("key", &self.key).finish()
    }
}
