//! Durable key-value storage for the console session.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use pitboard_types::{leaderboard::Leaderboard, session::SessionState, PitboardError, Result};
use tracing::{debug, warn};

pub const SESSION_KEY: &str = "session";
pub const LEADERBOARD_KEY: &str = "leaderboard";

/// Minimal string key-value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One JSON document per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            persistence_error(format!("unable to create {}: {err}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|err| persistence_error(format!("unable to read {}: {err}", path.display())))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|err| {
            persistence_error(format!("unable to write {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, &path).map_err(|err| {
            persistence_error(format!("unable to replace {}: {err}", path.display()))
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(persistence_error(format!(
                "unable to remove {}: {err}",
                path.display()
            ))),
        }
    }
}

/// In-memory store; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let records = self
            .records
            .lock()
            .map_err(|_| persistence_error("memory store poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| persistence_error("memory store poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| persistence_error("memory store poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// Save-on-write snapshots of [`SessionState`].
///
/// The leaderboard is written twice: inside the session record and as its
/// own record, so standings outlive a session reset.
pub struct PersistenceGateway<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn save(&mut self, state: &SessionState) -> Result<()> {
        let session = serde_json::to_string(state)
            .map_err(|err| persistence_error(format!("unable to encode session: {err}")))?;
        let leaderboard = serde_json::to_string(&state.leaderboard)
            .map_err(|err| persistence_error(format!("unable to encode leaderboard: {err}")))?;
        self.store.put(SESSION_KEY, &session)?;
        self.store.put(LEADERBOARD_KEY, &leaderboard)?;
        debug!(
            "Session saved ({} records, {} standings)",
            state.rounds.len(),
            state.leaderboard.len()
        );
        Ok(())
    }

    /// Prior session or defaults; never fails.
    pub fn load(&self) -> SessionState {
        let mut state: SessionState = self.read(SESSION_KEY).unwrap_or_default();
        if let Some(leaderboard) = self.load_leaderboard() {
            state.leaderboard = leaderboard;
        }
        state.normalize();
        state
    }

    pub fn load_leaderboard(&self) -> Option<Leaderboard> {
        self.read::<Leaderboard>(LEADERBOARD_KEY)
    }

    /// Drops the per-entrant session record; standings are kept.
    pub fn reset_session(&mut self) -> Result<()> {
        self.store.remove(SESSION_KEY)
    }

    pub fn reset_leaderboard(&mut self) -> Result<()> {
        self.store.remove(LEADERBOARD_KEY)
    }

    /// Whether a session record exists at all (readable or not).
    pub fn has_session(&self) -> bool {
        matches!(self.store.get(SESSION_KEY), Ok(Some(_)))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("Unable to read stored {key}: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Stored {key} is unreadable, using defaults: {err}");
                None
            }
        }
    }
}

pub fn persistence_error(message: impl Into<String>) -> PitboardError {
    PitboardError::Persistence(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboard_types::roster::Entrant;

    fn sample_state() -> SessionState {
        let mut state = SessionState::default();
        state.rounds.commit_time(10.25);
        state.rounds.commit_retirement();
        state.commit_best_time().expect("commit");
        state.auto_commit = true;
        state
    }

    #[test]
    fn load_without_data_returns_defaults() {
        let gateway = PersistenceGateway::new(MemoryStore::new());
        let state = gateway.load();
        assert_eq!(state, SessionState::default());
        assert!(!state.auto_commit);
    }

    #[test]
    fn save_then_load_restores_session() {
        let mut gateway = PersistenceGateway::new(MemoryStore::new());
        let state = sample_state();
        gateway.save(&state).expect("save");
        assert_eq!(gateway.load(), state);
    }

    #[test]
    fn leaderboard_survives_session_reset() {
        let mut gateway = PersistenceGateway::new(MemoryStore::new());
        gateway.save(&sample_state()).expect("save");
        gateway.reset_session().expect("reset");

        let state = gateway.load();
        assert!(state.rounds.is_empty());
        assert_eq!(state.leaderboard.len(), 1);
        assert_eq!(state.leaderboard.entries()[0].best_time, 10.25);
    }

    #[test]
    fn full_reset_drops_standings() {
        let mut gateway = PersistenceGateway::new(MemoryStore::new());
        gateway.save(&sample_state()).expect("save");
        assert!(gateway.has_session());
        gateway.reset_session().expect("reset");
        gateway.reset_leaderboard().expect("reset");
        assert!(!gateway.has_session());
        assert!(gateway.load().leaderboard.is_empty());
    }

    #[test]
    fn corrupt_session_degrades_to_defaults() {
        let mut store = MemoryStore::new();
        store.put(SESSION_KEY, "{not json").unwrap();
        let gateway = PersistenceGateway::new(store);
        assert_eq!(gateway.load(), SessionState::default());
    }

    #[test]
    fn stale_roster_cursor_is_clamped() {
        let mut state = SessionState::default();
        state.roster.load(vec![Entrant::new("#001", "A", "")]);
        let mut raw = serde_json::to_value(&state).unwrap();
        raw["roster"]["index"] = serde_json::json!(9);
        let mut store = MemoryStore::new();
        store.put(SESSION_KEY, &raw.to_string()).unwrap();

        let loaded = PersistenceGateway::new(store).load();
        assert_eq!(loaded.roster.index(), 0);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileStore::new(dir.path().join("data")).expect("store");
        assert_eq!(store.get("session").unwrap(), None);
        store.put("session", "{\"a\":1}").unwrap();
        assert_eq!(store.get("session").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(store.dir().join("session.json").exists());
        store.remove("session").unwrap();
        store.remove("session").unwrap();
        assert_eq!(store.get("session").unwrap(), None);
    }

    #[test]
    fn gateway_over_file_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path()).expect("store");
        let mut gateway = PersistenceGateway::new(store.clone());
        let state = sample_state();
        gateway.save(&state).expect("save");

        let reopened = PersistenceGateway::new(store);
        assert_eq!(reopened.load(), state);
    }
}
