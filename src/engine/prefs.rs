// Roost Engine — Preference Store
//
// Client-local state that survives restarts: do-not-disturb, command
// history (newest first, capped) and the last login session.
//
// `PrefsStore` keeps an in-memory copy guarded by a RwLock and writes
// through to an injected `PrefsBackend`. Two backends:
//   SqliteBackend — key/value table `client_config` (rusqlite, bundled)
//   MemoryBackend — HashMap, for tests

use crate::atoms::constants::*;
use crate::atoms::error::ChatResult;
use crate::atoms::traits::PrefsBackend;
use crate::atoms::types::{Prefs, Session};
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

// ── Store ──────────────────────────────────────────────────────────────

pub struct PrefsStore {
    backend: Arc<dyn PrefsBackend>,
    cache: RwLock<Prefs>,
}

impl PrefsStore {
    /// Read persisted prefs. Unreadable or malformed values fall back to
    /// defaults so a corrupt entry never blocks startup.
    pub fn load(backend: Arc<dyn PrefsBackend>) -> Self {
        let dnd = read_json::<bool>(backend.as_ref(), PREF_KEY_DND).unwrap_or(false);
        let mut command_history =
            read_json::<Vec<String>>(backend.as_ref(), PREF_KEY_COMMAND_HISTORY).unwrap_or_default();
        command_history.truncate(COMMAND_HISTORY_CAP);
        PrefsStore {
            backend,
            cache: RwLock::new(Prefs { dnd, command_history }),
        }
    }

    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryBackend::default()))
    }

    pub fn snapshot(&self) -> Prefs {
        self.cache.read().clone()
    }

    /// Persist the whole cache.
    pub fn save(&self) -> ChatResult<()> {
        let prefs = self.snapshot();
        self.backend.set(PREF_KEY_DND, &serde_json::to_string(&prefs.dnd)?)?;
        self.backend
            .set(PREF_KEY_COMMAND_HISTORY, &serde_json::to_string(&prefs.command_history)?)?;
        Ok(())
    }

    pub fn dnd(&self) -> bool {
        self.cache.read().dnd
    }

    pub fn set_dnd(&self, on: bool) -> ChatResult<()> {
        self.cache.write().dnd = on;
        self.backend.set(PREF_KEY_DND, &serde_json::to_string(&on)?)?;
        info!("[prefs] Do-not-disturb {}", if on { "on" } else { "off" });
        Ok(())
    }

    pub fn command_history(&self) -> Vec<String> {
        self.cache.read().command_history.clone()
    }

    /// Prepend a command, keeping at most `COMMAND_HISTORY_CAP` entries.
    /// Blank input is ignored.
    pub fn add_command(&self, command: &str) -> ChatResult<()> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(());
        }
        let encoded = {
            let mut prefs = self.cache.write();
            prefs.command_history.insert(0, command.to_string());
            prefs.command_history.truncate(COMMAND_HISTORY_CAP);
            serde_json::to_string(&prefs.command_history)?
        };
        self.backend.set(PREF_KEY_COMMAND_HISTORY, &encoded)
    }

    // ── Session ────────────────────────────────────────────────────────

    pub fn save_session(&self, session: &Session) -> ChatResult<()> {
        self.backend.set(PREF_KEY_SESSION, &serde_json::to_string(session)?)
    }

    pub fn session(&self) -> Option<Session> {
        read_json(self.backend.as_ref(), PREF_KEY_SESSION)
    }

    pub fn clear_session(&self) -> ChatResult<()> {
        self.backend.remove(PREF_KEY_SESSION)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(backend: &dyn PrefsBackend, key: &str) -> Option<T> {
    match backend.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("[prefs] Ignoring malformed '{}': {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("[prefs] Failed to read '{}': {}", key, e);
            None
        }
    }
}

// ── SQLite backend ─────────────────────────────────────────────────────

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database file and initialize the table.
    pub fn open(path: &Path) -> ChatResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        info!("[prefs] Opening preference store at {:?}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        Self::init(conn)
    }

    pub fn open_in_memory() -> ChatResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> ChatResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS client_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(SqliteBackend { conn: Mutex::new(conn) })
    }
}

impl PrefsBackend for SqliteBackend {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT value FROM client_config WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO client_config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ChatResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM client_config WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ── Memory backend ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl PrefsBackend for MemoryBackend {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ChatResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{Credentials, UserInfo};

    fn sqlite_store() -> (Arc<SqliteBackend>, PrefsStore) {
        let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let store = PrefsStore::load(backend.clone());
        (backend, store)
    }

    #[test]
    fn defaults_when_empty() {
        let (_, store) = sqlite_store();
        assert_eq!(store.snapshot(), Prefs::default());
        assert!(store.session().is_none());
    }

    #[test]
    fn dnd_persists_across_reload() {
        let (backend, store) = sqlite_store();
        store.set_dnd(true).unwrap();
        let reloaded = PrefsStore::load(backend);
        assert!(reloaded.dnd());
    }

    #[test]
    fn command_history_is_newest_first_and_capped() {
        let store = PrefsStore::in_memory();
        for i in 0..60 {
            store.add_command(&format!("/search {}", i)).unwrap();
        }
        store.add_command("   ").unwrap();
        let history = store.command_history();
        assert_eq!(history.len(), COMMAND_HISTORY_CAP);
        assert_eq!(history[0], "/search 59");
        assert_eq!(history[49], "/search 10");
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let backend = Arc::new(MemoryBackend::default());
        backend.set(PREF_KEY_DND, "not json").unwrap();
        backend.set(PREF_KEY_COMMAND_HISTORY, "{\"oops\":1}").unwrap();
        let store = PrefsStore::load(backend);
        assert_eq!(store.snapshot(), Prefs::default());
    }

    #[test]
    fn save_writes_whole_cache() {
        let backend = Arc::new(MemoryBackend::default());
        let store = PrefsStore::load(backend.clone());
        store.cache.write().command_history = vec!["/status away".into()];
        store.save().unwrap();
        assert_eq!(
            backend.get(PREF_KEY_COMMAND_HISTORY).unwrap().as_deref(),
            Some("[\"/status away\"]")
        );
        assert_eq!(backend.get(PREF_KEY_DND).unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn session_round_trip_and_clear() {
        let (_, store) = sqlite_store();
        let session = Session {
            credentials: Credentials { auth_token: "t".into(), user_id: "u1".into() },
            me: UserInfo { id: "u1".into(), username: Some("ana".into()), ..Default::default() },
        };
        store.save_session(&session).unwrap();
        let loaded = store.session().unwrap();
        assert_eq!(loaded.credentials, session.credentials);
        assert_eq!(loaded.me.username.as_deref(), Some("ana"));
        store.clear_session().unwrap();
        assert!(store.session().is_none());
    }

    #[test]
    fn sqlite_file_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("roost.db");
        let backend = SqliteBackend::open(&path).unwrap();
        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("v"));
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        assert!(path.exists());
    }
}
