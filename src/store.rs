use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Persistence port: a flat string-keyed blob store with no transactions
/// and no schema. Production uses a single-table sqlite file; tests inject
/// an in-memory map.
pub trait BlobStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_raw(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace)
            .with_context(|| format!("create workspace dir {}", workspace.display()))?;
        let db_path = workspace.join("servis.sqlite3");
        let conn =
            Connection::open(&db_path).with_context(|| format!("open {}", db_path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteStore { conn })
    }
}

impl BlobStore for SqliteStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_raw(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl BlobStore for MemoryStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON view over a blob store backend. Values are whole collections;
/// every write fully overwrites the previous value for that key.
pub struct Store {
    backend: Box<dyn BlobStore>,
}

impl Store {
    pub fn new(backend: Box<dyn BlobStore>) -> Self {
        Store { backend }
    }

    #[allow(dead_code)]
    pub fn in_memory() -> Self {
        Store::new(Box::<MemoryStore>::default())
    }

    /// A missing key reads as the type's default (an empty list for the
    /// top-level collections), never as an error.
    pub fn get_json<T: DeserializeOwned + Default>(&self, key: &str) -> anyhow::Result<T> {
        match self.backend.get_raw(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("decode stored value for key {key}")),
            None => Ok(T::default()),
        }
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set_raw(key, &raw)
    }
}

pub fn open_workspace(workspace: &Path) -> anyhow::Result<Store> {
    Ok(Store::new(Box::new(SqliteStore::open(workspace)?)))
}

/// Opaque id: prefix + current unix millis + a small random suffix.
/// Uniqueness is probabilistic; collisions are benign in this
/// single-threaded, single-operator process.
pub fn generate_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let salt = rand::thread_rng().gen_range(0..1000u16);
    format!("{prefix}_{millis}_{salt}")
}
