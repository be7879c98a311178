//! Durable key/value storage for the solve log and best averages.
//!
//! Each record is a whole JSON document, overwritten in full on every save.

use crate::config::StorageBackend;
use crate::error::CubikResult;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SOLVES_KEY: &str = "cubik.solves";
pub const BEST_AVERAGES_KEY: &str = "cubik.best_averages";

pub trait Store {
    fn get(&self, key: &str) -> CubikResult<Option<Value>>;
    fn set(&mut self, key: &str, value: &Value) -> CubikResult<()>;
}

impl<T: Store + ?Sized> Store for Box<T> {
    fn get(&self, key: &str) -> CubikResult<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> CubikResult<()> {
        (**self).set(key, value)
    }
}

/// Volatile store, mostly for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> CubikResult<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> CubikResult<()> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One pretty-printed `<key>.json` file per record
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn staging_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{key}.json.tmp"))
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> CubikResult<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn set(&mut self, key: &str, value: &Value) -> CubikResult<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(value)?;
        // the live file is only ever replaced by rename, never truncated
        let staged = self.staging_path_for(key);
        fs::write(&staged, data)?;
        fs::rename(&staged, self.path_for(key))?;
        Ok(())
    }
}

/// Single-table SQLite store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> CubikResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> CubikResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CubikResult<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> CubikResult<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> CubikResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }
}

/// Open the configured backend rooted at `dir`.
pub fn open_store(backend: StorageBackend, dir: &Path) -> CubikResult<Box<dyn Store>> {
    tracing::info!(%backend, dir = %dir.display(), "opening store");
    Ok(match backend {
        StorageBackend::Json => Box::new(JsonFileStore::new(dir)),
        StorageBackend::Sqlite => Box::new(SqliteStore::open(dir.join("solves.db"))?),
    })
}
