//! Key-value persistence for a workspace.
//!
//! Every value is a JSON document stored under a string key in a single
//! `kv` table. Writes go through [`Batch`] so that a group of keys is
//! committed in one transaction or not at all.

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

pub const DB_FILE_NAME: &str = "attendance.sqlite3";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize value for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored value for {key} is not valid: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// A pending set of writes. Applied atomically by [`KvStore::apply`].
#[derive(Debug, Default)]
pub struct Batch {
    ops: Vec<(String, Option<String>)>,
}

impl Batch {
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.ops.push((key.to_string(), Some(text)));
        Ok(())
    }

    #[allow(dead_code)]
    pub fn remove(&mut self, key: &str) {
        self.ops.push((key.to_string(), None));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

pub trait KvStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn apply(&self, batch: Batch) -> Result<(), StoreError>;
}

pub fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = store.get_raw(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let mut batch = Batch::default();
    batch.put(key, value)?;
    store.apply(batch)
}

pub struct SqliteStore {
    conn: Connection,
}

pub fn open_store(workspace: &Path) -> anyhow::Result<SqliteStore> {
    std::fs::create_dir_all(workspace)?;
    let path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(SqliteStore { conn })
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

impl KvStore for SqliteStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    fn apply(&self, batch: Batch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in &batch.ops {
            match value {
                Some(v) => tx.execute(
                    "INSERT INTO kv(key, value) VALUES(?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    (key, v),
                )?,
                None => tx.execute("DELETE FROM kv WHERE key = ?", [key])?,
            };
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    /// In-memory store whose writes can be made to fail on demand.
    #[derive(Default)]
    pub struct MemoryStore {
        pub entries: RefCell<BTreeMap<String, String>>,
        pub fail_writes: Cell<bool>,
    }

    impl MemoryStore {
        pub fn raw(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }
    }

    impl KvStore for MemoryStore {
        fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.entries.borrow().get(key).cloned())
        }

        fn apply(&self, batch: Batch) -> Result<(), StoreError> {
            if self.fail_writes.get() {
                return Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                    Some("database or disk is full".to_string()),
                )));
            }
            let mut entries = self.entries.borrow_mut();
            for (key, value) in batch.ops {
                match value {
                    Some(v) => {
                        entries.insert(key, v);
                    }
                    None => {
                        entries.remove(&key);
                    }
                }
            }
            Ok(())
        }
    }
}
