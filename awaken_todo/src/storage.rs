//! On-device key-value storage.
//!
//! The to-do collection is kept as one serialized value under a single key.
//! [`SqliteKvStore`] backs that slot with a SQLite table through SeaORM;
//! [`MemoryKvStore`] keeps it in process memory.
//!
//! Values are replaced whole on every write. There are no partial updates and
//! no transactions spanning several keys.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, ExecResult,
    FromQueryResult, Statement,
};

use crate::error::StoreError;

/// A string-valued persistent key-value slot.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing was ever written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Create the `_awaken_kv` table if it does not already exist.
///
/// Called automatically by [`SqliteKvStore::connect`] and
/// [`SqliteKvStore::from_connection`].
pub async fn create_kv_table(db: &impl ConnectionTrait) -> Result<ExecResult, sea_orm::DbErr> {
    db.execute_unprepared(
        "CREATE TABLE IF NOT EXISTS _awaken_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )",
    )
    .await
}

#[derive(Debug, FromQueryResult)]
struct KvRow {
    value: String,
}

/// Key-value slot stored in a SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    db: DatabaseConnection,
}

impl SqliteKvStore {
    /// Open (or create) the database at `url` and ensure the table exists.
    ///
    /// In-memory URLs are pinned to a single pooled connection, since every
    /// SQLite connection to `:memory:` opens a distinct database.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let mut opts = ConnectOptions::new(url);
        opts.sqlx_logging_level(log::LevelFilter::Debug);
        if url.contains(":memory:") {
            opts.max_connections(1).min_connections(1);
        }
        let db = Database::connect(opts).await?;
        Self::from_connection(db).await
    }

    /// Reuse an existing connection, e.g. one shared with other application tables.
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self, StoreError> {
        create_kv_table(&db).await?;
        Ok(Self { db })
    }

    /// Get a reference to the underlying SeaORM connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = KvRow::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT value FROM _awaken_kv WHERE key = $1",
            [key.into()],
        ))
        .one(&self.db)
        .await?;

        Ok(row.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db
            .execute_raw(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "INSERT OR REPLACE INTO _awaken_kv (key, value, updated_at)
                 VALUES ($1, $2, strftime('%s', 'now'))",
                [key.into(), value.into()],
            ))
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.db
            .execute_raw(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "DELETE FROM _awaken_kv WHERE key = $1",
                [key.into()],
            ))
            .await?;
        Ok(())
    }
}

/// Process-local key-value slot. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, e.g. with a blob written by an earlier session.
    pub fn with_value(self, key: &str, value: impl Into<String>) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.get("todos").await.unwrap(), None);

        kv.set("todos", "[]").await.unwrap();
        kv.set("todos", "[1]").await.unwrap();
        assert_eq!(kv.get("todos").await.unwrap().as_deref(), Some("[1]"));

        kv.remove("todos").await.unwrap();
        kv.remove("todos").await.unwrap();
        assert_eq!(kv.get("todos").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let kv = SqliteKvStore::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");

        assert_eq!(kv.get("todos").await.unwrap(), None);

        kv.set("todos", r#"[{"id":"a"}]"#).await.unwrap();
        kv.set("todos", "[]").await.unwrap();
        assert_eq!(kv.get("todos").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(kv.get("other").await.unwrap(), None);

        kv.remove("todos").await.unwrap();
        assert_eq!(kv.get("todos").await.unwrap(), None);
    }
}
