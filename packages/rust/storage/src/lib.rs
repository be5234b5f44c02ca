//! Local key-value persistence for PowerNI.
//!
//! [`KeyValueStore`] is the seam the subscription pipeline depends on: raw
//! JSON text per key, with typed `load`/`save` of whole collections on top,
//! and an `update` cycle that no other writer can interleave with.
//! Two implementations ship here:
//! - [`Storage`]: a libSQL database file (durable; the CLI uses this)
//! - [`MemoryStore`]: a process-local map for tests and dry runs
//!
//! **Access rules:**
//! - `subscribe`: read-write via [`Storage::open`]; concurrent writers
//!   serialize on the database write lock inside `update`
//! - `subscribers` listing: read-only via [`Storage::open_readonly`]

mod migrations;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use libsql::{Connection, Database, params};
use powerni_shared::{PowerniError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// A durable map from string keys to JSON text.
///
/// A `put` either stores the whole value or nothing.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Raw value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Load the collection stored under `key`. `None` if nothing was ever saved.
    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        match self.get(key).await? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Persist the full collection under `key`.
    async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        self.put(key, &encode(key, items)?).await
    }

    /// Read-modify-write the raw value under `key`.
    ///
    /// `f` sees the current value and returns the replacement plus an output.
    /// If `f` fails nothing is written. The default runs `get` then `put`;
    /// stores shared between handles override it so that no other writer can
    /// slip in between.
    async fn update<R, E, F>(&self, key: &str, f: F) -> std::result::Result<R, E>
    where
        E: From<PowerniError>,
        F: FnOnce(Option<String>) -> std::result::Result<(String, R), E>,
    {
        let current = self.get(key).await?;
        let (value, out) = f(current)?;
        self.put(key, &value).await?;
        Ok(out)
    }

    /// [`update`](Self::update) on a whole collection. A missing key is an
    /// empty collection.
    async fn update_list<T, R, E, F>(&self, key: &str, f: F) -> std::result::Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<PowerniError>,
        F: FnOnce(Vec<T>) -> std::result::Result<(Vec<T>, R), E>,
    {
        self.update::<R, E, _>(key, |raw| {
            let items = match raw {
                Some(raw) => decode(key, &raw)?,
                None => Vec::new(),
            };
            let (items, out) = f(items)?;
            Ok((encode(key, &items)?, out))
        })
        .await
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<Vec<T>> {
    serde_json::from_str(raw)
        .map_err(|e| PowerniError::Storage(format!("corrupt value under '{key}': {e}")))
}

fn encode<T: Serialize>(key: &str, items: &[T]) -> Result<String> {
    serde_json::to_string(items)
        .map_err(|e| PowerniError::Storage(format!("failed to encode '{key}': {e}")))
}

// ---------------------------------------------------------------------------
// Storage (libSQL)
// ---------------------------------------------------------------------------

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PowerniError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PowerniError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PowerniError::Storage(e.to_string()))?;
        // Another process may hold the write lock for a moment.
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| PowerniError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PowerniError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PowerniError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    PowerniError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    async fn exec(&self, sql: &str) -> Result<()> {
        self.conn
            .execute(sql, params![])
            .await
            .map(|_| ())
            .map_err(|e| PowerniError::Storage(format!("{sql} failed: {e}")))
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(PowerniError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }
}

impl KeyValueStore for Storage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| PowerniError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| PowerniError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(PowerniError::Storage(e.to_string())),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                params![key, value, now.as_str()],
            )
            .await
            .map_err(|e| PowerniError::Storage(e.to_string()))?;
        tracing::debug!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    /// Runs inside `BEGIN IMMEDIATE`, so handles on other connections or in
    /// other processes wait for the cycle to commit.
    async fn update<R, E, F>(&self, key: &str, f: F) -> std::result::Result<R, E>
    where
        E: From<PowerniError>,
        F: FnOnce(Option<String>) -> std::result::Result<(String, R), E>,
    {
        self.check_writable()?;
        self.exec("BEGIN IMMEDIATE").await?;

        let outcome = async {
            let current = self.get(key).await?;
            let (value, out) = f(current)?;
            self.put(key, &value).await?;
            Ok::<R, E>(out)
        }
        .await;

        match outcome {
            Ok(out) => match self.exec("COMMIT").await {
                Ok(()) => Ok(out),
                Err(e) => {
                    let _ = self.exec("ROLLBACK").await;
                    Err(e.into())
                }
            },
            Err(e) => {
                if let Err(rollback) = self.exec("ROLLBACK").await {
                    tracing::warn!(key, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process [`KeyValueStore`]; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| PowerniError::Storage("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn update<R, E, F>(&self, key: &str, f: F) -> std::result::Result<R, E>
    where
        E: From<PowerniError>,
        F: FnOnce(Option<String>) -> std::result::Result<(String, R), E>,
    {
        let mut values = self.lock()?;
        let (value, out) = f(values.get(key).cloned())?;
        values.insert(key.to_string(), value);
        Ok(out)
    }
}
