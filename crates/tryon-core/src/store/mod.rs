//! Persistent store for the try-on core.
//!
//! One SQLite database holds three independent collections:
//! - `user_model`: the singleton model picture
//! - `wardrobe`: the garment catalog, keyed by item id
//! - `cache`: generic key-value entries that expire after 24 hours
//!
//! A [`Store`] is a cheap handle to a single shared connection. It has an
//! explicit lifecycle: once [`Store::close`] is called every clone of the
//! handle fails with a storage error. [`LazyStore`] defers opening until the
//! first caller needs it and memoizes the result.

mod cache;
mod clock;
mod schema;
mod user_model;
mod wardrobe;

pub use cache::{CacheEntry, CacheRepository};
pub use clock::{Clock, ManualClock, SystemClock};
pub use user_model::UserModelRepository;
pub use wardrobe::WardrobeRepository;

use crate::config::StoreConfig;
use crate::error::{Result, TryOnError};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

struct StoreInner {
    conn: Mutex<Option<Connection>>,
    location: StoreLocation,
    clock: Arc<dyn Clock>,
}

/// Handle to the versioned key-value store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.inner.location)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Store {
    /// Open (or create) the database file at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(StoreLocation::File(db_path.into()), Arc::new(SystemClock))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(StoreLocation::Memory, Arc::new(SystemClock))
    }

    /// Open with an explicit location and time source.
    pub fn open_with(location: StoreLocation, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut conn = match &location {
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|e| TryOnError::Io {
                            message: format!("Failed to create store directory: {}", parent.display()),
                            path: Some(parent.to_path_buf()),
                            source: Some(e),
                        })?;
                    }
                }
                Connection::open(path).map_err(|e| TryOnError::Storage {
                    message: format!("Failed to open store database: {}", e),
                    source: Some(e),
                })?
            }
            StoreLocation::Memory => Connection::open_in_memory()?,
        };

        Self::configure_connection(&conn, &location)?;
        let found = schema::migrate(&mut conn, StoreConfig::SCHEMA_VERSION)?;
        info!(
            "Opened store {:?} (schema {} -> {})",
            location,
            found,
            StoreConfig::SCHEMA_VERSION
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(Some(conn)),
                location,
                clock,
            }),
        })
    }

    fn configure_connection(conn: &Connection, location: &StoreLocation) -> Result<()> {
        conn.busy_timeout(std::time::Duration::from_millis(StoreConfig::BUSY_TIMEOUT_MS))?;
        if matches!(location, StoreLocation::File(_)) {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        }
        Ok(())
    }

    /// Close the connection. Further operations on any clone fail.
    pub fn close(&self) -> Result<()> {
        let conn = self
            .inner
            .conn
            .lock()
            .map_err(|_| TryOnError::storage("Failed to acquire store connection lock"))?
            .take();
        match conn {
            Some(conn) => {
                conn.close().map_err(|(_, e)| TryOnError::Storage {
                    message: format!("Failed to close store: {}", e),
                    source: Some(e),
                })?;
                debug!("Closed store {:?}", self.inner.location);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .conn
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.inner.location
    }

    /// Database file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.location {
            StoreLocation::File(path) => Some(path),
            StoreLocation::Memory => None,
        }
    }

    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> Result<i64> {
        self.with_conn(|conn| schema::current_version(conn))
    }

    pub fn user_model(&self) -> UserModelRepository {
        UserModelRepository::new(self.clone())
    }

    pub fn wardrobe(&self) -> WardrobeRepository {
        WardrobeRepository::new(self.clone())
    }

    pub fn cache(&self) -> CacheRepository {
        CacheRepository::new(self.clone())
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Run `f` against the open connection.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .inner
            .conn
            .lock()
            .map_err(|_| TryOnError::storage("Failed to acquire store connection lock"))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| TryOnError::storage("Store is closed"))?;
        f(conn)
    }
}

/// A store that is opened on first use and then shared.
pub struct LazyStore {
    location: StoreLocation,
    clock: Arc<dyn Clock>,
    cell: OnceCell<Store>,
}

impl LazyStore {
    pub fn new(location: StoreLocation, clock: Arc<dyn Clock>) -> Self {
        Self {
            location,
            clock,
            cell: OnceCell::new(),
        }
    }

    /// Get the shared store, opening it on the first call.
    ///
    /// A failed open is not memoized; the next call tries again.
    pub async fn get(&self) -> Result<&Store> {
        self.cell
            .get_or_try_init(|| async {
                Store::open_with(self.location.clone(), Arc::clone(&self.clock))
            })
            .await
    }

    /// The store, if it has already been opened.
    pub fn get_if_open(&self) -> Option<&Store> {
        self.cell.get()
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("tryon.sqlite");
        let store = Store::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.path(), Some(db_path.as_path()));
        assert_eq!(store.schema_version().unwrap(), StoreConfig::SCHEMA_VERSION);
    }

    #[test]
    fn test_close_invalidates_all_clones() {
        let store = Store::open_in_memory().unwrap();
        let other = store.clone();
        assert!(other.is_open());

        store.close().unwrap();
        assert!(!other.is_open());
        let err = other.schema_version().unwrap_err();
        assert!(matches!(err, TryOnError::Storage { .. }));

        // Closing twice is harmless
        store.close().unwrap();
    }

    #[test]
    fn test_reopen_preserves_data() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tryon.sqlite");
        {
            let store = Store::open(&db_path).unwrap();
            store.cache().put("greeting", &"hello").unwrap();
            store.close().unwrap();
        }
        let store = Store::open(&db_path).unwrap();
        let value: Option<String> = store.cache().get("greeting").unwrap();
        assert_eq!(value.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_lazy_store_opens_once() {
        let temp_dir = TempDir::new().unwrap();
        let lazy = LazyStore::new(
            StoreLocation::File(temp_dir.path().join("tryon.sqlite")),
            Arc::new(SystemClock),
        );
        assert!(lazy.get_if_open().is_none());

        let first = lazy.get().await.unwrap().clone();
        let second = lazy.get().await.unwrap();
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
        assert!(lazy.get_if_open().is_some());
    }
}
