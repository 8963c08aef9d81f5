//! Versioned schema for the persistent store.
//!
//! The on-disk version lives in `PRAGMA user_version`. Upgrades are additive:
//! each step only creates collections that are missing, so existing rows are
//! never rewritten.

use crate::error::{Result, TryOnError};
use rusqlite::Connection;
use tracing::{debug, info};

/// Schema steps, applied in order. Index + 1 is the version a step produces.
const MIGRATIONS: &[&str] = &[
    // v1: the model picture
    "CREATE TABLE IF NOT EXISTS user_model (
        id TEXT PRIMARY KEY,
        image_url TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );",
    // v2: wardrobe catalog and generic TTL cache
    "CREATE TABLE IF NOT EXISTS wardrobe (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        category TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS cache (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_cache_created ON cache(created_at_ms);",
];

/// Read the version recorded in the database file.
pub fn current_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to `target`, returning the version found on disk.
pub fn migrate(conn: &mut Connection, target: i64) -> Result<i64> {
    let found = current_version(conn)?;
    if found > target {
        return Err(TryOnError::SchemaTooNew {
            found,
            expected: target,
        });
    }
    if found == target {
        debug!("Store schema at version {}", found);
        return Ok(found);
    }

    let tx = conn.transaction()?;
    for (index, step) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;
        if version <= found || version > target {
            continue;
        }
        tx.execute_batch(step)?;
        debug!("Applied store schema step {}", version);
    }
    tx.pragma_update(None, "user_version", target)?;
    tx.commit()?;

    info!("Upgraded store schema from version {} to {}", found, target);
    Ok(found)
}

/// Highest version this build knows how to create.
pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}
