/*!
 * Database schema definitions and migrations.
 *
 * The persistent cache is a single table keyed by the content hash of
 * `(source text, target language)`, with an absolute expiry timestamp in
 * Unix milliseconds. Version 1 stored seconds; its rows are discarded on
 * upgrade since they are only cached results.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing cache schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Upgrading cache schema v{} -> v{}, discarding cached entries",
            current_version, SCHEMA_VERSION
        );
        conn.execute_batch("DROP TABLE IF EXISTS translation_cache;")?;
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        debug!("Cache schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL lets readers proceed while a writer holds the lock
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS translation_cache (
            cache_key TEXT PRIMARY KEY,
            target_language TEXT NOT NULL,
            translated_text TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            expires_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_translation_cache_expires ON translation_cache(expires_at_ms);
        "#,
    )?;

    Ok(())
}
