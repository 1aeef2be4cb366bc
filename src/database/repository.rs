/*!
 * Persistent translation cache backed by SQLite.
 *
 * Every statement is a single atomic `SELECT`, `INSERT OR REPLACE` or
 * `DELETE` on the hashed key, run on the blocking pool so async workers
 * never block. Expiry times are stored in Unix milliseconds.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::schema;
use crate::errors::CacheError;
use crate::translation::cache::{TranslationCache, cache_key, truncate_text};

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "translation_cache.db";

/// Directory under the user's data directory holding the cache
const DEFAULT_DB_DIRNAME: &str = "layout-translator";

/// SQLite-backed `TranslationCache`
#[derive(Debug, Clone)]
pub struct SqliteCache {
    /// Database file, `:memory:` for in-memory caches
    path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open or create a cache database file, dropping rows that already expired
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
        }

        info!("Opening translation cache database at: {:?}", path);
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open cache database: {:?}", path))?;
        schema::initialize_schema(&conn)?;

        let purged = delete_expired(&conn, unix_millis())
            .context("Failed to purge expired cache entries")?;
        if purged > 0 {
            info!("Purged {} expired cache entries", purged);
        }

        Ok(Self::from_connection(path, conn))
    }

    /// Open the cache at the default data directory
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Cache backed by an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory cache database")?;
        schema::initialize_schema(&conn)?;
        Ok(Self::from_connection(PathBuf::from(":memory:"), conn))
    }

    fn from_connection(path: PathBuf, conn: Connection) -> Self {
        Self {
            path,
            connection: Arc::new(Mutex::new(conn)),
        }
    }

    /// `<data dir>/layout-translator/translation_cache.db`
    pub fn default_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Database file backing this cache
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete expired rows, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = unix_millis();
        self.blocking(move |conn| delete_expired(conn, now)).await
    }

    /// Number of rows, expired ones included
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.blocking(|conn| {
            conn.query_row("SELECT COUNT(*) FROM translation_cache", [], |row| row.get::<_, i64>(0))
                .map(|count| count as usize)
        })
        .await
    }

    /// Run one statement on the blocking pool
    async fn blocking<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || f(&connection.lock()))
            .await
            .map_err(|e| CacheError::Unavailable(format!("cache task panicked: {}", e)))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

fn delete_expired(conn: &Connection, now: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM translation_cache WHERE expires_at_ms <= ?1", params![now])
}

fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl TranslationCache for SqliteCache {
    async fn lookup(
        &self,
        source_text: &str,
        target_language: &str,
    ) -> Result<Option<String>, CacheError> {
        let key = cache_key(source_text, target_language);
        let now = unix_millis();

        let found = self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT translated_text FROM translation_cache WHERE cache_key = ?1 AND expires_at_ms > ?2",
                    params![key, now],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await?;

        debug!(
            "Persistent cache {} for '{}' (-> {})",
            if found.is_some() { "hit" } else { "miss" },
            truncate_text(source_text, 30),
            target_language
        );

        Ok(found)
    }

    async fn store(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = cache_key(source_text, target_language);
        let target_language = target_language.to_string();
        let translated_text = translated_text.to_string();
        let created_at = unix_millis();
        let expires_at = created_at.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));

        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO translation_cache (cache_key, target_language, translated_text, created_at_ms, expires_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![key, target_language, translated_text, created_at, expires_at],
            )
        })
        .await?;

        Ok(())
    }
}
