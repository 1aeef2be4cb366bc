/*!
 * Database module for persistent storage of translations.
 *
 * SQLite keeps the translation cache across process restarts so that
 * re-running a document job does not repeat provider calls.
 */

pub mod repository;
pub mod schema;

pub use repository::SqliteCache;
