//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, migration support, and per-connection
//! pragmas for the SQLite ledger file.

use std::path::Path;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use url::Url;

use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Milliseconds a writer waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        configure_sqlite_connection(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for the given database URL.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(4)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Run all pending database migrations.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Database(e.to_string()))?;
    Ok(())
}

/// Create a pool and bring the schema up to date.
///
/// # Errors
/// Returns an error if the file cannot be opened or migrated.
pub fn open(database_url: &str) -> Result<DbPool> {
    let pool = create_pool(database_url)?;
    run_migrations(&pool)?;
    Ok(pool)
}

/// Pool over an existing ledger file that SQLite opens with `mode=ro`.
///
/// No migrations run and every write is refused by SQLite itself.
///
/// # Errors
/// Returns an error if the file does not exist or cannot be opened.
pub fn open_read_only(path: &Path) -> Result<DbPool> {
    let absolute = std::fs::canonicalize(path)?;
    let mut uri = Url::from_file_path(&absolute).map_err(|()| {
        Error::Connection(format!("cannot address {} as a file URI", absolute.display()))
    })?;
    uri.set_query(Some("mode=ro"));
    create_pool(uri.as_str())
}

/// Configure SQLite connection pragmas.
///
/// `busy_timeout` lets a second process queue behind an in-flight
/// reservation instead of failing immediately.
///
/// # Errors
/// Returns an error if a pragma fails to apply.
pub fn configure_sqlite_connection(
    conn: &mut SqliteConnection,
) -> std::result::Result<(), diesel::result::Error> {
    diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}")).execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    #[derive(diesel::QueryableByName)]
    struct BusyTimeout {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        timeout: i64,
    }

    fn temp_url(dir: &tempfile::TempDir) -> String {
        dir.path().join("ledger.db").to_string_lossy().to_string()
    }

    #[test]
    fn open_creates_settlements_table() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open(&temp_url(&dir)).unwrap();
        let mut conn = pool.get().unwrap();

        let tables: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name",
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();

        assert_eq!(tables, vec!["settlements".to_string()]);
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&temp_url(&dir)).unwrap();

        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();
    }

    #[test]
    fn read_only_pool_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let url = temp_url(&dir);
        drop(open(&url).unwrap());

        let pool = open_read_only(Path::new(&url)).unwrap();
        let mut conn = pool.get().unwrap();
        let tables: Vec<TableName> =
            diesel::sql_query("SELECT name FROM sqlite_master WHERE name = 'settlements'")
                .load(&mut conn)
                .unwrap();
        assert_eq!(tables.len(), 1);

        let write = diesel::sql_query("DELETE FROM settlements").execute(&mut conn);
        assert!(write.is_err());
    }

    #[test]
    fn read_only_open_needs_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.db");
        assert!(open_read_only(&missing).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn pooled_connections_get_busy_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&temp_url(&dir)).unwrap();
        let mut conn = pool.get().unwrap();

        let rows: Vec<BusyTimeout> = diesel::sql_query("PRAGMA busy_timeout")
            .load(&mut conn)
            .unwrap();
        assert_eq!(rows[0].timeout, i64::from(BUSY_TIMEOUT_MS));
    }
}
