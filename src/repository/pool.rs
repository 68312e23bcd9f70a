//! Unified database connection pool supporting SQLite and PostgreSQL.
//!
//! The backend is picked at runtime from the database URL.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::{is_postgres_url, to_diesel_error};

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Async PostgreSQL connection type.
#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Milliseconds a SQLite connection waits on a locked database before erroring.
const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;

/// SQLite connection pool (lightweight - creates connections on demand).
#[derive(Clone)]
pub struct SqlitePool {
    database_url: String,
}

impl SqlitePool {
    /// Create a new SQLite pool.
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Get a connection.
    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};",
            SQLITE_BUSY_TIMEOUT_MS
        ))
        .await?;
        Ok(conn)
    }

    /// Get the database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// PostgreSQL connection pool.
#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgPool {
    pool: DeadPool<AsyncPgConnection>,
}

#[cfg(feature = "postgres")]
impl PgPool {
    /// Create a new PostgreSQL pool.
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, DbError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = DeadPool::builder(config)
            .max_size(max_size)
            .build()
            .map_err(to_diesel_error)?;
        Ok(Self { pool })
    }

    /// Get a connection.
    pub async fn get(&self) -> Result<PgConn, DbError> {
        self.pool.get().await.map_err(to_diesel_error)
    }
}

/// Unified database pool that supports both SQLite and PostgreSQL.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl DbPool {
    /// Create a pool from a database URL.
    ///
    /// - `postgres://` or `postgresql://` → PostgreSQL (requires the `postgres` feature)
    /// - Everything else → SQLite
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        if is_postgres_url(url) {
            #[cfg(feature = "postgres")]
            return Ok(DbPool::Postgres(PgPool::new(url, 10)?));

            #[cfg(not(feature = "postgres"))]
            return Err(to_diesel_error(
                "PostgreSQL URL given but shelfscan was built without the `postgres` feature",
            ));
        }

        Ok(DbPool::Sqlite(SqlitePool::new(url)))
    }

    /// Create a SQLite pool from a file path.
    pub fn sqlite_from_path(path: &Path) -> Self {
        DbPool::Sqlite(SqlitePool::from_path(path))
    }

    /// Check if this is a SQLite backend.
    pub fn is_sqlite(&self) -> bool {
        matches!(self, DbPool::Sqlite(_))
    }

    /// Check if this is a PostgreSQL backend.
    #[cfg(feature = "postgres")]
    pub fn is_postgres(&self) -> bool {
        matches!(self, DbPool::Postgres(_))
    }
}

/// Run the same Diesel DSL against whichever backend the pool holds.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn => {
///     navigation::table.load::<NavigationRecord>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
        }
    }};
}

/// Run backend-specific statements where the SQL differs between SQLite and PostgreSQL.
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $sqlite_conn = pool.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $pg_conn = pool.get().await?;
                $pg_body
            }
        }
    }};
}
