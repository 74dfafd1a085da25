/// Database layer for the TMS server
///
/// Manages the SQLite connection pool, embedded migrations, and the typed
/// row records for accounts and tasks.

pub mod account;
pub mod task;

use crate::error::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create a SQLite connection pool from a `sqlite:` URL
pub async fn create_pool(url: &str, options: DatabaseOptions) -> AppResult<SqlitePool> {
    let in_memory = is_in_memory(url);

    let mut connect_options = SqliteConnectOptions::from_str(url)
        .map_err(|e| AppError::Config(format!("Invalid DATABASE_URL '{}': {}", url, e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if !in_memory {
        // Ensure parent directory exists
        if let Some(parent) = connect_options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        connect_options = connect_options.journal_mode(if options.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        });
    }

    // Every connection to an in-memory database is a separate database,
    // so the pool is pinned to one connection that never expires.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(options.max_connections)
    };

    let pool = pool_options.connect_with(connect_options).await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create a migrated in-memory database
pub async fn in_memory() -> AppResult<SqlitePool> {
    let pool = create_pool("sqlite::memory:", DatabaseOptions::default()).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
