use axum::extract::FromRef;
use noire_types::{AppError, WorkflowConfig};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthSettings;

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract `State<Pool<Sqlite>>`,
/// `State<AuthSettings>` or `State<Arc<WorkflowConfig>>` directly.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: Pool<Sqlite>,
    pub auth: AuthSettings,
    pub workflow: Arc<WorkflowConfig>,
}

/// Connection options shared by the server and the test harness:
/// foreign keys on, a busy timeout so writers queue instead of failing.
pub fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::internal(format!("Invalid DATABASE_URL: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    Ok(options)
}

/// Create the connection pool. Uses `connect_lazy_with` so no connections
/// open until the first query.
pub fn create_pool(database_url: &str, max_connections: u32) -> Result<Pool<Sqlite>, AppError> {
    let options = connect_options(database_url)?.journal_mode(SqliteJournalMode::Wal);

    Ok(SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy_with(options))
}

/// Run database migrations against the given pool.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::internal(format!("Failed to run database migrations: {e}")))
}
