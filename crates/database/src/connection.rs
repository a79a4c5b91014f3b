use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;

/// Translates the configured limits into pool options.
///
/// `max_connections` caps open connections, `min_connections` is the idle
/// floor kept alive, idle connections above it close after `idle_timeout`,
/// and every connection is recycled after `max_lifetime`.
pub fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .idle_timeout(Some(settings.idle_timeout()))
        .max_lifetime(Some(settings.max_lifetime()))
        .acquire_timeout(settings.acquire_timeout())
}

/// Establishes a connection pool to the PostgreSQL database.
///
/// When `statement_timeout_ms` is configured it is set on every connection,
/// so the server abandons a statement even if the client stops waiting.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    if settings.url.trim().is_empty() {
        return Err(DbError::ConnectionConfigError(
            "DATABASE_URL must be set.".to_string(),
        ));
    }

    let mut options = PgConnectOptions::from_str(&settings.url)
        .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?;

    if let Some(timeout_ms) = settings.statement_timeout_ms {
        options = options.options([("statement_timeout", format!("{timeout_ms}ms"))]);
    }

    let pool = pool_options(settings).connect_with(options).await?;

    tracing::info!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        statement_timeout_ms = ?settings.statement_timeout_ms,
        "Connected to PostgreSQL"
    );

    Ok(pool)
}

/// Applies the embedded migrations: forms tables, constraints and triggers.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
