/// Embedded schema migrations
///
/// SQL files live in this crate's `migrations/` directory and are compiled
/// into the binary, so a deployed server never depends on files on disk.

use sqlx::postgres::PgPool;
use tracing::{error, info};

/// Applies all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails; the failing migration is rolled
/// back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Migration failed");
            e
        })?;

    info!("Database schema is up to date");
    Ok(())
}
