//! Database migration command.
//!
//! Applies the SQL migrations embedded from `crates/api/migrations/`.

use sqlx::PgPool;

use super::{CommandError, required_env};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration
/// fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = required_env("POMELO_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
