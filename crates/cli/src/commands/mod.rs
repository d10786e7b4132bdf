//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod token;

use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("store error: {0}")]
    Store(#[from] pomelo_api::store::StoreError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Read a required environment variable, loading `.env` first.
pub(crate) fn required_env(name: &'static str) -> Result<String, CommandError> {
    dotenvy::dotenv().ok();
    std::env::var(name).map_err(|_| CommandError::MissingEnvVar(name))
}
