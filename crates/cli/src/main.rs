//! Pomelo Market CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! pomelo-cli migrate
//!
//! # Seed the catalog with sample products
//! pomelo-cli seed
//!
//! # Mint a development bearer token
//! pomelo-cli token --user 1 --email jo@example.com
//! pomelo-cli token --user 1 --admin
//! ```
//!
//! # Environment Variables
//!
//! - `POMELO_DATABASE_URL` - `PostgreSQL` connection string
//! - `POMELO_JWT_SECRET` - token signing secret (for `token`)

#![cfg_attr(not(test), forbid(unsafe_code))]
// A CLI talks to its user on stdout.
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pomelo-cli")]
#[command(author, version, about = "Pomelo Market CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog with sample products
    Seed,
    /// Mint a development bearer token
    Token {
        /// User id to place in the token
        #[arg(long)]
        user: i32,
        /// Email claim
        #[arg(long)]
        email: Option<String>,
        /// Issue an admin-role token
        #[arg(long)]
        admin: bool,
        /// Token lifetime in seconds
        #[arg(long, default_value_t = 86_400)]
        ttl: i64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pomelo_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed => commands::seed::run().await,
        Commands::Token {
            user,
            email,
            admin,
            ttl,
        } => commands::token::run(user, email.as_deref(), admin, ttl),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
