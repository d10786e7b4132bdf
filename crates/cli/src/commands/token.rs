//! Development bearer-token minting.
//!
//! Production tokens come from the identity service; this exists so
//! local curl sessions and smoke tests can authenticate.

use pomelo_api::middleware::{Role, issue_token};
use pomelo_core::UserId;
use secrecy::SecretString;

use super::{CommandError, required_env};

/// Mint and print a signed token.
///
/// # Errors
///
/// Returns an error if the secret is missing or signing fails.
pub fn run(user: i32, email: Option<&str>, admin: bool, ttl: i64) -> Result<(), CommandError> {
    let secret = SecretString::from(required_env("POMELO_JWT_SECRET")?);
    let role = if admin { Role::Admin } else { Role::Customer };

    let token = issue_token(UserId::new(user), email, role, &secret, ttl)?;
    println!("{token}");
    Ok(())
}
