//! Bearer-token authentication extractors.
//!
//! Token issuance lives outside this service; what arrives here is a
//! signed HS256 token whose claims carry the acting user and role.
//! Admin routes layer [`RequireAdmin`] on top of [`CurrentUser`].

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pomelo_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Role claim distinguishing back-office from storefront tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Acting user id.
    pub sub: i32,
    pub email: Option<String>,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// The authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    pub role: Role,
}

impl AuthUser {
    /// Whether the caller carries the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_owned()))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".to_owned()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".to_owned()))
}

fn decode_claims(token: &str, secret: &SecretString) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))?;
    Ok(data.claims)
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("hello, user {}", user.id)
/// }
/// ```
pub struct CurrentUser(pub AuthUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = decode_claims(token, &app.config().jwt_secret)?;

        Ok(Self(AuthUser {
            id: UserId::new(claims.sub),
            email: claims.email,
            role: claims.role,
        }))
    }
}

/// Extractor that additionally requires the admin role claim.
pub struct RequireAdmin(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin role required".to_owned()));
        }
        Ok(Self(user))
    }
}

/// Sign a token for a user. Used by the CLI's dev-token command and
/// by tests; production tokens come from the identity service.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn issue_token(
    user: UserId,
    email: Option<&str>,
    role: Role,
    secret: &SecretString,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.get(),
        email: email.map(ToOwned::to_owned),
        role,
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
}
