//! Request middleware and extractors.

pub mod auth;
pub mod request_id;

pub use auth::{AuthUser, Claims, CurrentUser, RequireAdmin, Role, issue_token};
pub use request_id::request_id;
