//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use pomelo_core::OrderId;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::{AuthUser, CurrentUser, RequireAdmin};
use crate::models::Order;
use crate::services::checkout::CheckoutInput;
use crate::state::AppState;

/// Checkout: validate, charge, persist, clear cart.
///
/// The `Idempotency-Key` header (or the body field) makes a retry
/// replay the stored order instead of charging twice.
#[instrument(skip(state, headers, input), fields(user = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    Json(mut input): Json<CheckoutInput>,
) -> Result<(StatusCode, Json<Order>)> {
    if input.idempotency_key.is_none()
        && let Some(key) = headers
            .get("idempotency-key")
            .and_then(|v| v.to_str().ok())
    {
        input.idempotency_key = Some(key.to_owned());
    }

    let order = state.checkout().checkout(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
#[instrument(skip(state), fields(user = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.ledger().list_by_user(user.id).await?))
}

/// Every order (admin).
#[instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.ledger().list_all().await?))
}

/// Fetch an order the caller owns (or any order, for admins).
/// A foreign order reads as 404 rather than confirming it exists.
async fn owned_order(state: &AppState, user: &AuthUser, id: OrderId) -> Result<Order> {
    let order = state
        .ledger()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    if order.user_id != user.id && !user.is_admin() {
        return Err(AppError::NotFound(format!("order {id}")));
    }
    Ok(order)
}

/// One order, for its owner or an admin.
#[instrument(skip(state), fields(user = %user.id))]
pub async fn get_one(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(owned_order(&state, &user, id).await?))
}

/// Mark an order paid. Rejects a second call.
#[instrument(skip(state), fields(user = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    owned_order(&state, &user, id).await?;
    Ok(Json(state.ledger().mark_paid(id).await?))
}

/// Mark an order delivered (admin). Rejects a second call and fires
/// the delivery notification.
#[instrument(skip(state))]
pub async fn deliver(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.ledger().mark_delivered(id).await?))
}

/// Hard-delete an order (admin).
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>> {
    state.ledger().delete(id).await?;
    Ok(Json(json!({ "deleted": id })))
}
