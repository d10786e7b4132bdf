//! Cart route handlers.

use axum::{Json, extract::Path, extract::State};
use pomelo_core::CartLineId;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::CartView;
use crate::services::cart::AddItemInput;
use crate::state::AppState;

/// Add an item to the caller's cart, merging on the variant key.
#[instrument(skip(state, input), fields(user = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddItemInput>,
) -> Result<Json<CartView>> {
    let cart = state.cart_engine().add_item(user.id, input).await?;
    Ok(Json(cart))
}

/// The caller's cart, enriched with current product data.
#[instrument(skip(state), fields(user = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartView>> {
    let cart = state
        .cart_engine()
        .get_cart(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("cart".to_owned()))?;
    Ok(Json(cart))
}

/// Remove one line. Removing the last line deletes the cart; the
/// response is then an empty cart view.
#[instrument(skip(state), fields(user = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(line_id): Path<CartLineId>,
) -> Result<Json<CartView>> {
    let cart = state.cart_engine().remove_item(user.id, line_id).await?;
    Ok(Json(cart))
}
