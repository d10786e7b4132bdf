//! Catalog route handlers.

use axum::{Json, extract::Path, extract::State};
use pomelo_core::ProductId;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// List all products, newest first.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list().await?))
}

/// Fetch one product.
#[instrument(skip(state))]
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}
