//! Payment route handlers.

use axum::{Json, extract::State, http::StatusCode};
use pomelo_core::{Money, OrderId};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, FieldViolation, Result};
use crate::middleware::CurrentUser;
use crate::models::{Payment, PaymentDraft};
use crate::state::AppState;

/// Provider result payload as reported by the client-side flow.
#[derive(Debug, Deserialize, Default)]
pub struct PaymentResultInput {
    pub id: Option<String>,
    pub status: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
}

/// `POST /payments` request body.
#[derive(Debug, Deserialize)]
pub struct RecordPaymentInput {
    pub order_id: OrderId,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_result: PaymentResultInput,
    pub amount: Decimal,
}

/// Record a payment against an existing order.
#[instrument(skip(state, input), fields(user = %user.id))]
pub async fn record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RecordPaymentInput>,
) -> Result<(StatusCode, Json<Payment>)> {
    let mut violations = Vec::new();
    if input.payment_method.trim().is_empty() {
        violations.push(FieldViolation::new("payment_method", "is required"));
    }
    let amount = match Money::usd(input.amount) {
        Ok(amount) => Some(amount),
        Err(_) => {
            violations.push(FieldViolation::new("amount", "must not be negative"));
            None
        }
    };
    let Some(amount) = amount else {
        return Err(AppError::Validation(violations));
    };
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let paid = input.payment_result.status.as_deref() == Some("succeeded");
    let draft = PaymentDraft {
        method: input.payment_method,
        provider_ref: input.payment_result.id,
        provider_status: input.payment_result.status,
        card_brand: input.payment_result.card_brand,
        card_last4: input.payment_result.card_last4,
        amount,
        paid,
    };

    let payment = state.payments().record(input.order_id, draft).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// `POST /create-payment-intent` request body.
#[derive(Debug, Deserialize)]
pub struct CreateIntentInput {
    pub amount: Decimal,
}

/// Create a provider payment intent and hand its client secret to the
/// browser. Provider failures map to the error taxonomy.
#[instrument(skip(state, input), fields(user = %user.id))]
pub async fn create_intent(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateIntentInput>,
) -> Result<Json<serde_json::Value>> {
    if input.amount <= Decimal::ZERO {
        return Err(AppError::Validation(vec![FieldViolation::new(
            "amount",
            "must be positive",
        )]));
    }
    let amount = Money::usd(input.amount)
        .map_err(|e| AppError::Validation(vec![FieldViolation::new("amount", e.to_string())]))?;

    let intent = state.gateway().create_intent(amount, None, None).await?;

    Ok(Json(json!({ "client_secret": intent.client_secret })))
}
