//! Payment records linked 1:1 to orders.

use chrono::{DateTime, Utc};
use pomelo_core::{Money, OrderId, PaymentId};
use serde::Serialize;

/// A recorded payment for an order.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Payment method chosen at checkout (e.g. `"card"`).
    pub method: String,
    /// Provider-side intent/charge id.
    pub provider_ref: Option<String>,
    /// Provider-reported status (e.g. `"succeeded"`).
    pub provider_status: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub amount: Money,
    pub is_paid: bool,
    /// Set automatically when `is_paid` transitions to true.
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub method: String,
    pub provider_ref: Option<String>,
    pub provider_status: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub amount: Money,
    /// Whether the provider reported the charge as settled. When
    /// true, the stored record gets `is_paid = true` and `paid_at`
    /// stamped at insert time.
    pub paid: bool,
}
