//! Payment repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomelo_core::{OrderId, PaymentId};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{Payment, PaymentDraft};
use crate::store::{PaymentStore, StoreError};

use super::money;

/// Postgres-backed payment store.
#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    /// Create a payment store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PaymentRow {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: String,
    pub provider_ref: Option<String>,
    pub provider_status: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub amount: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRow {
    pub(crate) fn into_payment(self) -> Payment {
        Payment {
            id: self.id,
            order_id: self.order_id,
            method: self.method,
            provider_ref: self.provider_ref,
            provider_status: self.provider_status,
            card_brand: self.card_brand,
            card_last4: self.card_last4,
            amount: money(self.amount),
            is_paid: self.is_paid,
            paid_at: self.paid_at,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn record(&self, order: OrderId, draft: PaymentDraft) -> Result<Payment, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.order WHERE id = $1)")
                .bind(order)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(StoreError::NotFound(format!("order {order}")));
        }

        let row = sqlx::query_as::<_, PaymentRow>(
            "INSERT INTO shop.payment
                 (order_id, method, provider_ref, provider_status, card_brand, card_last4,
                  amount, is_paid, paid_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $8 THEN now() ELSE NULL END)
             RETURNING id, order_id, method, provider_ref, provider_status, card_brand, card_last4,
                       amount, is_paid, paid_at, created_at",
        )
        .bind(order)
        .bind(&draft.method)
        .bind(draft.provider_ref.as_deref())
        .bind(draft.provider_status.as_deref())
        .bind(draft.card_brand.as_deref())
        .bind(draft.card_last4.as_deref())
        .bind(draft.amount.amount)
        .bind(draft.paid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(format!("order {order} already has a payment"));
            }
            StoreError::Database(e)
        })?;

        Ok(row.into_payment())
    }

    async fn get_by_order(&self, order: OrderId) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, method, provider_ref, provider_status, card_brand, card_last4,
                    amount, is_paid, paid_at, created_at
             FROM shop.payment WHERE order_id = $1",
        )
        .bind(order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PaymentRow::into_payment))
    }
}
