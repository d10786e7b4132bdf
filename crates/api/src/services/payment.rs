//! Payment gateway adapter.
//!
//! Talks to the card-processing provider to create payment intents
//! and classifies provider failures into a fixed taxonomy. The
//! adapter never retries; retry policy belongs to the caller.

use async_trait::async_trait;
use pomelo_core::Money;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::config::PaymentProviderConfig;

/// Provider failures, classified.
///
/// The classification drives both the HTTP status returned to the
/// client and whether the provider's message may be shown verbatim.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Declined/bad card. User-fixable; message surfaced verbatim.
    #[error("card error: {0}")]
    Card(String),

    /// Malformed request parameters. A bug in the calling client.
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),

    /// Provider-side fault. Retryable; generic message to the user.
    #[error("payment provider error: {0}")]
    Api(String),

    /// Network failure or timeout reaching the provider. Retryable.
    #[error("payment connection error: {0}")]
    Connection(String),

    /// Misconfigured credentials. Operator problem, not user-fixable.
    #[error("payment authentication error: {0}")]
    Auth(String),

    /// Anything the taxonomy doesn't recognize.
    #[error("payment error: {0}")]
    Other(String),
}

/// A created payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// Provider-side intent id.
    pub id: String,
    /// Provider-reported status (`"succeeded"`, `"requires_action"`, ...).
    pub status: String,
    /// Secret handed to the browser to finish confirmation.
    pub client_secret: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub amount: Money,
}

impl PaymentIntent {
    /// Whether the provider reported the charge as settled.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// Interface to the external card-processing provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for `amount`, confirming against
    /// `token` when one is supplied.
    ///
    /// `idempotency_key` is forwarded to the provider so a retried
    /// checkout reuses the original charge instead of creating a
    /// second one.
    async fn create_intent(
        &self,
        amount: Money,
        token: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, PaymentError>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Reqwest-backed gateway speaking the provider's REST API.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: SecretString,
}

impl HttpPaymentGateway {
    /// Build a gateway from provider configuration.
    ///
    /// The request timeout is explicit: a provider that stops
    /// answering surfaces as [`PaymentError::Connection`] instead of
    /// hanging the checkout.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Other`] if the HTTP client fails to
    /// build.
    pub fn new(config: &PaymentProviderConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
        })
    }
}

/// Successful intent response body.
#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    status: String,
    client_secret: Option<String>,
    #[serde(default)]
    payment_method_details: Option<PaymentMethodDetails>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodDetails {
    card: Option<CardDetails>,
}

#[derive(Debug, Deserialize)]
struct CardDetails {
    brand: Option<String>,
    last4: Option<String>,
}

/// Error response body: `{"error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Map a provider-reported error category onto the taxonomy.
///
/// Anything unrecognized lands in [`PaymentError::Other`] so raw
/// provider details never reach a client unclassified.
fn classify(kind: Option<&str>, message: String) -> PaymentError {
    match kind {
        Some("card_error") => PaymentError::Card(message),
        Some("invalid_request_error") => PaymentError::InvalidRequest(message),
        Some("api_error") => PaymentError::Api(message),
        Some("authentication_error") => PaymentError::Auth(message),
        _ => PaymentError::Other(message),
    }
}

/// Map a transport-level failure onto the taxonomy. Timeouts count as
/// connection errors: retryable from the caller's point of view.
fn classify_transport(err: &reqwest::Error) -> PaymentError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        PaymentError::Connection(err.to_string())
    } else {
        PaymentError::Other(err.to_string())
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        amount: Money,
        token: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, PaymentError> {
        let minor = amount.minor_units().ok_or_else(|| {
            PaymentError::InvalidRequest(format!("amount out of range: {amount}"))
        })?;

        let mut params = vec![
            ("amount", minor.to_string()),
            ("currency", amount.currency.as_provider_code().to_owned()),
        ];
        if let Some(token) = token {
            params.push(("payment_method", token.to_owned()));
            params.push(("confirm", "true".to_owned()));
        }

        let mut request = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await.map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if status.is_success() {
            let body: IntentResponse = response
                .json()
                .await
                .map_err(|e| PaymentError::Api(format!("malformed provider response: {e}")))?;

            let card = body.payment_method_details.and_then(|d| d.card);
            return Ok(PaymentIntent {
                id: body.id,
                status: body.status,
                client_secret: body.client_secret,
                card_brand: card.as_ref().and_then(|c| c.brand.clone()),
                card_last4: card.and_then(|c| c.last4),
                amount,
            });
        }

        // Provider signalled failure; classify from its error body.
        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(classify(
                body.error.kind.as_deref(),
                body.error
                    .message
                    .unwrap_or_else(|| format!("provider returned {status}")),
            )),
            Err(_) => Err(PaymentError::Api(format!("provider returned {status}"))),
        }
    }
}
