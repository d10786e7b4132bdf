//! Best-effort notifications: delivery confirmations and low-stock
//! alerts.
//!
//! Dispatch runs detached from the request path. Channel failures are
//! logged and swallowed; nothing here can fail the operation that
//! triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    transport::smtp::authentication::Credentials,
};
use pomelo_core::{OrderId, ProductId};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;

use crate::config::{SmsConfig, SmtpConfig};

/// Errors that can occur while delivering a notification. Always
/// logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build the email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// A recipient address failed to parse.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// HTTP request to the SMS gateway failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SMS gateway returned an error response.
    #[error("SMS gateway error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Events the dispatcher knows how to announce.
#[derive(Debug, Clone)]
pub enum Notification {
    /// An order was handed to the carrier.
    OrderDelivered {
        order_id: OrderId,
        /// Customer email from the order's shipping address.
        email: String,
    },
    /// A product dropped to or below the restock threshold.
    LowStock {
        product_id: ProductId,
        name: String,
        stock: i32,
    },
}

impl Notification {
    fn subject(&self) -> String {
        match self {
            Self::OrderDelivered { order_id, .. } => {
                format!("Your Pomelo Market order #{order_id} was delivered")
            }
            Self::LowStock { name, .. } => format!("Low stock alert: {name}"),
        }
    }

    fn body(&self) -> String {
        match self {
            Self::OrderDelivered { order_id, .. } => format!(
                "Good news - order #{order_id} has been delivered. \
                 Thanks for shopping with Pomelo Market!"
            ),
            Self::LowStock {
                product_id,
                name,
                stock,
            } => format!(
                "Product {product_id} ({name}) is down to {stock} unit(s). Time to restock."
            ),
        }
    }
}

/// One delivery channel (email, SMS, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &'static str;

    /// Deliver one notification.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Fans notifications out to every configured channel from a detached
/// task.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    /// Build a dispatcher over the given channels. An empty channel
    /// list is valid; dispatch becomes a no-op.
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Fire-and-forget delivery on every channel.
    ///
    /// Returns the spawned task's handle so tests can await
    /// completion; production callers drop it.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let channels = self.channels.clone();
        tokio::spawn(async move {
            for channel in &channels {
                if let Err(e) = channel.deliver(&notification).await {
                    tracing::warn!(
                        channel = channel.name(),
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
        })
    }
}

// =============================================================================
// Email channel (SMTP via lettre)
// =============================================================================

/// Sends notifications over SMTP.
///
/// Customer-facing events go to the event's recipient; operational
/// alerts (low stock) go to the configured alert address.
pub struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    alert_address: String,
}

impl EmailChannel {
    /// Create an email channel from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            alert_address: config.alert_address.clone(),
        })
    }

    fn recipient<'a>(&'a self, notification: &'a Notification) -> &'a str {
        match notification {
            Notification::OrderDelivered { email, .. } => email,
            Notification::LowStock { .. } => &self.alert_address,
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let to = self.recipient(notification);
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidRecipient(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidRecipient(to.to_owned()))?)
            .subject(notification.subject())
            .body(notification.body())?;

        self.mailer.send(email).await?;
        tracing::info!(to = %to, "notification email sent");
        Ok(())
    }
}

// =============================================================================
// SMS channel (HTTP gateway)
// =============================================================================

/// Sends notifications through an HTTP SMS gateway.
pub struct SmsChannel {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    alert_number: String,
}

impl SmsChannel {
    /// Create an SMS channel from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &SmsConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            alert_number: config.alert_number.clone(),
        })
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        // All SMS traffic goes to the operator alert number; customer
        // phone numbers are only used for shipping.
        let body = serde_json::json!({
            "to": self.alert_number,
            "body": notification.body(),
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        delivered: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl NotificationChannel for CountingChannel {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn deliver(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotifyError::Api {
                    status: 500,
                    message: "boom".to_owned(),
                });
            }
            Ok(())
        }
    }

    fn low_stock() -> Notification {
        Notification::LowStock {
            product_id: ProductId::new(1),
            name: "Tee".to_owned(),
            stock: 2,
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_every_channel() {
        let a = Arc::new(CountingChannel {
            delivered: AtomicUsize::new(0),
            fail: false,
        });
        let b = Arc::new(CountingChannel {
            delivered: AtomicUsize::new(0),
            fail: false,
        });
        let dispatcher =
            NotificationDispatcher::new(vec![a.clone() as Arc<dyn NotificationChannel>, b.clone()]);

        dispatcher.dispatch(low_stock()).await.expect("join");

        assert_eq!(a.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(b.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_channel_does_not_stop_the_rest() {
        let failing = Arc::new(CountingChannel {
            delivered: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(CountingChannel {
            delivered: AtomicUsize::new(0),
            fail: false,
        });
        let dispatcher = NotificationDispatcher::new(vec![
            failing.clone() as Arc<dyn NotificationChannel>,
            healthy.clone(),
        ]);

        dispatcher.dispatch(low_stock()).await.expect("join");

        assert_eq!(failing.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_dispatcher_is_a_no_op() {
        let dispatcher = NotificationDispatcher::default();
        dispatcher.dispatch(low_stock()).await.expect("join");
    }
}
