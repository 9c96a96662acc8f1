//! Payment processor boundary.
//!
//! Everything that talks to Stripe goes through `PaymentProcessor`. The
//! production implementation is `StripeClient`; the webhook projector and the
//! checkout handler only ever see the trait object held in `AppState`.

#[cfg(test)]
pub mod fake;
pub mod signature;
pub mod stripe;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use stripe::StripeClient;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Subscription {id} is malformed: {reason}")]
    Malformed { id: String, reason: &'static str },

    #[error("Stripe request timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// A Stripe subscription object, as returned by the API and embedded in
/// `customer.subscription.*` events. Only the fields we project are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
    /// Newer API versions report the billing period per item.
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

impl ProcessorSubscription {
    /// Price of the first line item.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    /// Period end in epoch seconds, falling back to the first item's period.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_end))
    }
}

/// Parameters for starting a subscription checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub price_id: &'a str,
    pub user_id: &'a str,
    pub customer_email: Option<&'a str>,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// `GET /v1/subscriptions/:id`
    async fn retrieve_subscription(&self, id: &str) -> Result<ProcessorSubscription, PaymentError>;

    /// `POST /v1/checkout/sessions` in subscription mode.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, PaymentError>;
}
