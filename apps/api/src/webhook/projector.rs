//! Projects verified Stripe events onto the `subscriptions` table.
//!
//! Each call handles one delivery: verify, decode, then at most one upsert or
//! one conditional update. No internal retries; a transient failure is
//! returned as a 5xx so Stripe redelivers, and the upsert keyed on the
//! subscription id makes redelivery safe.
//!
//! Ordering: updates for the same subscription are last-write-wins. If Stripe
//! delivers two `customer.subscription.updated` events out of order the row
//! keeps whichever write landed last.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::errors::WebhookError;
use crate::models::subscription::{from_epoch_seconds, NewSubscription};
use crate::payments::signature::{verify_signature, SignatureError};
use crate::payments::{PaymentError, PaymentProcessor, ProcessorSubscription};
use crate::store::{StoreError, SubscriptionStore};
use crate::webhook::events::{parse_event, CheckoutSessionObject, WebhookEvent};

/// What a delivery did to the store. Every variant is acknowledged with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Upserted { subscription_id: String },
    Updated { subscription_id: String },
    /// Update for a subscription we never recorded.
    NoMatchingRow { subscription_id: String },
    /// Checkout without `metadata.userId` or without a subscription.
    MissingCheckoutIds,
    Ignored { kind: String },
}

pub struct Projector {
    processor: Arc<dyn PaymentProcessor>,
    store: Arc<dyn SubscriptionStore>,
    webhook_secret: String,
    tolerance_secs: i64,
    call_timeout: Duration,
}

impl Projector {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        store: Arc<dyn SubscriptionStore>,
        webhook_secret: String,
        tolerance_secs: i64,
        call_timeout: Duration,
    ) -> Self {
        Self {
            processor,
            store,
            webhook_secret,
            tolerance_secs,
            call_timeout,
        }
    }

    /// Handles one delivery. `body` must be the raw bytes as received.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Projection, WebhookError> {
        self.handle_at(body, signature, Utc::now().timestamp()).await
    }

    /// Same as [`Projector::handle`] with an explicit clock (unix seconds).
    pub async fn handle_at(
        &self,
        body: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<Projection, WebhookError> {
        let verified = signature
            .ok_or(SignatureError::MissingHeader)
            .and_then(|header| {
                verify_signature(body, header, &self.webhook_secret, self.tolerance_secs, now)
            });
        if let Err(e) = verified {
            warn!(error = %e, "Webhook signature verification failed");
            return Err(e.into());
        }

        let envelope = parse_event(body).map_err(|e| {
            warn!(error = %e, "Verified webhook body is not a valid event");
            WebhookError::MalformedEvent(e.to_string())
        })?;
        let event_id = envelope.id.as_str();
        let event_kind = envelope.event.kind().to_string();
        let subscription_id = envelope.event.subscription_id().map(str::to_string);

        let result = match envelope.event {
            WebhookEvent::CheckoutCompleted(session) => self.project_checkout(&session).await,
            WebhookEvent::SubscriptionUpdated(sub) | WebhookEvent::SubscriptionDeleted(sub) => {
                self.project_state_change(&sub).await
            }
            WebhookEvent::Other(kind) => Ok(Projection::Ignored { kind }),
        };

        match &result {
            Ok(projection) => {
                info!(event_id, event_kind = %event_kind, ?projection, "Webhook handled");
            }
            Err(e) => {
                error!(
                    event_id,
                    event_kind = %event_kind,
                    subscription_id = subscription_id.as_deref(),
                    error = %e,
                    "Webhook handler failed"
                );
            }
        }
        result
    }

    async fn project_checkout(
        &self,
        session: &CheckoutSessionObject,
    ) -> Result<Projection, WebhookError> {
        let Some((user_id, subscription_id)) = session.projection_ids() else {
            warn!(
                checkout_session_id = %session.id,
                "Checkout completed without userId metadata or subscription; skipping"
            );
            return Ok(Projection::MissingCheckoutIds);
        };

        let subscription = self.lookup(subscription_id).await?;

        let price_id = subscription.price_id().ok_or_else(|| PaymentError::Malformed {
            id: subscription.id.clone(),
            reason: "no line items",
        })?;
        let current_period_end = subscription
            .period_end()
            .and_then(from_epoch_seconds)
            .ok_or_else(|| PaymentError::Malformed {
                id: subscription.id.clone(),
                reason: "missing or invalid current_period_end",
            })?;

        let record = NewSubscription {
            id: subscription.id.clone(),
            user_id: user_id.to_string(),
            status: subscription.status.clone(),
            price_id: price_id.to_string(),
            current_period_end,
        };
        self.write(self.store.upsert_subscription(&record)).await?;

        Ok(Projection::Upserted {
            subscription_id: record.id,
        })
    }

    async fn project_state_change(
        &self,
        subscription: &ProcessorSubscription,
    ) -> Result<Projection, WebhookError> {
        let current_period_end = subscription
            .period_end()
            .and_then(from_epoch_seconds)
            .ok_or_else(|| {
                WebhookError::MalformedEvent(format!(
                    "subscription {} has no valid current_period_end",
                    subscription.id
                ))
            })?;

        let matched = self
            .write(self.store.update_subscription_state(
                &subscription.id,
                &subscription.status,
                current_period_end,
            ))
            .await?;

        let subscription_id = subscription.id.clone();
        if matched {
            Ok(Projection::Updated { subscription_id })
        } else {
            info!(subscription_id = %subscription_id, "No subscription row to update");
            Ok(Projection::NoMatchingRow { subscription_id })
        }
    }

    async fn lookup(&self, id: &str) -> Result<ProcessorSubscription, WebhookError> {
        match tokio::time::timeout(self.call_timeout, self.processor.retrieve_subscription(id)).await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(PaymentError::TimedOut(self.call_timeout).into()),
        }
    }

    async fn write<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, WebhookError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::TimedOut(self.call_timeout).into()),
        }
    }
}
