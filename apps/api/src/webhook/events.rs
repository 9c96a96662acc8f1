//! Stripe event envelope parsing.
//!
//! Only the three event kinds we project are decoded into typed payloads;
//! every other kind is carried as `WebhookEvent::Other` and acknowledged.

use serde::Deserialize;
use serde_json::Value;

use crate::payments::ProcessorSubscription;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Value,
}

/// A field Stripe may return either as an id or as the expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub subscription: Option<Expandable>,
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
}

impl CheckoutSessionObject {
    /// `(user_id, subscription_id)` when both are present and non-empty.
    pub fn projection_ids(&self) -> Option<(&str, &str)> {
        let user_id = self
            .metadata
            .as_ref()
            .and_then(|m| m.user_id.as_deref())
            .filter(|id| !id.is_empty())?;
        let subscription_id = self
            .subscription
            .as_ref()
            .map(Expandable::id)
            .filter(|id| !id.is_empty())?;
        Some((user_id, subscription_id))
    }
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutSessionObject),
    SubscriptionUpdated(ProcessorSubscription),
    SubscriptionDeleted(ProcessorSubscription),
    Other(String),
}

impl WebhookEvent {
    pub fn kind(&self) -> &str {
        match self {
            WebhookEvent::CheckoutCompleted(_) => CHECKOUT_COMPLETED,
            WebhookEvent::SubscriptionUpdated(_) => SUBSCRIPTION_UPDATED,
            WebhookEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            WebhookEvent::Other(kind) => kind,
        }
    }

    /// The Stripe subscription this event concerns, for log correlation.
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            WebhookEvent::CheckoutCompleted(session) => session
                .subscription
                .as_ref()
                .map(Expandable::id)
                .filter(|id| !id.is_empty()),
            WebhookEvent::SubscriptionUpdated(sub) | WebhookEvent::SubscriptionDeleted(sub) => {
                Some(sub.id.as_str())
            }
            WebhookEvent::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Stripe event id (`evt_...`), used for log correlation only.
    pub id: String,
    pub event: WebhookEvent,
}

/// Decodes a verified request body into a typed event.
pub fn parse_event(body: &[u8]) -> Result<EventEnvelope, serde_json::Error> {
    let raw: RawEvent = serde_json::from_slice(body)?;

    let event = match raw.kind.as_str() {
        CHECKOUT_COMPLETED => WebhookEvent::CheckoutCompleted(serde_json::from_value(raw.data.object)?),
        SUBSCRIPTION_UPDATED => WebhookEvent::SubscriptionUpdated(serde_json::from_value(raw.data.object)?),
        SUBSCRIPTION_DELETED => WebhookEvent::SubscriptionDeleted(serde_json::from_value(raw.data.object)?),
        _ => WebhookEvent::Other(raw.kind),
    };

    Ok(EventEnvelope {
        id: raw.id.unwrap_or_default(),
        event,
    })
}
