//! Scripted `PaymentProcessor` for projector and handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentProcessor, ProcessorSubscription};

#[derive(Default)]
pub struct FakeProcessor {
    subscriptions: Mutex<HashMap<String, ProcessorSubscription>>,
    checkouts: Mutex<Vec<(String, String)>>,
    lookups: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn add_subscription(&self, id: &str, status: &str, price_id: &str, period_end: i64) {
        let sub: ProcessorSubscription = serde_json::from_value(json!({
            "id": id,
            "status": status,
            "current_period_end": period_end,
            "items": { "data": [{ "price": { "id": price_id } }] }
        }))
        .unwrap();
        self.subscriptions.lock().unwrap().insert(id.to_string(), sub);
    }

    pub fn add_raw(&self, sub: ProcessorSubscription) {
        self.subscriptions.lock().unwrap().insert(sub.id.clone(), sub);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// `(price_id, user_id)` of every checkout session created.
    pub fn checkouts(&self) -> Vec<(String, String)> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn retrieve_subscription(&self, id: &str) -> Result<ProcessorSubscription, PaymentError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.subscriptions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::Api {
                status: 404,
                message: format!("No such subscription: '{id}'"),
            })
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, PaymentError> {
        self.checkouts
            .lock()
            .unwrap()
            .push((request.price_id.to_string(), request.user_id.to_string()));
        let id = format!("cs_test_{}", request.user_id);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{id}")),
            id,
        })
    }
}
