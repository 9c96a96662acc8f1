use std::sync::Arc;

use crate::auth::SessionClient;
use crate::config::Config;
use crate::payments::PaymentProcessor;
use crate::store::SubscriptionStore;
use crate::webhook::Projector;

/// Shared application state injected into all route handlers via Axum extractors.
/// Collaborators are built once in `main` and passed in explicitly.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SubscriptionStore>,
    /// Stripe in production; swapped for a scripted fake in tests.
    pub processor: Arc<dyn PaymentProcessor>,
    pub sessions: SessionClient,
    pub projector: Arc<Projector>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SubscriptionStore>,
        processor: Arc<dyn PaymentProcessor>,
        sessions: SessionClient,
    ) -> Self {
        let projector = Arc::new(Projector::new(
            processor.clone(),
            store.clone(),
            config.stripe_webhook_secret.clone(),
            config.webhook_tolerance_secs,
            config.downstream_timeout,
        ));

        Self {
            config,
            store,
            processor,
            sessions,
            projector,
        }
    }
}
