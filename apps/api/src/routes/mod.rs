pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::billing::handlers as billing;
use crate::state::AppState;
use crate::webhook::handlers as webhook;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stripe
        .route("/api/stripe/webhook", post(webhook::handle_stripe_webhook))
        .route(
            "/api/stripe/create-checkout-session",
            post(billing::handle_create_checkout_session),
        )
        // Pricing + dashboard
        .route("/api/plans", get(billing::handle_list_plans))
        .route("/api/me/subscription", get(billing::handle_my_subscription))
        // Auth (proxied to the identity provider)
        .route("/auth/sign-in", post(auth::handle_sign_in))
        .route("/auth/sign-up", post(auth::handle_sign_up))
        .route("/auth/sign-out", post(auth::handle_sign_out))
        .route("/auth/oauth/:provider", get(auth::handle_oauth_redirect))
        .with_state(state)
}
