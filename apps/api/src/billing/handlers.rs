use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plans::{catalog, is_purchasable, Plan, TRIAL_NOTE};
use crate::auth::handlers::mirror_account;
use crate::auth::{AuthUser, CurrentUser};
use crate::errors::AppError;
use crate::models::subscription::SubscriptionRecord;
use crate::payments::CheckoutRequest;
use crate::state::AppState;

#[derive(Serialize)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
    pub note: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    /// Defaults to the Pro plan's price.
    #[serde(default)]
    pub price_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub user: AuthUser,
    pub member_since: Option<DateTime<Utc>>,
    pub subscription: Option<SubscriptionRecord>,
}

/// GET /api/plans
pub async fn handle_list_plans(State(state): State<AppState>) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: catalog(&state.config.stripe_price_id),
        note: TRIAL_NOTE,
    })
}

/// POST /api/stripe/create-checkout-session
///
/// The checkout is attributed to the authenticated user; the webhook reads
/// that id back from `metadata.userId`. The user's `users` row is written
/// first so the webhook's upsert has a parent row to reference.
pub async fn handle_create_checkout_session(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, AppError> {
    let price_id = req
        .price_id
        .unwrap_or_else(|| state.config.stripe_price_id.clone());
    if !is_purchasable(&catalog(&state.config.stripe_price_id), &price_id) {
        return Err(AppError::Validation(format!(
            "Price '{price_id}' is not available for checkout"
        )));
    }

    mirror_account(state.store.as_ref(), &current.user).await?;

    let app_url = state.config.app_url.trim_end_matches('/');
    let success_url = format!("{app_url}/dashboard?checkout=success");
    let cancel_url = format!("{app_url}/pricing");

    let session = state
        .processor
        .create_checkout_session(&CheckoutRequest {
            price_id: &price_id,
            user_id: &current.user.id,
            customer_email: current.user.email.as_deref(),
            success_url: &success_url,
            cancel_url: &cancel_url,
        })
        .await?;

    tracing::info!(
        user_id = %current.user.id,
        checkout_session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(CreateCheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// GET /api/me/subscription
pub async fn handle_my_subscription(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let subscription = state
        .store
        .find_subscription_for_user(&current.user.id)
        .await?;
    let account = state.store.find_user(&current.user.id).await?;

    Ok(Json(DashboardResponse {
        user: current.user,
        member_since: account.map(|a| a.created_at),
        subscription,
    }))
}
