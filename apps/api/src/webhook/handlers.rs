use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::errors::WebhookError;
use crate::payments::signature::SignatureError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/stripe/webhook
///
/// Takes the body as raw bytes; the signature covers the exact bytes sent.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let signature = match headers.get(SIGNATURE_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| {
                    tracing::warn!("Stripe-Signature header is not valid ASCII");
                    SignatureError::MalformedHeader
                })?,
        ),
        None => None,
    };

    state.projector.handle(&body, signature).await?;
    Ok(Json(json!({ "received": true })))
}
