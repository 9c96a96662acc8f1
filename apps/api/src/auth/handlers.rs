use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use serde::Deserialize;

use super::{AuthSession, AuthUser, CurrentUser, OAuthProvider, SignUpOutcome};
use crate::errors::AppError;
use crate::state::AppState;
use crate::store::{StoreError, SubscriptionStore};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email address is required".to_string()));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Copies an identity-provider account into `users`, the parent table of
/// `subscriptions.user_id`.
pub async fn mirror_account(
    store: &dyn SubscriptionStore,
    user: &AuthUser,
) -> Result<(), StoreError> {
    store
        .ensure_user(&user.id, user.email.as_deref().unwrap_or_default())
        .await
}

/// Sign-in and sign-up already succeeded upstream; a failed mirror is retried
/// by the next checkout.
async fn mirror_account_or_warn(state: &AppState, user: &AuthUser) {
    if let Err(e) = mirror_account(state.store.as_ref(), user).await {
        tracing::warn!(user_id = %user.id, error = %e, "Could not mirror user account");
    }
}

/// POST /auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<AuthSession>, AppError> {
    req.validate()?;
    let session = state
        .sessions
        .sign_in_with_password(req.email.trim(), &req.password)
        .await?;
    mirror_account_or_warn(&state, &session.user).await;
    Ok(Json(session))
}

/// POST /auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<SignUpOutcome>, AppError> {
    req.validate()?;
    let outcome = state.sessions.sign_up(req.email.trim(), &req.password).await?;
    tracing::info!(user_id = %outcome.user.id, "User signed up");
    mirror_account_or_warn(&state, &outcome.user).await;
    Ok(Json(outcome))
}

/// POST /auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, AppError> {
    state.sessions.sign_out(&current.access_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/oauth/:provider
pub async fn handle_oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Redirect, AppError> {
    let provider: OAuthProvider = provider.parse().map_err(AppError::Validation)?;
    let redirect_to = format!("{}/dashboard", state.config.app_url.trim_end_matches('/'));
    let url = state.sessions.authorize_url(provider, &redirect_to)?;
    Ok(Redirect::to(&url))
}
