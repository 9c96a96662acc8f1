use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::SessionError;
use crate::payments::signature::SignatureError;
use crate::payments::PaymentError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Identity provider error: {0}")]
    Identity(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Rejected { status, message } if status == 400 || status == 422 => {
                AppError::Validation(message)
            }
            SessionError::Rejected { status: 401 | 403, .. } | SessionError::InvalidToken => {
                AppError::Unauthorized
            }
            other => AppError::Identity(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Payment(e) => {
                tracing::error!("Payment provider error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PAYMENT_PROVIDER_ERROR",
                    "The payment provider request failed".to_string(),
                )
            }
            AppError::Identity(msg) => {
                tracing::error!("Identity provider error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "IDENTITY_PROVIDER_ERROR",
                    "The identity provider request failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Failures of the Stripe webhook endpoint.
///
/// 4xx variants are permanent: Stripe should not redeliver the same body.
/// 5xx variants are transient and rely on Stripe's retry with backoff.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(#[from] SignatureError),

    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),

    #[error("Subscription lookup failed: {0}")]
    Lookup(#[from] PaymentError),

    #[error("Subscription write failed: {0}")]
    DownstreamWrite(#[from] StoreError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::SignatureVerification(_) | WebhookError::MalformedEvent(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Lookup(_) | WebhookError::DownstreamWrite(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            "Webhook handler failed".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_errors_are_client_errors() {
        let err = WebhookError::from(SignatureError::Mismatch);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("No signatures found matching"));
    }

    #[test]
    fn test_downstream_errors_are_server_errors() {
        let write = WebhookError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        let lookup = WebhookError::from(PaymentError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(write.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(lookup.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_session_rejections_map_to_client_statuses() {
        let bad_login = AppError::from(SessionError::Rejected {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert!(matches!(bad_login, AppError::Validation(ref m) if m == "Invalid login credentials"));

        let expired = AppError::from(SessionError::Rejected {
            status: 401,
            message: "JWT expired".to_string(),
        });
        assert!(matches!(expired, AppError::Unauthorized));

        let outage = AppError::from(SessionError::Rejected {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert!(matches!(outage, AppError::Identity(_)));
    }

    #[test]
    fn test_app_error_statuses() {
        let cases = [
            (AppError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::Store(StoreError::UnknownUser("u9".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Payment(PaymentError::TimedOut(std::time::Duration::from_secs(5))),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::Identity("down".to_string()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
