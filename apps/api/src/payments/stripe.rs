use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentProcessor, ProcessorSubscription};

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

/// Stripe REST client. Authenticates with the secret key via basic auth.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: &str, timeout: Duration) -> Result<Self, PaymentError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

/// Turns a non-2xx response into `PaymentError::Api`, keeping Stripe's message when present.
async fn check_status(response: Response) -> Result<Response, PaymentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or(body);

    Err(PaymentError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn retrieve_subscription(&self, id: &str) -> Result<ProcessorSubscription, PaymentError> {
        debug!(subscription_id = %id, "Retrieving Stripe subscription");

        let response = self
            .client
            .get(self.url(&format!("/v1/subscriptions/{id}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut form = vec![
            ("mode", "subscription"),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
            ("line_items[0][price]", request.price_id),
            ("line_items[0][quantity]", "1"),
            ("client_reference_id", request.user_id),
            ("metadata[userId]", request.user_id),
        ];
        if let Some(email) = request.customer_email {
            form.push(("customer_email", email));
        }

        let response = self
            .client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}
