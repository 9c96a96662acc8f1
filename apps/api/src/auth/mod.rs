//! Session Store boundary (Supabase Auth REST API).
//!
//! Identity and session lifecycle live entirely in the identity provider; this
//! client only forwards credentials and validates bearer tokens.

pub mod extractor;
pub mod handlers;

use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub use extractor::CurrentUser;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid or expired access token")]
    InvalidToken,

    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: AuthUser,
}

/// Sign-up returns a session immediately unless email confirmation is on.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(format!("Unsupported OAuth provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SessionClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, SessionError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SessionError> {
        let response = self
            .client
            .post(self.url("/token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SessionError> {
        let response = self
            .client
            .post(self.url("/signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: Value = check_status(response).await?.json().await?;
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body).map_err(|e| {
                SessionError::Rejected {
                    status: 502,
                    message: format!("Unexpected sign-up response: {e}"),
                }
            })?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user: AuthUser = serde_json::from_value(body).map_err(|e| SessionError::Rejected {
            status: 502,
            message: format!("Unexpected sign-up response: {e}"),
        })?;
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    /// Revokes the session behind `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.url("/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Resolves the user behind a bearer token. Used to guard protected routes.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, SessionError> {
        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!("Access token rejected by identity provider");
            return Err(SessionError::InvalidToken);
        }

        Ok(check_status(response).await?.json().await?)
    }

    /// URL the browser is sent to for OAuth sign-in.
    pub fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, SessionError> {
        let url = Url::parse_with_params(
            &self.url("/authorize"),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| SessionError::InvalidUrl(e.to_string()))?;
        Ok(url.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SessionError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// The auth API reports errors under several keys depending on the endpoint.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SessionClient {
        SessionClient::new(&server.uri(), "anon_key", Duration::from_secs(2)).unwrap()
    }

    fn session_json() -> Value {
        json!({
            "access_token": "jwt-abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-abc",
            "user": { "id": "u1", "email": "u1@example.com", "aud": "authenticated" }
        })
    }

    #[tokio::test]
    async fn test_sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon_key"))
            .and(body_json(json!({ "email": "u1@example.com", "password": "hunter22" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server)
            .sign_in_with_password("u1@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(session.access_token, "jwt-abc");
        assert_eq!(session.user.id, "u1");
    }

    #[tokio::test]
    async fn test_sign_in_rejection_keeps_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .sign_in_with_password("u1@example.com", "wrong")
            .await
            .unwrap_err();

        match err {
            SessionError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation_has_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u2",
                "email": "u2@example.com",
                "confirmation_sent_at": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .sign_up("u2@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(outcome.user.id, "u2");
        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_with_autoconfirm_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .sign_up("u1@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(outcome.user.id, "u1");
        assert_eq!(outcome.session.unwrap().refresh_token, "refresh-abc");
    }

    #[tokio::test]
    async fn test_get_user_with_expired_token_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_user("stale").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidToken));
    }

    #[tokio::test]
    async fn test_sign_out_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).sign_out("jwt-abc").await.unwrap();
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let client =
            SessionClient::new("https://proj.supabase.co/", "anon", Duration::from_secs(1)).unwrap();
        let url = client
            .authorize_url(OAuthProvider::Github, "http://localhost:3000/dashboard")
            .unwrap();
        assert_eq!(
            url,
            "https://proj.supabase.co/auth/v1/authorize?provider=github&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fdashboard"
        );
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert!("myspace".parse::<OAuthProvider>().is_err());
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("upstream down"), "upstream down");
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#), "User already registered");
    }
}
