use std::time::Duration;

use anyhow::{Context, Result};

use crate::payments::signature::DEFAULT_TOLERANCE_SECS;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    /// Price id of the paid ("Pro") plan.
    pub stripe_price_id: String,
    pub stripe_api_base: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Public origin of the frontend, used for redirect URLs.
    pub app_url: String,
    pub webhook_tolerance_secs: i64,
    pub downstream_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            stripe_secret_key: require_env("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
            stripe_price_id: require_env("STRIPE_PRICE_ID")?,
            stripe_api_base: optional_env("STRIPE_API_BASE", "https://api.stripe.com"),
            supabase_url: require_env("SUPABASE_URL")?,
            supabase_anon_key: require_env("SUPABASE_ANON_KEY")?,
            app_url: optional_env("APP_URL", "http://localhost:3000"),
            webhook_tolerance_secs: match std::env::var("WEBHOOK_TOLERANCE_SECS") {
                Ok(v) => v
                    .parse::<i64>()
                    .context("WEBHOOK_TOLERANCE_SECS must be an integer")?,
                Err(_) => DEFAULT_TOLERANCE_SECS,
            },
            downstream_timeout: Duration::from_secs(
                optional_env("DOWNSTREAM_TIMEOUT_SECS", "5")
                    .parse::<u64>()
                    .context("DOWNSTREAM_TIMEOUT_SECS must be a positive integer")?,
            ),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/starter_test".to_string(),
        stripe_secret_key: "sk_test_123".to_string(),
        stripe_webhook_secret: "whsec_test_secret".to_string(),
        stripe_price_id: "price_pro".to_string(),
        stripe_api_base: "http://127.0.0.1:9".to_string(),
        supabase_url: "http://127.0.0.1:9".to_string(),
        supabase_anon_key: "anon_test_key".to_string(),
        app_url: "http://localhost:3000".to_string(),
        webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        downstream_timeout: Duration::from_secs(5),
        port: 8080,
        rust_log: "debug".to_string(),
    }
}
