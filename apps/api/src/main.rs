mod auth;
mod billing;
mod config;
mod db;
mod errors;
mod models;
mod payments;
mod routes;
mod state;
mod store;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::SessionClient;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::payments::StripeClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgSubscriptionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting starter API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.downstream_timeout).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgSubscriptionStore::new(db));

    // Initialize Stripe client
    let stripe = StripeClient::new(
        &config.stripe_api_base,
        &config.stripe_secret_key,
        config.downstream_timeout,
    )?;
    info!("Stripe client initialized ({})", config.stripe_api_base);

    // Initialize identity provider client
    let sessions = SessionClient::new(
        &config.supabase_url,
        &config.supabase_anon_key,
        config.downstream_timeout,
    )?;
    info!("Session client initialized");

    let state = AppState::new(config.clone(), store, Arc::new(stripe), sessions);

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins to APP_URL once the frontend domain is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
