//! boxoffice server entry point.
//!
//! Starts the Axum HTTP server over the Redis seat-lock store and the
//! PostgreSQL order ledger.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use boxoffice::api;
use boxoffice::app_state::AppState;
use boxoffice::clients::{HttpDiscountClient, HttpPaymentClient};
use boxoffice::config::EngineConfig;
use boxoffice::domain::EventBus;
use boxoffice::locking::RedisSeatLockStore;
use boxoffice::persistence::PostgresOrderStore;
use boxoffice::service::{OrderService, PaymentOrchestrator, WebhookVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = EngineConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting boxoffice");

    // Connect the order ledger and run pending migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Connect the seat-lock store
    let locks = Arc::new(
        RedisSeatLockStore::connect(&config.redis_url, config.seat_lock_ttl_secs).await?,
    );

    // External service clients
    let http = reqwest::Client::new();
    let discounts = Arc::new(HttpDiscountClient::new(
        http.clone(),
        config.discount_api_base.clone(),
        config.discount_api_token.clone(),
    ));
    let payments_client = Arc::new(HttpPaymentClient::new(
        http,
        config.payment_api_base.clone(),
        config.payment_api_key.clone(),
    ));

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let orders = Arc::new(OrderService::new(
        locks,
        Arc::new(PostgresOrderStore::new(pool)),
        discounts,
        event_bus.clone(),
    ));
    let payments = Arc::new(PaymentOrchestrator::new(
        Arc::clone(&orders),
        payments_client,
        WebhookVerifier::new(config.payment_webhook_secret.clone()),
        config.payment_currency.clone(),
    ));

    // Build application state
    let app_state = AppState {
        orders,
        payments,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
