use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bazaar_api::{app, AppState, AuthConfig, Wiring};
use bazaar_store::app_config::Config;
use bazaar_store::{
    DbClient, PgAddressRepository, PgOrderRepository, PgProductRepository, RazorpayGateway,
    ShiprocketClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Bazaar API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let business_rules = db
        .fetch_business_rules(config.business_rules.clone())
        .await
        .context("Failed to load business rules")?;

    let gateway = RazorpayGateway::new(&config.payment).context("Failed to build payment client")?;
    let carrier = ShiprocketClient::new(&config.carrier).context("Failed to build carrier client")?;
    if !config.carrier.is_configured() {
        tracing::warn!("Shipping carrier not configured; shipping charges will quote zero");
    }
    if config.payment.test_mode {
        tracing::warn!("Payment test mode is enabled");
    }

    let state = AppState::new(
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        Wiring {
            orders: Arc::new(PgOrderRepository::new(db.pool.clone())),
            products: Arc::new(PgProductRepository::new(db.pool.clone())),
            addresses: Arc::new(PgAddressRepository::new(db.pool.clone())),
            gateway: Arc::new(gateway),
            carrier: Arc::new(carrier),
            currency: config.payment.currency.clone(),
            test_mode: config.payment.test_mode,
            business_rules,
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
