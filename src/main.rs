//! Matrix Quick Order - variant grid draft order entry

use anyhow::Result;
use matrix_quick_order::api::{router, AppState};
use matrix_quick_order::backend::ShopifyAdminClient;
use matrix_quick_order::config::Settings;
use matrix_quick_order::session::spawn_idle_sweep;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let settings = Settings::from_env()?;

    let backend = ShopifyAdminClient::new(&settings.shopify);
    let nats = match &settings.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };
    let state = AppState { nats, recent_order_limit: settings.recent_order_limit, ..AppState::new(Arc::new(backend)) };
    spawn_idle_sweep(state.sessions.clone(), chrono::Duration::minutes(settings.session_idle_minutes), std::time::Duration::from_secs(60));

    tracing::info!(shop = %settings.shopify.shop, "🚀 Matrix Quick Order listening on 0.0.0.0:{}", settings.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?, router(state)).await?;
    Ok(())
}
