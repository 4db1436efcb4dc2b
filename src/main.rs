use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_leads_dashboard::api_client::DashboardApiClient;
use rust_leads_dashboard::config::Config;
use rust_leads_dashboard::dashboard::Dashboard;
use rust_leads_dashboard::handlers::{self, AppState};
use rust_leads_dashboard::session::SessionStore;

/// Main entry point for the application.
///
/// Initializes tracing and configuration, builds the backend client and the
/// dashboard state, performs the initial fetch and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_leads_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let session = SessionStore::file(config.session_file.clone());
    let client = DashboardApiClient::new(
        config.api_base_url.clone(),
        session,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    tracing::info!("✓ Backend client initialized: {}", client.base_url());

    let dashboard = Dashboard::new(client);

    // The page stays in its loading state until a fetch succeeds.
    if let Err(e) = dashboard.refresh().await {
        tracing::error!("Initial dashboard fetch failed: {}", e);
    }

    let app_state = Arc::new(AppState {
        config: config.clone(),
        dashboard,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", axum::routing::get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
