//! Larkspur backend - shop API server.
//!
//! # Architecture
//!
//! - Axum web framework serving a small JSON API
//! - Catalog cache populated by an external feed generator, refreshed
//!   monthly
//! - Tinkoff Init API for payment initiation
//! - SMTP (lettre) for order notifications
//! - Streamed zip export of the generated site files
//!
//! Startup gates on the first feed generation by default: a shop front
//! with no catalog is not worth booting. `FEED_BLOCK_ON_BOOTSTRAP=false`
//! runs the first generation in the background instead.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use larkspur_backend::catalog::{CatalogRefresher, schedule};
use larkspur_backend::config::AppConfig;
use larkspur_backend::routes;
use larkspur_backend::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "larkspur_backend=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Build application state
    let state = AppState::new(config.clone()).expect("Failed to initialize application state");

    let refresher = Arc::new(CatalogRefresher::from_config(
        &config.feed,
        state.catalog().clone(),
    ));

    // First feed generation: gate startup on it, or run it in the background.
    if config.feed.block_on_bootstrap {
        if let Err(error) = refresher.regenerate().await {
            tracing::error!(error = %error, "initial catalog generation failed");
            std::process::exit(1);
        }
        tracing::info!("catalog cache ready");
    } else {
        let bootstrap = Arc::clone(&refresher);
        tokio::spawn(async move {
            if let Err(error) = bootstrap.regenerate().await {
                tracing::error!(error = %error, "background catalog generation failed");
            }
        });
    }

    // Monthly refresh; failures leave the previous snapshot in place.
    schedule::spawn_monthly_refresh(Arc::clone(&refresher));

    // Build router
    let app = routes::routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
