use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use widget_api::handlers::{health, public, stats, submissions, ttl, utils, widgets};
use widget_api::health::Monitors;
use widget_api::middleware::{
    auth_middleware, rate_limit_middleware, request_validation_middleware,
    security_headers_middleware, PayloadLimitLayer,
};
use widget_api::{AppConfig, AppState};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.tracing_filter())),
        )
        .json()
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server_port,
        "starting widget-api"
    );

    let port = config.server_port;
    // TimeoutLayer models a single deadline for the whole request/response
    // cycle, not separate read/write phases, so SERVER_READ_TIMEOUT and
    // SERVER_WRITE_TIMEOUT are honored together as one deadline long enough
    // to cover both.
    let request_timeout = Duration::from_secs(
        config
            .server_read_timeout_secs
            .max(config.server_write_timeout_secs),
    );

    let state = AppState::new(config).await?;
    tracing::info!(redis_up = state.redis_up(), "initial health probe complete");

    let monitors = Monitors::spawn(state.clone());

    let public_routes = Router::new()
        .route("/widgets/:widget_id/submit", post(public::submit))
        .route("/widgets/:widget_id/events", post(public::record_event))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let owner_routes = Router::new()
        .route(
            "/api/v1/widgets",
            get(widgets::list_widgets).post(widgets::create_widget),
        )
        .route("/api/v1/widgets/summary", get(widgets::summarize_widgets))
        .route(
            "/api/v1/widgets/:widget_id",
            get(widgets::get_widget)
                .put(widgets::update_widget)
                .delete(widgets::delete_widget),
        )
        .route("/api/v1/widgets/:widget_id/stats", get(stats::get_stats))
        .route(
            "/api/v1/widgets/:widget_id/submissions",
            get(submissions::list_submissions),
        )
        .route(
            "/api/v1/widgets/:widget_id/export",
            get(submissions::export_submissions),
        )
        .route("/api/v1/users/:user_id/ttl", put(ttl::update_owner_plan))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(utils::metrics))
        .merge(public_routes)
        .merge(owner_routes)
        .fallback(utils::not_found)
        .with_state(state.clone())
        .layer(axum::middleware::from_fn(request_validation_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(PayloadLimitLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "widget-api ready to accept connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    monitors.shutdown(SHUTDOWN_GRACE_PERIOD).await;
    tracing::info!("widget-api shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received sigterm, shutting down"),
    }
}
