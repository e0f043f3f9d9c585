pub mod api;
pub mod app_state;
pub mod catalog;
pub mod claim;
pub mod clock;
pub mod config;
pub mod gate;

use axum::Router;
use axum::body::Body;
use axum::extract::Extension;
use axum::http::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span};

//
// Re-export
//
pub use api::{DeliveryError, deliver, get_token, log_request_errors, root, stream};
pub use app_state::AppState;
pub use catalog::{
    SharedRegistry, StaticCatalog, VideoDescriptor, VideoEntry, VideoKind, VideoRegistry,
};
pub use claim::{
    AccessToken, Claims, IssueError, KeyMaterial, SigningKey, TokenError, TokenIssuer,
    TokenValidator,
};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::Config;
pub use gate::{
    Access, AccessGate, Authorized, ExemptionPolicy, ExemptionRule, ExemptionScope, GateError,
    PathPattern, access_gate,
};

/// Build the public application
///
/// Every route, the static tree included, sits behind the access gate.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Spans carry the path only, the query may hold a token
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        info_span!("request", method = %req.method(), path = %req.uri().path())
    });

    let static_files = ServeDir::new(state.static_dir());

    Router::new()
        .route("/", get(root))
        .route("/get-token", get(get_token))
        .route("/stream", get(stream))
        .nest_service("/static", static_files)
        .layer(from_fn_with_state(state.gate.clone(), access_gate))
        .layer(from_fn(log_request_errors))
        .layer(Extension(state))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(trace)
        .layer(cors)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    run_with_clock(config, Arc::new(SystemClock)).await
}

/// Serve until ctrl-c, reading time from `clock`
pub async fn run_with_clock(config: Config, clock: SharedClock) -> anyhow::Result<()> {
    let state = AppState::new(&config, clock)?;
    let app = router(state, config.request_timeout());

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Video gate listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Video gate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
