pub mod error;
pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use stepper_core::dispatcher::Dispatcher;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    let app_state = state::AppState::new(dispatcher);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Discovery
        .route("/api/update", post(routes::discovery::update))
        .route("/api/actions", get(routes::discovery::list_actions))
        .route("/api/actions/{id}", get(routes::discovery::get_action))
        .route("/api/collections", get(routes::discovery::list_collections))
        // Control
        .route("/api/send", post(routes::control::send_action))
        .route("/api/reset", post(routes::control::reset))
        .route("/api/active", get(routes::control::active))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API on a pre-bound listener until `shutdown` resolves.
///
/// Taking a bound `TcpListener` lets the caller read the actual port first
/// (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on<F>(
    listener: tokio::net::TcpListener,
    dispatcher: Arc<Dispatcher>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = listener.local_addr()?.port();
    let app = build_router(dispatcher);

    tracing::info!("stepper API listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
