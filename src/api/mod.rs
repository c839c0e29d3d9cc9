use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::require_bearer;
use crate::AppState;

pub mod handlers;

/// Build the gateway router. Forwarding routes sit behind bearer auth and
/// are mounted under `base_path` (empty for the root).
pub fn router(state: Arc<AppState>, base_path: &str) -> Router {
    let forwarding = Router::new()
        .route("/generate", post(handlers::generate))
        .route("/chat", post(handlers::chat))
        .route("/embed", post(handlers::embed))
        .route("/tags", get(handlers::tags))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let app = Router::new().route("/healthz", get(|| async { "ok" }));
    let app = if base_path.is_empty() {
        app.merge(forwarding)
    } else {
        app.nest(base_path, forwarding)
    };

    app.with_state(state).layer(TraceLayer::new_for_http())
}
