use std::sync::Arc;

use axum::extract::State;
use axum::Extension;
use axum::Json;

use crate::errors::AppError;
use crate::middleware::auth::Principal;
use crate::models::llm::{ChatRequest, EmbedRequest, GenerateRequest, IntoPayload};
use crate::proxy::forward::Forwarded;
use crate::AppState;

async fn relay<R: IntoPayload>(
    state: &AppState,
    principal: &Principal,
    endpoint: &str,
    request: R,
) -> Result<Forwarded, AppError> {
    let (payload, stream) = request
        .into_payload()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    tracing::debug!(
        user = principal.user.as_deref().unwrap_or("<unknown>"),
        endpoint,
        stream,
        "forwarding request"
    );

    state.engine.forward(endpoint, &payload, stream).await
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<GenerateRequest>,
) -> Result<Forwarded, AppError> {
    relay(&state, &principal, "/api/generate", request).await
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<ChatRequest>,
) -> Result<Forwarded, AppError> {
    relay(&state, &principal, "/api/chat", request).await
}

pub async fn embed(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<EmbedRequest>,
) -> Result<Forwarded, AppError> {
    relay(&state, &principal, "/api/embed", request).await
}

pub async fn tags(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Forwarded, AppError> {
    tracing::debug!(
        user = principal.user.as_deref().unwrap_or("<unknown>"),
        "tags request"
    );
    state.engine.forward_get("/api/tags").await
}
