//! Bearer-token authentication in front of the forwarding routes.
//!
//! The header is checked for shape before the store is consulted, so a
//! missing or non-Bearer credential never costs a database read. The token
//! value itself is never logged.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::errors::AppError;
use crate::store::TokenStore;
use crate::AppState;

/// The authenticated caller, attached to request extensions.
#[derive(Clone)]
pub struct Principal {
    pub token: String,
    /// Owner resolved for attribution; `None` if it vanished between the
    /// validate and resolve reads (concurrent revoke).
    pub user: Option<String>,
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn TokenStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Read-only: validates the presented token and resolves its owner.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AppError> {
        let token = extract_bearer_token(headers)?;

        if !self.store.validate(token).await? {
            tracing::warn!("rejected request: unknown bearer token");
            return Err(AppError::Unauthenticated);
        }

        let user = self.store.resolve_owner(token).await?;
        Ok(Principal {
            token: token.to_string(),
            user,
        })
    }
}

/// Pull the credential out of `Authorization: Bearer <token>`.
/// The scheme is matched case-insensitively; the token is not.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        tracing::debug!("rejected request: missing Authorization header");
        return Err(AppError::Unauthenticated);
    };

    let auth = value.to_str().map_err(|_| AppError::Unauthenticated)?;

    let (scheme, token) = auth.trim().split_once(' ').ok_or(AppError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(scheme, "rejected request: unsupported authorization scheme");
        return Err(AppError::Unauthenticated);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthenticated);
    }
    Ok(token)
}

/// Middleware: authenticate, then hand the `Principal` to the handler.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state.auth.authenticate(req.headers()).await?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
