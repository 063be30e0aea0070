//! services/api/src/web/middleware.rs
//!
//! Request middleware: caller identity and the "is the backend configured" gate.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::web::state::AppState;

/// Headers an upstream authenticator may carry the user id in, in priority order.
pub const USER_ID_HEADERS: [&str; 2] = ["x-user-id", "x-emby-userid"];

/// The identity used when the request carries none.
pub const UNKNOWN_USER: &str = "unknown";

/// The opaque id of the user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity(pub String);

/// Middleware that extracts the caller's identity and inserts it into the
/// request extensions.
///
/// Authentication already happened upstream and the backend performs all
/// authorization, so a missing identity falls back to `"unknown"` rather than
/// rejecting the request.
pub async fn resolve_identity(mut req: Request, next: Next) -> Response {
    let user_id = USER_ID_HEADERS
        .iter()
        .find_map(|name| {
            req.headers()
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string);

    let identity = match user_id {
        Some(user_id) => UserIdentity(user_id),
        None => {
            debug!(path = %req.uri().path(), "No user identity on request, using fallback");
            UserIdentity(UNKNOWN_USER.to_string())
        }
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Middleware that rejects the request with the single NotConfigured error
/// unless the backend URL and API key are both set. Runs before any handler,
/// so no catalog or backend call is attempted.
pub async fn require_configured(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if !state.config.is_configured() {
        warn!(path = %req.uri().path(), "Rejecting request, share backend not configured");
        return GatewayError::NotConfigured.into_response();
    }
    next.run(req).await
}
