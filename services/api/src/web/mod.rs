pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::{require_configured, resolve_identity, UserIdentity};
pub use rest::{
    config_handler, create_batch_handler, create_share_handler, list_shares_handler,
    revoke_share_handler, share_analytics_handler,
};

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use middleware::USER_ID_HEADERS;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Builds the share API router, mounted under `/plugins/share`.
///
/// `config` is always reachable; every other route is gated on the backend
/// being configured.
pub fn router(app_state: Arc<AppState>) -> Router {
    let guarded_routes = Router::new()
        .route("/create", post(create_share_handler))
        .route("/list", get(list_shares_handler))
        .route("/revoke/{share_id}", post(revoke_share_handler))
        .route("/analytics/{share_id}", get(share_analytics_handler))
        .route("/batch", post(create_batch_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_configured,
        ));

    let share_routes = Router::new()
        .route("/config", get(config_handler))
        .merge(guarded_routes)
        .layer(axum_middleware::from_fn(resolve_identity));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/plugins/share", share_routes)
        .with_state(app_state)
}

/// CORS for browser callers; every identity header must pass the preflight.
pub fn cors_layer() -> CorsLayer {
    let mut headers = vec![CONTENT_TYPE];
    headers.extend(USER_ID_HEADERS.iter().copied().map(HeaderName::from_static));
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(headers)
}
