//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the share REST API and the master
//! definition for the OpenAPI specification.

use crate::error::{ErrorEnvelope, GatewayError};
use crate::web::middleware::UserIdentity;
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use share_link_core::domain::{BatchItemResult, ShareAnalytics, ShareRecord};
use share_link_core::policy::{self, PolicyOverrides};
use share_link_core::ports::PortError;
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_share_handler,
        config_handler,
        list_shares_handler,
        revoke_share_handler,
        share_analytics_handler,
        create_batch_handler,
    ),
    components(
        schemas(
            CreateShareApiRequest,
            CreateBatchShareRequest,
            ShareCreatedResponse,
            ConfigResponse,
            ShareView,
            ListSharesResponse,
            RevokeResponse,
            AnalyticsResponse,
            DailyViewsResponse,
            BatchShareResult,
            BatchShareResponse,
            ErrorEnvelope,
        )
    ),
    tags(
        (name = "Share Gateway API", description = "Create, list and revoke public share links for media items.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request Payloads
//=========================================================================================

/// Body of `POST /create`. Only `itemId` is required.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareApiRequest {
    pub item_id: String,
    pub expires_in_minutes: Option<i64>,
    pub password: Option<String>,
    pub max_total_plays: Option<u32>,
    pub max_concurrent_viewers: Option<u32>,
}

/// Body of `POST /batch`: one policy applied to every child of `parentItemId`.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchShareRequest {
    pub parent_item_id: String,
    pub expires_in_minutes: Option<i64>,
    pub password: Option<String>,
    pub max_total_plays: Option<u32>,
    pub max_concurrent_viewers: Option<u32>,
}

//=========================================================================================
// API Response Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareCreatedResponse {
    pub share_id: String,
    pub public_url: String,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// What a client needs to decide whether to offer sharing at all.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub configured: bool,
    pub default_expiry_minutes: u32,
    pub default_max_plays: u32,
    pub default_max_concurrent_viewers: u32,
    pub backend_url: String,
}

/// A listed share, enriched with its public URL and derived status flags.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: String,
    pub public_token: String,
    pub title: String,
    pub item_type: String,
    pub total_plays: u64,
    pub current_concurrent_viewers: u64,
    pub max_total_plays: Option<u64>,
    pub max_concurrent_viewers: Option<u64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub has_password: bool,
    pub public_url: String,
    pub is_expired: bool,
    pub is_revoked: bool,
}

impl ShareView {
    fn from_record(record: ShareRecord, backend_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            public_url: record.public_url(backend_url),
            is_expired: record.is_expired(now),
            is_revoked: record.is_revoked(),
            id: record.share_id,
            public_token: record.public_token,
            title: record.title,
            item_type: record.item_type,
            total_plays: record.total_plays,
            current_concurrent_viewers: record.current_concurrent_viewers,
            max_total_plays: record.max_total_plays,
            max_concurrent_viewers: record.max_concurrent_viewers,
            expires_at: record.expires_at,
            created_at: record.created_at,
            revoked_at: record.revoked_at,
            has_password: record.has_password,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSharesResponse {
    pub shares: Vec<ShareView>,
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct RevokeResponse {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct DailyViewsResponse {
    pub date: String,
    pub views: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_views: u64,
    pub unique_viewers: u64,
    pub avg_watch_time_seconds: u64,
    pub views_by_day: Vec<DailyViewsResponse>,
}

impl From<ShareAnalytics> for AnalyticsResponse {
    fn from(analytics: ShareAnalytics) -> Self {
        Self {
            total_views: analytics.total_views,
            unique_viewers: analytics.unique_viewers,
            avg_watch_time_seconds: analytics.avg_watch_time_seconds,
            views_by_day: analytics
                .views_by_day
                .into_iter()
                .map(|day| DailyViewsResponse {
                    date: day.date,
                    views: day.views,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchShareResult {
    pub item_id: String,
    pub item_name: String,
    pub index_number: Option<i32>,
    pub success: bool,
    pub public_url: Option<String>,
    pub token: Option<String>,
    pub error: Option<String>,
}

impl From<BatchItemResult> for BatchShareResult {
    fn from(result: BatchItemResult) -> Self {
        Self {
            item_id: result.item_id,
            item_name: result.item_name,
            index_number: result.index_number,
            success: result.success,
            public_url: result.public_url,
            token: result.token,
            error: result.error,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchShareResponse {
    pub results: Vec<BatchShareResult>,
    pub success_count: usize,
    pub fail_count: usize,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Unwraps a JSON body, reporting malformed input as a 400 envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))
}

/// Item ids are GUIDs; they are forwarded in their 32-hex-digit form.
fn parse_item_id(raw: &str) -> Result<String, GatewayError> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.simple().to_string())
        .map_err(|_| GatewayError::BadRequest(format!("Invalid item id: '{}'", raw)))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a share link for a single media item.
#[utoipa::path(
    post,
    path = "/plugins/share/create",
    request_body = CreateShareApiRequest,
    responses(
        (status = 200, description = "Share created", body = ShareCreatedResponse),
        (status = 400, description = "Invalid or unknown item, or plugin not configured", body = ErrorEnvelope),
        (status = 500, description = "Share backend failed", body = ErrorEnvelope)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "The id of the requesting user.")
    )
)]
pub async fn create_share_handler(
    State(state): State<Arc<AppState>>,
    Extension(UserIdentity(user_id)): Extension<UserIdentity>,
    payload: Result<Json<CreateShareApiRequest>, JsonRejection>,
) -> Result<Json<ShareCreatedResponse>, GatewayError> {
    let request = json_body(payload)?;
    let item_id = parse_item_id(&request.item_id)?;

    // Don't pay for a backend round-trip on an item that doesn't exist.
    state
        .catalog
        .get_item(&item_id)
        .await
        .map_err(|e| GatewayError::from_port("Failed to look up item", e))?;

    let overrides = PolicyOverrides {
        expires_in_minutes: request.expires_in_minutes,
        password: request.password,
        max_total_plays: request.max_total_plays,
        max_concurrent_viewers: request.max_concurrent_viewers,
    };
    let share_request =
        policy::resolve(&overrides, &state.config.defaults).to_request(&item_id, &user_id);

    let created = state
        .backend
        .create_share(&share_request)
        .await
        .map_err(|e| GatewayError::from_port("Failed to create share", e))?;

    info!(item_id = %item_id, url = %created.public_url, "Created share");
    Ok(Json(ShareCreatedResponse {
        share_id: created.share_id,
        public_url: created.public_url,
        token: created.token,
        expires_at: created.expires_at,
    }))
}

/// Report whether sharing is configured, plus the defaults a dialog should show.
#[utoipa::path(
    get,
    path = "/plugins/share/config",
    responses(
        (status = 200, description = "Current share configuration", body = ConfigResponse)
    )
)]
pub async fn config_handler(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let config = &state.config;
    Json(ConfigResponse {
        configured: config.is_configured(),
        default_expiry_minutes: config.defaults.expiry_minutes,
        default_max_plays: config.defaults.max_total_plays,
        default_max_concurrent_viewers: config.defaults.max_concurrent_viewers,
        backend_url: config.backend.base_url.clone(),
    })
}

/// List the requesting user's shares.
#[utoipa::path(
    get,
    path = "/plugins/share/list",
    responses(
        (status = 200, description = "The user's shares", body = ListSharesResponse),
        (status = 400, description = "Plugin not configured", body = ErrorEnvelope),
        (status = 500, description = "Share backend failed", body = ErrorEnvelope)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "The id of the requesting user.")
    )
)]
pub async fn list_shares_handler(
    State(state): State<Arc<AppState>>,
    Extension(UserIdentity(user_id)): Extension<UserIdentity>,
) -> Result<Json<ListSharesResponse>, GatewayError> {
    let listing = state
        .backend
        .list_shares(&user_id)
        .await
        .map_err(|e| GatewayError::from_port("Failed to get shares", e))?;

    let now = Utc::now();
    let backend_url = &state.config.backend.base_url;
    Ok(Json(ListSharesResponse {
        shares: listing
            .shares
            .into_iter()
            .map(|record| ShareView::from_record(record, backend_url, now))
            .collect(),
        total: listing.total,
    }))
}

/// Revoke a share.
#[utoipa::path(
    post,
    path = "/plugins/share/revoke/{share_id}",
    params(
        ("share_id" = String, Path, description = "The share to revoke.")
    ),
    responses(
        (status = 200, description = "Share revoked", body = RevokeResponse),
        (status = 400, description = "Plugin not configured", body = ErrorEnvelope),
        (status = 500, description = "Share backend failed", body = ErrorEnvelope)
    )
)]
pub async fn revoke_share_handler(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> Result<Json<RevokeResponse>, GatewayError> {
    if !state.backend.revoke_share(&share_id).await {
        return Err(GatewayError::Failed("Failed to revoke share"));
    }

    info!(share_id = %share_id, "Revoked share");
    Ok(Json(RevokeResponse {
        status: "revoked".to_string(),
    }))
}

/// Fetch viewing statistics for a share.
#[utoipa::path(
    get,
    path = "/plugins/share/analytics/{share_id}",
    params(
        ("share_id" = String, Path, description = "The share to report on.")
    ),
    responses(
        (status = 200, description = "Share analytics", body = AnalyticsResponse),
        (status = 400, description = "Plugin not configured", body = ErrorEnvelope),
        (status = 500, description = "Share backend failed", body = ErrorEnvelope)
    )
)]
pub async fn share_analytics_handler(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> Result<Json<AnalyticsResponse>, GatewayError> {
    let analytics = state
        .backend
        .get_analytics(&share_id)
        .await
        .map_err(|e| GatewayError::from_port("Failed to get analytics", e))?;
    Ok(Json(analytics.into()))
}

/// Create share links for every child of a container (e.g. all episodes of a season).
///
/// Individual failures are reported per item; the call itself still succeeds.
#[utoipa::path(
    post,
    path = "/plugins/share/batch",
    request_body = CreateBatchShareRequest,
    responses(
        (status = 200, description = "Per-item outcomes", body = BatchShareResponse),
        (status = 400, description = "Unknown parent, no children, or plugin not configured", body = ErrorEnvelope),
        (status = 500, description = "Media catalog failed", body = ErrorEnvelope),
        (status = 503, description = "Server shutting down", body = ErrorEnvelope)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "The id of the requesting user.")
    )
)]
pub async fn create_batch_handler(
    State(state): State<Arc<AppState>>,
    Extension(UserIdentity(user_id)): Extension<UserIdentity>,
    payload: Result<Json<CreateBatchShareRequest>, JsonRejection>,
) -> Result<Json<BatchShareResponse>, GatewayError> {
    let request = json_body(payload)?;
    let parent_id = parse_item_id(&request.parent_item_id)?;

    let parent = state.catalog.get_item(&parent_id).await.map_err(|e| match e {
        PortError::ItemNotFound(_) => GatewayError::BadRequest("Parent item not found".to_string()),
        other => GatewayError::from_port("Failed to look up parent item", other),
    })?;
    info!(parent_id = %parent_id, parent_name = %parent.name, "Batch share requested");

    let overrides = PolicyOverrides {
        expires_in_minutes: request.expires_in_minutes,
        password: request.password,
        max_total_plays: request.max_total_plays,
        max_concurrent_viewers: request.max_concurrent_viewers,
    };
    let report = state
        .batch
        .create_batch(&parent_id, &user_id, &overrides, &state.shutdown.child_token())
        .await
        .map_err(|e| GatewayError::from_port("Failed to list child items", e))?;

    Ok(Json(BatchShareResponse {
        success_count: report.success_count,
        fail_count: report.fail_count,
        results: report.results.into_iter().map(BatchShareResult::from).collect(),
    }))
}
