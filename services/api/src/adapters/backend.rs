//! services/api/src/adapters/backend.rs
//!
//! This module contains the adapter for the remote share backend.
//! It implements the `ShareBackend` port from the `core` crate on top of `reqwest`.
//!
//! Every operation converts transport, status and decode problems into a
//! `PortError`; nothing from `reqwest` escapes this module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use share_link_core::domain::{
    public_url_for, CreatedShare, DailyViews, ShareAnalytics, ShareCreateRequest, ShareListing,
    ShareRecord,
};
use share_link_core::ports::{PortError, PortResult, ShareBackend};
use tracing::{error, info};

use crate::casefold;
use crate::config::BackendSettings;

/// The header the backend expects the API key in.
pub const BACKEND_KEY_HEADER: &str = "X-Backend-Key";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ShareBackend` port over HTTP.
#[derive(Clone)]
pub struct HttpShareBackend {
    client: Client,
    settings: BackendSettings,
}

impl HttpShareBackend {
    /// Creates a new `HttpShareBackend`.
    pub fn new(client: Client, settings: BackendSettings) -> Self {
        Self { client, settings }
    }

    fn shares_url(&self) -> String {
        format!("{}/api/admin/shares", self.settings.base_url)
    }

    /// `{base}/api/admin/shares/{share_id}/{action}` with the id percent-escaped.
    fn share_url(&self, share_id: &str, action: &str) -> PortResult<Url> {
        let mut url = Url::parse(&self.shares_url())
            .map_err(|e| PortError::BackendUnreachable(format!("invalid backend URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PortError::BackendUnreachable("backend URL cannot hold a path".to_string()))?
            .push(share_id)
            .push(action);
        Ok(url)
    }

    /// Fails fast, before any network I/O, when the URL or key is missing.
    fn ensure_configured(&self, operation: &'static str) -> PortResult<()> {
        if self.settings.is_configured() {
            Ok(())
        } else {
            error!(operation, "Share backend not configured");
            Err(PortError::NotConfigured)
        }
    }

    /// Attaches the API key and sends the request, mapping every failure mode.
    async fn send(
        &self,
        operation: &'static str,
        subject: &str,
        request: RequestBuilder,
    ) -> PortResult<Response> {
        let response = request
            .header(BACKEND_KEY_HEADER, &self.settings.api_key)
            .send()
            .await
            .map_err(|e| {
                error!(operation, subject, error = %e, "Share backend unreachable");
                PortError::BackendUnreachable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(
                operation,
                subject,
                status = status.as_u16(),
                detail = %detail,
                "Share backend rejected request"
            );
            return Err(PortError::BackendRejected {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response)
    }

    /// Reads the body and decodes it case-insensitively into `T`.
    async fn decode<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        subject: &str,
        response: Response,
    ) -> PortResult<T> {
        let bytes = response.bytes().await.map_err(|e| {
            error!(operation, subject, error = %e, "Failed to read share backend response");
            PortError::BackendUnreachable(e.to_string())
        })?;
        casefold::from_slice(&bytes).map_err(|e| {
            error!(operation, subject, error = %e, "Malformed share backend response");
            PortError::DecodeFailure(e.to_string())
        })
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

/// Outbound create body, in the backend's camelCase.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateShareBody<'a> {
    jellyfin_item_id: &'a str,
    jellyfin_user_id: &'a str,
    expires_in_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_total_plays: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_concurrent_viewers: Option<u32>,
}

impl<'a> From<&'a ShareCreateRequest> for CreateShareBody<'a> {
    fn from(request: &'a ShareCreateRequest) -> Self {
        Self {
            jellyfin_item_id: &request.source_item_id,
            jellyfin_user_id: &request.requesting_user_id,
            expires_in_minutes: request.expires_in_minutes,
            password: request.password.as_deref(),
            max_total_plays: request.max_total_plays,
            max_concurrent_viewers: request.max_concurrent_viewers,
        }
    }
}

// Inbound records use folded key names; see `casefold`.

#[derive(Deserialize)]
struct CreatedShareWire {
    #[serde(rename = "shareid", default)]
    share_id: String,
    #[serde(rename = "publicurl", default)]
    public_url: Option<String>,
    token: String,
    #[serde(rename = "expiresat", default, deserialize_with = "casefold::optional_timestamp")]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ShareRecordWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "shareid", default)]
    legacy_id: Option<String>,
    #[serde(rename = "publictoken")]
    public_token: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "itemtype", default)]
    item_type: String,
    #[serde(rename = "totalplays", default)]
    total_plays: u64,
    #[serde(rename = "currentconcurrentviewers", default)]
    current_concurrent_viewers: u64,
    #[serde(rename = "maxtotalplays", default)]
    max_total_plays: Option<u64>,
    #[serde(rename = "maxconcurrentviewers", default)]
    max_concurrent_viewers: Option<u64>,
    #[serde(rename = "expiresat", deserialize_with = "casefold::timestamp")]
    expires_at: DateTime<Utc>,
    #[serde(rename = "createdat", deserialize_with = "casefold::timestamp")]
    created_at: DateTime<Utc>,
    #[serde(rename = "revokedat", default, deserialize_with = "casefold::optional_timestamp")]
    revoked_at: Option<DateTime<Utc>>,
    #[serde(rename = "haspassword", default)]
    has_password: bool,
}

impl ShareRecordWire {
    /// Older backends send `shareId`, newer ones `id`; some send both.
    fn to_domain(self) -> Result<ShareRecord, String> {
        let share_id = [self.id, self.legacy_id]
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty())
            .ok_or_else(|| "share record without an id".to_string())?;
        if self.public_token.is_empty() {
            return Err(format!("share {} has an empty public token", share_id));
        }
        Ok(ShareRecord {
            share_id,
            public_token: self.public_token,
            title: self.title,
            item_type: self.item_type,
            total_plays: self.total_plays,
            current_concurrent_viewers: self.current_concurrent_viewers,
            max_total_plays: self.max_total_plays,
            max_concurrent_viewers: self.max_concurrent_viewers,
            expires_at: self.expires_at,
            created_at: self.created_at,
            revoked_at: self.revoked_at,
            has_password: self.has_password,
        })
    }
}

#[derive(Deserialize)]
struct ShareListingWire {
    #[serde(default)]
    shares: Vec<ShareRecordWire>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct DailyViewsWire {
    date: String,
    #[serde(default)]
    views: u64,
}

#[derive(Deserialize)]
struct AnalyticsWire {
    #[serde(rename = "totalviews", default)]
    total_views: u64,
    #[serde(rename = "uniqueviewers", default)]
    unique_viewers: u64,
    #[serde(rename = "avgwatchtimeseconds", default)]
    avg_watch_time_seconds: u64,
    #[serde(rename = "viewsbyday", default)]
    views_by_day: Vec<DailyViewsWire>,
}

//=========================================================================================
// `ShareBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl ShareBackend for HttpShareBackend {
    async fn create_share(&self, request: &ShareCreateRequest) -> PortResult<CreatedShare> {
        const OP: &str = "create_share";
        self.ensure_configured(OP)?;
        let item_id = request.source_item_id.as_str();

        let http = self
            .client
            .post(self.shares_url())
            .json(&CreateShareBody::from(request));
        let response = self.send(OP, item_id, http).await?;
        let wire: CreatedShareWire = Self::decode(OP, item_id, response).await?;
        if wire.share_id.is_empty() || wire.token.is_empty() {
            error!(operation = OP, subject = item_id, "Created share lacks an id or token");
            return Err(PortError::DecodeFailure(
                "created share lacks an id or token".to_string(),
            ));
        }

        let public_url = match wire.public_url {
            Some(url) if !url.is_empty() => url,
            _ => public_url_for(&self.settings.base_url, &wire.token),
        };
        info!(item_id, share_id = %wire.share_id, "Share created");
        Ok(CreatedShare {
            share_id: wire.share_id,
            public_url,
            token: wire.token,
            expires_at: wire.expires_at,
        })
    }

    async fn list_shares(&self, user_id: &str) -> PortResult<ShareListing> {
        const OP: &str = "list_shares";
        self.ensure_configured(OP)?;

        let http = self
            .client
            .get(self.shares_url())
            .query(&[("jellyfinUserId", user_id)]);
        let response = self.send(OP, user_id, http).await?;
        let wire: ShareListingWire = Self::decode(OP, user_id, response).await?;

        let shares = wire
            .shares
            .into_iter()
            .map(ShareRecordWire::to_domain)
            .collect::<Result<Vec<ShareRecord>, String>>()
            .map_err(|e| {
                error!(operation = OP, subject = user_id, error = %e, "Malformed share record");
                PortError::DecodeFailure(e)
            })?;
        let total = wire.total.unwrap_or(shares.len() as u64);
        Ok(ShareListing { shares, total })
    }

    async fn revoke_share(&self, share_id: &str) -> bool {
        const OP: &str = "revoke_share";
        if self.ensure_configured(OP).is_err() {
            return false;
        }

        let url = match self.share_url(share_id, "revoke") {
            Ok(url) => url,
            Err(e) => {
                error!(operation = OP, share_id, error = %e, "Cannot build revoke URL");
                return false;
            }
        };
        match self.send(OP, share_id, self.client.post(url)).await {
            Ok(_) => {
                info!(share_id, "Share revoked");
                true
            }
            Err(_) => false,
        }
    }

    async fn get_analytics(&self, share_id: &str) -> PortResult<ShareAnalytics> {
        const OP: &str = "get_analytics";
        self.ensure_configured(OP)?;

        let http = self.client.get(self.share_url(share_id, "analytics")?);
        let response = self.send(OP, share_id, http).await?;
        let wire: AnalyticsWire = Self::decode(OP, share_id, response).await?;

        Ok(ShareAnalytics {
            total_views: wire.total_views,
            unique_viewers: wire.unique_viewers,
            avg_watch_time_seconds: wire.avg_watch_time_seconds,
            views_by_day: wire
                .views_by_day
                .into_iter()
                .map(|day| DailyViews {
                    date: day.date,
                    views: day.views,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(base_url: &str, api_key: &str) -> HttpShareBackend {
        HttpShareBackend::new(Client::new(), BackendSettings::new(base_url, api_key))
    }

    fn request() -> ShareCreateRequest {
        ShareCreateRequest {
            source_item_id: "abc".to_string(),
            requesting_user_id: "user-1".to_string(),
            expires_in_minutes: 60,
            password: None,
            max_total_plays: Some(3),
            max_concurrent_viewers: None,
        }
    }

    #[tokio::test]
    async fn create_share_sends_key_header_and_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares"))
            .and(header(BACKEND_KEY_HEADER, "secret"))
            .and(body_json(json!({
                "jellyfinItemId": "abc",
                "jellyfinUserId": "user-1",
                "expiresInMinutes": 60,
                "maxTotalPlays": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shareId": "s1",
                "publicUrl": "https://share.example/s/tok",
                "token": "tok",
                "expiresAt": "2030-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = backend(&server.uri(), "secret")
            .create_share(&request())
            .await
            .expect("create share");
        assert_eq!(created.share_id, "s1");
        assert_eq!(created.public_url, "https://share.example/s/tok");
        assert_eq!(created.token, "tok");
        assert!(created.expires_at.is_some());
    }

    #[tokio::test]
    async fn create_share_derives_url_when_backend_omits_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "SHAREID": "s1",
                "TOKEN": "tok"
            })))
            .mount(&server)
            .await;

        let created = backend(&server.uri(), "secret")
            .create_share(&request())
            .await
            .expect("create share");
        assert_eq!(created.share_id, "s1");
        assert_eq!(created.public_url, format!("{}/s/tok", server.uri()));
    }

    #[tokio::test]
    async fn create_share_captures_rejection_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(422).set_body_string("item not shareable"))
            .mount(&server)
            .await;

        let err = backend(&server.uri(), "secret")
            .create_share(&request())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PortError::BackendRejected {
                status: 422,
                detail: "item not shareable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn create_share_reports_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend(&server.uri(), "secret")
            .create_share(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::DecodeFailure(_)));
        assert!(err.is_operational());
    }

    #[tokio::test]
    async fn create_share_without_token_is_a_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = backend(&server.uri(), "secret")
            .create_share(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn create_share_with_empty_id_is_a_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shareId": "",
                "token": "tok"
            })))
            .mount(&server)
            .await;

        let err = backend(&server.uri(), "secret")
            .create_share(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_typed_failure() {
        // Nothing listens on port 9 of localhost.
        let err = backend("http://127.0.0.1:9", "secret")
            .create_share(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::BackendUnreachable(_)));
    }

    #[tokio::test]
    async fn unconfigured_backend_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = backend(&server.uri(), "");
        assert_eq!(client.create_share(&request()).await, Err(PortError::NotConfigured));
        assert_eq!(client.list_shares("u").await, Err(PortError::NotConfigured));
        assert!(!client.revoke_share("s1").await);
        assert_eq!(client.get_analytics("s1").await, Err(PortError::NotConfigured));
    }

    #[tokio::test]
    async fn list_shares_decodes_pascal_case_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/shares"))
            .and(query_param("jellyfinUserId", "user 1&2"))
            .and(header(BACKEND_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Shares": [{
                    "Id": "s1",
                    "PublicToken": "tok",
                    "Title": "Pilot",
                    "ItemType": "Episode",
                    "TotalPlays": 4,
                    "CurrentConcurrentViewers": 1,
                    "MaxTotalPlays": 10,
                    "MaxConcurrentViewers": null,
                    "ExpiresAt": "2030-01-01T00:00:00Z",
                    "CreatedAt": "2024-01-01T00:00:00",
                    "RevokedAt": null,
                    "HasPassword": true
                }],
                "Total": 1
            })))
            .mount(&server)
            .await;

        let listing = backend(&server.uri(), "secret")
            .list_shares("user 1&2")
            .await
            .expect("list shares");
        assert_eq!(listing.total, 1);
        let share = &listing.shares[0];
        assert_eq!(share.share_id, "s1");
        assert_eq!(share.public_token, "tok");
        assert_eq!(share.title, "Pilot");
        assert_eq!(share.item_type, "Episode");
        assert_eq!(share.total_plays, 4);
        assert_eq!(share.current_concurrent_viewers, 1);
        assert_eq!(share.max_total_plays, Some(10));
        assert_eq!(share.max_concurrent_viewers, None);
        assert_eq!(share.expires_at, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(share.created_at, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(share.revoked_at, None);
        assert!(share.has_password);
    }

    #[tokio::test]
    async fn list_shares_accepts_records_with_both_id_spellings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shares": [
                    {
                        "id": "s1",
                        "shareId": "s1",
                        "publicToken": "tok1",
                        "expiresAt": "2030-01-01T00:00:00Z",
                        "createdAt": "2024-01-01T00:00:00Z"
                    },
                    {
                        "id": "",
                        "ShareId": "s2",
                        "publicToken": "tok2",
                        "expiresAt": "2030-01-01T00:00:00Z",
                        "createdAt": "2024-01-01T00:00:00Z"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let listing = backend(&server.uri(), "secret")
            .list_shares("u")
            .await
            .expect("list shares");
        let ids: Vec<_> = listing.shares.iter().map(|s| s.share_id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);
        assert_eq!(listing.total, 2);
    }

    #[tokio::test]
    async fn list_shares_rejects_record_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shares": [{
                    "publicToken": "tok",
                    "expiresAt": "2030-01-01T00:00:00Z",
                    "createdAt": "2024-01-01T00:00:00Z"
                }]
            })))
            .mount(&server)
            .await;

        let err = backend(&server.uri(), "secret").list_shares("u").await.unwrap_err();
        assert!(matches!(err, PortError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn revoke_share_returns_false_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares/missing/revoke"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such share"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(!backend(&server.uri(), "secret").revoke_share("missing").await);
    }

    #[tokio::test]
    async fn revoke_share_returns_true_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/shares/s1/revoke"))
            .and(header(BACKEND_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(backend(&server.uri(), "secret").revoke_share("s1").await);
    }

    #[tokio::test]
    async fn analytics_are_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/shares/s1/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_views": 12,
                "unique_viewers": 5,
                "avg_watch_time_seconds": 300,
                "views_by_day": [{ "date": "2024-05-01", "views": 7 }]
            })))
            .mount(&server)
            .await;

        let analytics = backend(&server.uri(), "secret")
            .get_analytics("s1")
            .await
            .expect("analytics");
        assert_eq!(analytics.total_views, 12);
        assert_eq!(analytics.unique_viewers, 5);
        assert_eq!(analytics.avg_watch_time_seconds, 300);
        assert_eq!(
            analytics.views_by_day,
            vec![DailyViews {
                date: "2024-05-01".to_string(),
                views: 7
            }]
        );
    }

    #[test]
    fn share_ids_are_escaped_in_paths() {
        let client = backend("https://share.example/", "secret");
        let url = client.share_url("a/b c", "revoke").unwrap();
        assert_eq!(url.as_str(), "https://share.example/api/admin/shares/a%2Fb%20c/revoke");
    }
}
