//! services/api/src/adapters/catalog.rs
//!
//! This module contains the adapter for the media catalog, i.e. the media
//! server's item API. It implements the `MediaCatalog` port from the `core` crate.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use share_link_core::domain::CatalogItem;
use share_link_core::ports::{MediaCatalog, PortError, PortResult};
use tracing::{debug, error};

use crate::casefold;
use crate::config::CatalogSettings;

/// The header the media server reads its access token from.
pub const MEDIA_TOKEN_HEADER: &str = "X-Emby-Token";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct MediaServerCatalog {
    client: Client,
    settings: CatalogSettings,
}

impl MediaServerCatalog {
    pub fn new(client: Client, settings: CatalogSettings) -> Self {
        Self { client, settings }
    }

    fn items(&self) -> RequestBuilder {
        let request = self.client.get(format!("{}/Items", self.settings.base_url));
        match &self.settings.api_key {
            Some(key) => request.header(MEDIA_TOKEN_HEADER, key),
            None => request,
        }
    }

    async fn query(&self, subject: &str, request: RequestBuilder) -> PortResult<Vec<ItemWire>> {
        let response = request.send().await.map_err(|e| {
            error!(subject, error = %e, "Media catalog unreachable");
            PortError::BackendUnreachable(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PortError::ItemNotFound(subject.to_string()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(subject, status = status.as_u16(), detail = %detail, "Media catalog rejected query");
            return Err(PortError::BackendRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let bytes = response.bytes().await.map_err(|e| PortError::BackendUnreachable(e.to_string()))?;
        let page: ItemPageWire = casefold::from_slice(&bytes).map_err(|e| {
            error!(subject, error = %e, "Malformed media catalog response");
            PortError::DecodeFailure(e.to_string())
        })?;
        Ok(page.items)
    }
}

//=========================================================================================
// Wire Records (folded keys, see `casefold`)
//=========================================================================================

#[derive(Deserialize)]
struct ItemPageWire {
    #[serde(default)]
    items: Vec<ItemWire>,
}

#[derive(Deserialize)]
struct ItemWire {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(rename = "indexnumber", default)]
    index_number: Option<i32>,
    #[serde(rename = "locationtype", default)]
    location_type: Option<String>,
}

impl ItemWire {
    fn is_virtual(&self) -> bool {
        self.location_type
            .as_deref()
            .is_some_and(|location| location.eq_ignore_ascii_case("virtual"))
    }

    fn to_domain(self) -> CatalogItem {
        CatalogItem {
            id: self.id,
            name: self.name,
            item_type: self.item_type,
            index_number: self.index_number,
        }
    }
}

//=========================================================================================
// `MediaCatalog` Trait Implementation
//=========================================================================================

#[async_trait]
impl MediaCatalog for MediaServerCatalog {
    async fn get_item(&self, item_id: &str) -> PortResult<CatalogItem> {
        let request = self.items().query(&[("Ids", item_id)]);
        self.query(item_id, request)
            .await?
            .into_iter()
            .next()
            .map(ItemWire::to_domain)
            .ok_or_else(|| PortError::ItemNotFound(item_id.to_string()))
    }

    async fn list_children(&self, parent_id: &str) -> PortResult<Vec<CatalogItem>> {
        let request = self.items().query(&[
            ("ParentId", parent_id),
            ("Recursive", "false"),
            ("IsMissing", "false"),
        ]);
        let items = self.query(parent_id, request).await?;
        let total = items.len();
        let children: Vec<CatalogItem> = items
            .into_iter()
            .filter(|item| !item.is_virtual())
            .map(ItemWire::to_domain)
            .collect();
        debug!(parent_id, total, kept = children.len(), "Listed catalog children");
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer, api_key: Option<&str>) -> MediaServerCatalog {
        MediaServerCatalog::new(
            Client::new(),
            CatalogSettings {
                base_url: server.uri(),
                api_key: api_key.map(str::to_string),
            },
        )
    }

    #[tokio::test]
    async fn get_item_returns_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Items"))
            .and(query_param("Ids", "abc"))
            .and(header(MEDIA_TOKEN_HEADER, "token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [{ "Id": "abc", "Name": "Season 1", "Type": "Season", "IndexNumber": 1 }],
                "TotalRecordCount": 1
            })))
            .mount(&server)
            .await;

        let item = catalog(&server, Some("token")).get_item("abc").await.unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.name, "Season 1");
        assert_eq!(item.item_type, "Season");
        assert_eq!(item.index_number, Some(1));
    }

    #[tokio::test]
    async fn get_item_miss_is_item_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Items": [] })))
            .mount(&server)
            .await;

        assert_eq!(
            catalog(&server, None).get_item("nope").await,
            Err(PortError::ItemNotFound("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn list_children_drops_virtual_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Items"))
            .and(query_param("ParentId", "season"))
            .and(query_param("Recursive", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [
                    { "Id": "e1", "Name": "One", "IndexNumber": 1, "LocationType": "FileSystem" },
                    { "Id": "e2", "Name": "Two", "IndexNumber": 2, "LocationType": "Virtual" },
                    { "Id": "e3", "Name": "Three" }
                ]
            })))
            .mount(&server)
            .await;

        let children = catalog(&server, None).list_children("season").await.unwrap();
        let ids: Vec<_> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["e1", "e3"]);
        assert_eq!(children[1].index_number, None);
    }

    #[tokio::test]
    async fn server_errors_are_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("starting up"))
            .mount(&server)
            .await;

        let err = catalog(&server, None).list_children("season").await.unwrap_err();
        assert_eq!(
            err,
            PortError::BackendRejected {
                status: 503,
                detail: "starting up".to_string()
            }
        );
    }
}
