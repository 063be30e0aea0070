//! crates/share_link_core/src/ports.rs
//!
//! Defines the service contracts (traits) the share-link core depends on.
//! These traits form the boundary of the hexagonal architecture: the core never
//! talks HTTP itself, it only sees a share backend and a media catalog.

use async_trait::async_trait;

use crate::domain::{
    CatalogItem, CreatedShare, ShareAnalytics, ShareCreateRequest, ShareListing,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The failure taxonomy shared by every port operation.
/// Transport and decode errors from the outside world are folded into these
/// variants before they ever reach the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Share backend is not configured. Please configure the backend URL and API key.")]
    NotConfigured,
    #[error("Item not found: {0}")]
    ItemNotFound(String),
    #[error("Share backend unreachable: {0}")]
    BackendUnreachable(String),
    #[error("Share backend rejected the request ({status}): {detail}")]
    BackendRejected { status: u16, detail: String },
    #[error("Malformed response from share backend: {0}")]
    DecodeFailure(String),
    #[error("No child items found")]
    NoChildren,
    #[error("Request cancelled")]
    Cancelled,
}

impl PortError {
    /// True for faults of the remote backend rather than of the caller.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            PortError::BackendUnreachable(_)
                | PortError::BackendRejected { .. }
                | PortError::DecodeFailure(_)
        )
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ShareBackend: Send + Sync {
    /// Asks the backend to mint a new share.
    async fn create_share(&self, request: &ShareCreateRequest) -> PortResult<CreatedShare>;

    /// Lists every share created by the given user.
    async fn list_shares(&self, user_id: &str) -> PortResult<ShareListing>;

    /// Revokes a share. Any failure is logged and reported as `false`.
    async fn revoke_share(&self, share_id: &str) -> bool;

    async fn get_analytics(&self, share_id: &str) -> PortResult<ShareAnalytics>;
}

#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Looks up a single item, failing with `ItemNotFound` on a miss.
    async fn get_item(&self, item_id: &str) -> PortResult<CatalogItem>;

    /// Returns the direct, non-virtual children of a container item.
    async fn list_children(&self, parent_id: &str) -> PortResult<Vec<CatalogItem>>;
}
