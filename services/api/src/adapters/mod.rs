pub mod backend;
pub mod catalog;

pub use backend::HttpShareBackend;
pub use catalog::MediaServerCatalog;

use std::time::Duration;

/// Builds the one HTTP client shared by every outbound adapter.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .timeout(timeout)
        .user_agent(concat!("share-link-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
}
