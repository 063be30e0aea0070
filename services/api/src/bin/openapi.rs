//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3.0 document of the share gateway to disk.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use share_link_api::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("OpenAPI specification written to {}", path);
    Ok(())
}
