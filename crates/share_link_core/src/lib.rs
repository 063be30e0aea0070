pub mod batch;
pub mod domain;
pub mod policy;
pub mod ports;

pub use batch::BatchOrchestrator;
pub use domain::{
    BatchItemResult, BatchReport, CatalogItem, CreatedShare, DailyViews, ShareAnalytics,
    ShareCreateRequest, ShareListing, ShareRecord,
};
pub use policy::{EffectivePolicy, PolicyOverrides, ShareDefaults};
pub use ports::{MediaCatalog, PortError, PortResult, ShareBackend};
