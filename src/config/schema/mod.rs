mod api;
mod core;
mod observability;
mod pipeline;
mod storage;

pub use api::ApiConfig;
pub use core::Config;
pub use observability::LoggingConfig;
pub use pipeline::{
    ComplianceConfig, DisplayConfig, ResponseConfig, RewriterConfig, SimilarityConfig,
};
pub use storage::StorageConfig;
