pub mod schema;

pub use schema::{
    ApiConfig, ComplianceConfig, Config, DisplayConfig, LoggingConfig, ResponseConfig,
    RewriterConfig, SimilarityConfig, StorageConfig,
};
