use super::super::{
    ApiConfig, ComplianceConfig, DisplayConfig, LoggingConfig, ResponseConfig, RewriterConfig,
    SimilarityConfig, StorageConfig,
};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub response: ResponseConfig,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default)]
    pub rewriter: RewriterConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub compliance: ComplianceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

pub(super) fn charachat_home() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".charachat")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: charachat_home().join("config.toml"),
            api: ApiConfig::default(),
            response: ResponseConfig::default(),
            similarity: SimilarityConfig::default(),
            rewriter: RewriterConfig::default(),
            display: DisplayConfig::default(),
            compliance: ComplianceConfig::default(),
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}
