use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "error" | "warn" | "info" | "debug" | "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    /// Parsed level; unknown names fall back to `INFO`.
    pub fn max_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }
}
