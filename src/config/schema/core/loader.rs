use super::Config;
use super::types::charachat_home;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let charachat_dir = charachat_home();
        if !charachat_dir.exists() {
            fs::create_dir_all(&charachat_dir)
                .context("Failed to create .charachat directory")?;
        }

        let mut config = Self::load_or_init_at(&charachat_dir.join("config.toml"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `config_path`, writing a default file first if it does not exist.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config
                .api
                .validate()
                .context("Invalid [api] section in config file")?;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
