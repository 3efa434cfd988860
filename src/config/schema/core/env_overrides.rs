use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(super) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(key) = non_empty("CHARACHAT_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.api.api_key = Some(key);
        }

        if let Some(base_url) = non_empty("CHARACHAT_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Some(model) = non_empty("CHARACHAT_MODEL") {
            self.api.model = model;
        }

        if let Some(data_dir) = non_empty("CHARACHAT_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Some(temp) = non_empty("CHARACHAT_TEMPERATURE")
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|temp| (0.0..=2.0).contains(temp))
        {
            self.api.temperature = temp;
        }
    }
}
