use crate::config::Config;
use crate::pipeline::ComplianceStats;

pub fn render_stats(stats: &ComplianceStats) -> String {
    let last = stats
        .last_violation_time
        .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());

    [
        "◆ Compliance".to_string(),
        String::new(),
        format!("  Length       {}", stats.length_violations),
        format!("  Sentence     {}", stats.sentence_violations),
        format!("  Format       {}", stats.format_violations),
        format!("  Keyword      {}", stats.keyword_violations),
        format!("  Repetition   {}", stats.repetition_violations),
        format!("  Total        {}", stats.total_violations),
        String::new(),
        format!("  Prompt strength  {}/5", stats.prompt_strength_level),
        format!("  Last violation   {last}"),
    ]
    .join("\n")
}

pub fn render_config_summary(config: &Config) -> String {
    [
        format!("  Config   {}", config.config_path.display()),
        format!("  Data     {}", config.storage.resolved_data_dir().display()),
        format!("  Endpoint {}", config.api.base_url),
        format!("  Model    {}", config.api.model),
        format!(
            "  API key  {}",
            if config.api.api_key.is_some() {
                "set"
            } else {
                "missing"
            }
        ),
    ]
    .join("\n")
}
