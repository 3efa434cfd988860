use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plain-reply shaping rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
    /// Append a tone word / emoji from the character's voice style.
    #[serde(default = "default_true")]
    pub enhance: bool,
    #[serde(default = "default_tone_word_chance")]
    pub tone_word_chance: f64,
    #[serde(default = "default_emoji_chance")]
    pub emoji_chance: f64,
    /// Capacity of the recent-reply ring buffer used for duplicate detection.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_chars() -> usize {
    50
}

fn default_max_sentences() -> usize {
    2
}

fn default_tone_word_chance() -> f64 {
    0.7
}

fn default_emoji_chance() -> f64 {
    0.6
}

fn default_history_capacity() -> usize {
    10
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            max_sentences: default_max_sentences(),
            enhance: true,
            tone_word_chance: default_tone_word_chance(),
            emoji_chance: default_emoji_chance(),
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Candidates shorter than this (after preprocessing) are never compared.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// How many of the newest history entries are compared.
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_threshold() -> f64 {
    0.7
}

fn default_min_length() -> usize {
    10
}

fn default_window() -> usize {
    5
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_length: default_min_length(),
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriterConfig {
    /// 0.0 always picks among the common alternatives, 1.0 picks uniformly.
    #[serde(default = "default_randomness")]
    pub randomness: f64,
    #[serde(default = "default_common_alternatives")]
    pub common_alternatives: usize,
    /// History hits at which a category counts as overused.
    #[serde(default = "default_overuse_threshold")]
    pub overuse_threshold: usize,
}

fn default_randomness() -> f64 {
    0.5
}

fn default_common_alternatives() -> usize {
    3
}

fn default_overuse_threshold() -> usize {
    2
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            randomness: default_randomness(),
            common_alternatives: default_common_alternatives(),
            overuse_threshold: default_overuse_threshold(),
        }
    }
}

/// Timing of segment delivery. All values are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_typing_duration_ms")]
    pub typing_duration_ms: u64,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_random_delay_range_ms")]
    pub random_delay_range_ms: u64,
    #[serde(default = "default_retract_base_ms")]
    pub retract_base_ms: u64,
    #[serde(default = "default_retract_random_range_ms")]
    pub retract_random_range_ms: u64,
    /// Spacing between timestamps of segments parsed from one reply.
    #[serde(default = "default_timestamp_step_ms")]
    pub timestamp_step_ms: u64,
}

fn default_typing_duration_ms() -> u64 {
    1200
}

fn default_base_delay_ms() -> u64 {
    300
}

fn default_random_delay_range_ms() -> u64 {
    700
}

fn default_retract_base_ms() -> u64 {
    1000
}

fn default_retract_random_range_ms() -> u64 {
    1000
}

fn default_timestamp_step_ms() -> u64 {
    10
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            typing_duration_ms: default_typing_duration_ms(),
            base_delay_ms: default_base_delay_ms(),
            random_delay_range_ms: default_random_delay_range_ms(),
            retract_base_ms: default_retract_base_ms(),
            retract_random_range_ms: default_retract_random_range_ms(),
            timestamp_step_ms: default_timestamp_step_ms(),
        }
    }
}

impl DisplayConfig {
    pub fn typing_duration(&self) -> Duration {
        Duration::from_millis(self.typing_duration_ms)
    }

    /// Zero delays everywhere.
    pub fn instant() -> Self {
        Self {
            typing_duration_ms: 0,
            base_delay_ms: 0,
            random_delay_range_ms: 0,
            retract_base_ms: 0,
            retract_random_range_ms: 0,
            timestamp_step_ms: default_timestamp_step_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// A category counter hitting a multiple of this raises prompt strength.
    #[serde(default = "default_escalation_step")]
    pub escalation_step: u32,
    #[serde(default = "default_max_strength")]
    pub max_strength: u8,
}

fn default_escalation_step() -> u32 {
    5
}

fn default_max_strength() -> u8 {
    5
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            escalation_step: default_escalation_step(),
            max_strength: default_max_strength(),
        }
    }
}
