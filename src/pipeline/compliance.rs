//! Session-wide ledger of reply-policy violations.
//!
//! Every category counter that reaches a multiple of the escalation step raises
//! the prompt strength by one, up to the configured maximum, and rewrites the
//! strict length-control prompt with a sterner reminder.

use crate::config::ComplianceConfig;
use crate::error::StorageError;
use crate::prompt::store::default_prompts;
use crate::prompt::{PromptStore, STRICT_LENGTH_CONTROL_ID, SystemPrompt};
use crate::storage::{KeyValueStore, load_json, save_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const STATS_KEY: &str = "compliance_stats";
pub const ESCALATION_MARKER: &str = "【强化提醒】";
pub const MIN_STRENGTH_LEVEL: u8 = 1;
pub const MAX_STRENGTH_LEVEL: u8 = 5;

/// Indexed by strength level minus one.
const ESCALATION_LADDER: [&str; 5] = [
    "请记得保持回复简短。",
    "注意：回复必须控制在50字以内，最多两句话。",
    "重要：你最近多次违反回复规则，务必严格遵守长度和格式要求。",
    "严重警告：继续违反规则会破坏聊天体验，每条回复都必须简短自然。",
    "最高级别警告：任何一条回复都不允许超过50字或两句话，不允许列举、换行、冒号或重复。",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationType {
    LengthViolation,
    SentenceViolation,
    FormatViolation,
    KeywordViolation,
    RepetitionViolation,
}

impl ViolationType {
    fn warning_line(self) -> &'static str {
        match self {
            Self::LengthViolation => "最近的回复太长了，每条消息不要超过50个字。",
            Self::SentenceViolation => "最近的回复句子太多了，最多只说两句话。",
            Self::FormatViolation => "不要换行，也不要使用冒号。",
            Self::KeywordViolation => "不要使用“首先”“其次”“然后”这类列举用语。",
            Self::RepetitionViolation => "不要重复之前说过的话，换一种说法。",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceStats {
    pub length_violations: u32,
    pub sentence_violations: u32,
    pub format_violations: u32,
    pub keyword_violations: u32,
    pub repetition_violations: u32,
    pub total_violations: u32,
    pub last_violation_time: Option<DateTime<Utc>>,
    pub prompt_strength_level: u8,
}

impl Default for ComplianceStats {
    fn default() -> Self {
        Self {
            length_violations: 0,
            sentence_violations: 0,
            format_violations: 0,
            keyword_violations: 0,
            repetition_violations: 0,
            total_violations: 0,
            last_violation_time: None,
            prompt_strength_level: MIN_STRENGTH_LEVEL,
        }
    }
}

impl ComplianceStats {
    pub fn count(&self, kind: ViolationType) -> u32 {
        match kind {
            ViolationType::LengthViolation => self.length_violations,
            ViolationType::SentenceViolation => self.sentence_violations,
            ViolationType::FormatViolation => self.format_violations,
            ViolationType::KeywordViolation => self.keyword_violations,
            ViolationType::RepetitionViolation => self.repetition_violations,
        }
    }

    fn counter_mut(&mut self, kind: ViolationType) -> &mut u32 {
        match kind {
            ViolationType::LengthViolation => &mut self.length_violations,
            ViolationType::SentenceViolation => &mut self.sentence_violations,
            ViolationType::FormatViolation => &mut self.format_violations,
            ViolationType::KeywordViolation => &mut self.keyword_violations,
            ViolationType::RepetitionViolation => &mut self.repetition_violations,
        }
    }

    /// Stored stats may come from an older or hand-edited file.
    fn sanitized(mut self, max_strength: u8) -> Self {
        self.total_violations = [
            self.sentence_violations,
            self.format_violations,
            self.keyword_violations,
            self.repetition_violations,
        ]
        .into_iter()
        .fold(self.length_violations, u32::saturating_add);
        self.prompt_strength_level = self
            .prompt_strength_level
            .clamp(MIN_STRENGTH_LEVEL, max_strength);
        self
    }
}

pub struct ComplianceMonitor {
    store: Arc<dyn KeyValueStore>,
    prompts: Arc<PromptStore>,
    escalation_step: u32,
    max_strength: u8,
    stats: Mutex<ComplianceStats>,
}

impl ComplianceMonitor {
    /// Hydrate from `store`. Unreadable stats are logged and start from zero.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        prompts: Arc<PromptStore>,
        config: &ComplianceConfig,
    ) -> Self {
        let max_strength = config
            .max_strength
            .clamp(MIN_STRENGTH_LEVEL, MAX_STRENGTH_LEVEL);
        let stats = match load_json::<ComplianceStats>(store.as_ref(), STATS_KEY).await {
            Ok(Some(stats)) => stats.sanitized(max_strength),
            Ok(None) => ComplianceStats::default(),
            Err(e) => {
                tracing::warn!("failed to load compliance stats, starting fresh: {e}");
                ComplianceStats::default()
            }
        };

        Self {
            store,
            prompts,
            escalation_step: config.escalation_step.max(1),
            max_strength,
            stats: Mutex::new(stats),
        }
    }

    pub async fn stats(&self) -> ComplianceStats {
        self.stats.lock().await.clone()
    }

    /// Count one violation and escalate when its counter crosses the step.
    ///
    /// The in-memory ledger is updated even when persisting fails; the
    /// storage error is logged and returned.
    pub async fn record_violation(
        &self,
        kind: ViolationType,
    ) -> Result<ComplianceStats, StorageError> {
        let mut stats = self.stats.lock().await;

        let counter = stats.counter_mut(kind);
        *counter = counter.saturating_add(1);
        let count = *counter;
        stats.total_violations = stats.total_violations.saturating_add(1);
        stats.last_violation_time = Some(Utc::now());

        let escalated = count % self.escalation_step == 0
            && stats.prompt_strength_level < self.max_strength;
        if escalated {
            stats.prompt_strength_level += 1;
            tracing::info!(
                violation = %kind,
                count,
                level = stats.prompt_strength_level,
                "escalating prompt strength"
            );
        }
        let snapshot = stats.clone();

        let saved = save_json(self.store.as_ref(), STATS_KEY, &snapshot).await;
        if let Err(e) = &saved {
            tracing::error!("failed to persist compliance stats: {e}");
        }

        if escalated && let Err(e) = self.escalate_prompt(snapshot.prompt_strength_level, kind).await {
            tracing::error!("failed to persist escalated prompt: {e}");
            saved?;
            return Err(e);
        }

        saved.map(|()| snapshot)
    }

    /// Zero every counter, drop strength back to the minimum and persist.
    pub async fn reset_stats(&self) -> Result<(), StorageError> {
        let mut stats = self.stats.lock().await;
        *stats = ComplianceStats::default();
        save_json(self.store.as_ref(), STATS_KEY, &*stats)
            .await
            .inspect_err(|e| tracing::error!("failed to persist reset compliance stats: {e}"))
    }

    async fn escalate_prompt(&self, level: u8, kind: ViolationType) -> Result<(), StorageError> {
        let current = match self.prompts.get(STRICT_LENGTH_CONTROL_ID).await {
            Some(prompt) => prompt,
            None => strict_length_default(),
        };
        let content = escalated_content(&current.content, level, kind);
        self.prompts
            .upsert(SystemPrompt { content, ..current })
            .await
    }
}

fn strict_length_default() -> SystemPrompt {
    default_prompts()
        .into_iter()
        .find(|prompt| prompt.id == STRICT_LENGTH_CONTROL_ID)
        .unwrap_or_else(|| SystemPrompt {
            id: STRICT_LENGTH_CONTROL_ID.to_string(),
            name: STRICT_LENGTH_CONTROL_ID.to_string(),
            content: String::new(),
            enabled: true,
        })
}

/// Base text (anything before the marker) plus the suffix for `level`.
pub fn escalated_content(content: &str, level: u8, kind: ViolationType) -> String {
    let base = content
        .split(ESCALATION_MARKER)
        .next()
        .unwrap_or_default()
        .trim_end();
    let rung = usize::from(level.clamp(MIN_STRENGTH_LEVEL, MAX_STRENGTH_LEVEL) - 1);
    format!(
        "{base}\n\n{ESCALATION_MARKER}{}\n{}",
        ESCALATION_LADDER[rung],
        kind.warning_line()
    )
}
