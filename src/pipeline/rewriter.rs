//! Rule-based paraphrasing for replies flagged as near-duplicates.

use super::random::RandomSource;
use crate::config::RewriterConfig;
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RewriteCategory {
    Greeting,
    Confirmation,
    Thanks,
    ToneWord,
    Emoji,
}

struct RewriteRule {
    category: RewriteCategory,
    pattern: Regex,
    /// Capture group that gets replaced; 0 is the whole match.
    group: usize,
    /// Most common phrasings first.
    alternatives: &'static [&'static str],
}

const RULE_SOURCES: [(RewriteCategory, &str, usize, &[&str]); 5] = [
    (
        RewriteCategory::Greeting,
        r"(?i)^(你好呀|你好|嗨|哈喽|(?:hello|hi|hey)\b)",
        1,
        &["嗨", "哈喽", "你好呀", "嘿嘿", "来啦"],
    ),
    (
        RewriteCategory::Confirmation,
        r"(?:^|[，,。！!？?～~\s])(好的|好吧|好呀|没问题|可以的|嗯嗯|收到)(?:[，,。！!～~\s]|$)",
        1,
        &["好呀", "没问题", "行呀", "可以呀", "嗯嗯", "收到"],
    ),
    (
        RewriteCategory::Thanks,
        r"(?:^|[，,。！!？?～~\s])(谢谢你|谢谢|感谢|多谢)(?:[，,。！!～~\s呀啦哈]|$)",
        1,
        &["谢啦", "多谢多谢", "感谢感谢", "谢谢你呀", "太感谢了"],
    ),
    (
        RewriteCategory::ToneWord,
        r"(呢|呀|啊|哦|嘛|啦)[！!？?。~～]*$",
        1,
        &["呢", "呀", "啊", "哦", "啦", "嘛"],
    ),
    (
        RewriteCategory::Emoji,
        r"([😊😄😂🥰😘🤔😅😭👍🙈✨😆])\s*$",
        1,
        &["😊", "😄", "🥰", "✨", "🙈", "😆"],
    ),
];

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    RULE_SOURCES
        .iter()
        .filter_map(|(category, source, group, alternatives)| {
            match Regex::new(source) {
                Ok(pattern) => Some(RewriteRule {
                    category: *category,
                    pattern,
                    group: *group,
                    alternatives: *alternatives,
                }),
                Err(e) => {
                    tracing::error!("invalid rewrite pattern for {category}: {e}");
                    None
                }
            }
        })
        .collect()
});

/// Sentence-final swaps tried when no category matches.
static FALLBACK_TEMPLATES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [("。$", "～"), ("！$", "呀！"), ("？$", "呢？")]
        .into_iter()
        .filter_map(|(source, replacement)| match Regex::new(source) {
            Ok(re) => Some((re, replacement)),
            Err(e) => {
                tracing::error!("invalid fallback template {source}: {e}");
                None
            }
        })
        .collect()
});

pub struct ResponseRewriter {
    config: RewriterConfig,
}

impl ResponseRewriter {
    pub fn new(config: RewriterConfig) -> Self {
        Self { config }
    }

    /// First category whose pattern matches, in priority order.
    pub fn matching_category(text: &str) -> Option<RewriteCategory> {
        RULES
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.category)
    }

    /// Apply at most one rule. Returns `text` unchanged when nothing matches.
    pub fn rewrite(&self, text: &str, rng: &mut dyn RandomSource) -> String {
        self.rewrite_with_randomness(text, |_| self.config.randomness, rng)
    }

    /// Like [`Self::rewrite`], but categories that already show up often in
    /// `history` pick among their common alternatives more consistently, so the
    /// same substitution does not bounce back and forth.
    pub fn rewrite_with_history(
        &self,
        text: &str,
        history: &[String],
        rng: &mut dyn RandomSource,
    ) -> String {
        self.rewrite_with_randomness(
            text,
            |category| {
                let uses = category_usage(category, history);
                if uses >= self.config.overuse_threshold {
                    #[allow(clippy::cast_precision_loss)]
                    let damping = (1 + uses) as f64;
                    self.config.randomness / damping
                } else {
                    self.config.randomness
                }
            },
            rng,
        )
    }

    fn rewrite_with_randomness(
        &self,
        text: &str,
        randomness_for: impl Fn(RewriteCategory) -> f64,
        rng: &mut dyn RandomSource,
    ) -> String {
        for rule in RULES.iter() {
            let Some(span) = rule
                .pattern
                .captures(text)
                .and_then(|caps| caps.get(rule.group))
            else {
                continue;
            };

            let matched = span.as_str();
            let replacement = self.pick_alternative(
                rule.alternatives,
                matched,
                randomness_for(rule.category),
                rng,
            );
            tracing::debug!(
                category = %rule.category,
                "rewriting repetitive reply: {matched} -> {replacement}"
            );
            return format!("{}{replacement}{}", &text[..span.start()], &text[span.end()..]);
        }

        for (pattern, replacement) in FALLBACK_TEMPLATES.iter() {
            if pattern.is_match(text) {
                return pattern.replace(text, *replacement).into_owned();
            }
        }

        text.to_string()
    }

    fn pick_alternative<'a>(
        &self,
        alternatives: &[&'a str],
        matched: &str,
        randomness: f64,
        rng: &mut dyn RandomSource,
    ) -> &'a str {
        let distinct: Vec<&'a str> = alternatives
            .iter()
            .copied()
            .filter(|alt| !alt.eq_ignore_ascii_case(matched))
            .collect();
        let candidates = if distinct.is_empty() {
            alternatives.to_vec()
        } else {
            distinct
        };

        let pool = if rng.chance(randomness) {
            &candidates[..]
        } else {
            let common = self.config.common_alternatives.clamp(1, candidates.len());
            &candidates[..common]
        };
        pool[rng.below(pool.len())]
    }
}

fn category_usage(category: RewriteCategory, history: &[String]) -> usize {
    RULES
        .iter()
        .find(|rule| rule.category == category)
        .map_or(0, |rule| {
            history
                .iter()
                .filter(|text| rule.pattern.is_match(text))
                .count()
        })
}
