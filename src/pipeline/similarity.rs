//! Near-duplicate detection between a candidate reply and recent replies.

use crate::config::SimilarityConfig;
use std::collections::HashSet;

const CHAR_SET_WEIGHT: f64 = 0.7;
const LENGTH_RATIO_WEIGHT: f64 = 0.3;
const PRIMARY_WEIGHT: f64 = 0.6;
const BIGRAM_WEIGHT: f64 = 0.4;

const STRIPPED_PUNCTUATION: &str = "，。！？、；：“”‘’（）【】《》「」『』…—～·,.!?;:'\"()[]{}<>~-_/\\|*#@&^%$+=`";

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub similarity: f64,
    pub is_repetitive: bool,
    /// The history entry that scored highest; only set when repetitive.
    pub matched_text: Option<String>,
}

impl SimilarityResult {
    fn distinct() -> Self {
        Self {
            similarity: 0.0,
            is_repetitive: false,
            matched_text: None,
        }
    }
}

pub fn is_emoji(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0xFE0F | 0x200D | 0x20E3
    )
}

/// Strip emoji and punctuation, collapse whitespace, lowercase.
pub fn preprocess(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|ch| !is_emoji(*ch) && !STRIPPED_PUNCTUATION.contains(*ch))
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_set(text: &str) -> HashSet<char> {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}

fn bigram_set(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    chars.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Character-set Jaccard (70%) plus length ratio (30%) over preprocessed text.
pub fn char_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (preprocess(a), preprocess(b));
    if a == b {
        return 1.0;
    }
    let (set_a, set_b) = (char_set(&a), char_set(&b));
    let jaccard = ratio(
        set_a.intersection(&set_b).count(),
        set_a.union(&set_b).count(),
    );

    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let length_ratio = ratio(len_a.min(len_b), len_a.max(len_b));

    CHAR_SET_WEIGHT * jaccard + LENGTH_RATIO_WEIGHT * length_ratio
}

/// Overlap of the adjacent-character pair sets, as `2|A∩B| / (|A|+|B|)`.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (preprocess(a), preprocess(b));
    if a == b {
        return 1.0;
    }
    let (set_a, set_b) = (bigram_set(&a), bigram_set(&b));
    ratio(
        2 * set_a.intersection(&set_b).count(),
        set_a.len() + set_b.len(),
    )
}

/// Combined score in `[0, 1]`, rounded to three decimals. Symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    let combined = PRIMARY_WEIGHT * char_similarity(a, b) + BIGRAM_WEIGHT * bigram_similarity(a, b);
    round3(combined.clamp(0.0, 1.0))
}

/// Compare `candidate` against the newest `config.window` entries of `history`
/// (oldest first) and report the best match.
pub fn detect_repetition(
    candidate: &str,
    history: &[String],
    config: &SimilarityConfig,
) -> SimilarityResult {
    if preprocess(candidate).chars().count() < config.min_length {
        return SimilarityResult::distinct();
    }

    let mut best: Option<(f64, &str)> = None;
    for previous in history.iter().rev().take(config.window) {
        let score = similarity(candidate, previous);
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, previous));
        }
    }

    let Some((score, matched)) = best else {
        return SimilarityResult::distinct();
    };

    let is_repetitive = score >= config.threshold;
    SimilarityResult {
        similarity: score,
        is_repetitive,
        matched_text: is_repetitive.then(|| matched.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn preprocess_strips_noise() {
        assert_eq!(preprocess("你好啊，很高兴认识你！😊"), "你好啊很高兴认识你");
        assert_eq!(preprocess("  Hello,   WORLD!  "), "hello world");
        assert_eq!(preprocess("❤️👍"), "");
    }

    #[test]
    fn identical_text_scores_one() {
        assert!((similarity("今天也要开心哦", "今天也要开心哦") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("a", "a") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_symmetric_and_bounded() {
        let pairs = [
            ("你好呀", "你好"),
            ("完全不同的内容", "abc"),
            ("", "非空"),
            ("今天天气真不错", "明天天气也不错"),
        ];
        for (a, b) in pairs {
            let ab = similarity(a, b);
            let ba = similarity(b, a);
            assert!((ab - ba).abs() < f64::EPSILON, "{a} / {b}");
            assert!((0.0..=1.0).contains(&ab), "{a} / {b}: {ab}");
        }
    }

    #[test]
    fn disjoint_text_scores_low() {
        assert!(similarity("苹果香蕉", "xyz uvw") < 0.3);
    }

    #[test]
    fn near_duplicate_greeting_is_repetitive() {
        let result = detect_repetition(
            "你好呀，很高兴认识你呢！",
            &history(&["你好啊，很高兴认识你！"]),
            &SimilarityConfig::default(),
        );
        assert!(result.is_repetitive, "score {}", result.similarity);
        assert!(result.similarity > 0.7);
        assert_eq!(result.matched_text.as_deref(), Some("你好啊，很高兴认识你！"));
    }

    #[test]
    fn different_reply_is_not_repetitive() {
        let result = detect_repetition(
            "今天天气真不错呢！",
            &history(&["你好啊，很高兴认识你！"]),
            &SimilarityConfig::default(),
        );
        assert!(!result.is_repetitive);
        assert!(result.matched_text.is_none());
    }

    #[test]
    fn short_candidates_are_never_compared() {
        let result = detect_repetition(
            "好的",
            &history(&["好的", "好的"]),
            &SimilarityConfig::default(),
        );
        assert!(!result.is_repetitive);
        assert!(result.similarity.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_history_is_not_repetitive() {
        let result = detect_repetition("这是一句足够长的测试回复内容", &[], &SimilarityConfig::default());
        assert!(!result.is_repetitive);
    }

    #[test]
    fn only_recent_window_is_considered() {
        let candidate = "我今天去公园散步看到了很多花";
        let mut items = vec![candidate.to_string()];
        items.extend((0..5).map(|i| format!("完全无关的第{i}条消息内容")));

        let config = SimilarityConfig::default();
        let result = detect_repetition(candidate, &items, &config);
        assert!(!result.is_repetitive);

        let wide = SimilarityConfig {
            window: 6,
            ..config
        };
        let result = detect_repetition(candidate, &items, &wide);
        assert!(result.is_repetitive);
        assert!((result.similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn maximum_score_wins_regardless_of_position() {
        let candidate = "我今天去公园散步看到了很多花";
        let items = history(&[
            "我今天去公园散步看到了很多花",
            "今天去了趟超市买东西",
        ]);
        let result = detect_repetition(candidate, &items, &SimilarityConfig::default());
        assert_eq!(result.matched_text.as_deref(), Some(candidate));
    }

    #[test]
    fn score_is_rounded_to_three_decimals() {
        let score = similarity("你好呀很高兴认识你呢", "你好啊很高兴认识你");
        assert!((score * 1000.0 - (score * 1000.0).round()).abs() < 1e-9);
    }
}
