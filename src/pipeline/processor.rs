//! Entry point that turns a raw model reply into the text handed to display.
//!
//! Replies carrying inline markup are only tidied; everything else is held to
//! the chat length rules, optionally decorated, and checked against recent
//! replies for repetition.

use super::background::ComplianceReporter;
use super::compliance::ViolationType;
use super::format_parser::has_structured_format;
use super::random::{RandomSource, ThreadRandom};
use super::rewriter::ResponseRewriter;
use super::similarity::{SimilarityResult, detect_repetition, is_emoji};
use crate::config::{ResponseConfig, RewriterConfig, SimilarityConfig};
use crate::persona::Character;
use crate::persona::voice::ALL_TONE_WORDS;
use crate::utils::text::{
    char_count, is_sentence_terminator, normalize_blank_lines, sentence_count, split_sentences,
    truncate_with_ellipsis,
};
use regex::Regex;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// Enumeration openers that make a reply read like a list instead of chat.
static DISCOURSE_MARKERS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        "discourse marker",
        r"(?i)(首先|其次|然后|接下来|以下|下面|最后|firstly|secondly)[，,、\s]*",
    )
});

static LINE_BREAKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile("line break", r"[ \t]*[\r\n]+[ \t]*"));

fn compile(what: &str, source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::error!("invalid {what} pattern: {e}");
            None
        }
    }
}

/// Result of one [`ResponseProcessor::process_detailed`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub text: String,
    /// The reply carried inline markup and was only normalized.
    pub structured: bool,
    pub violations: Vec<ViolationType>,
    /// Present for plain replies that were compared against history.
    pub similarity: Option<SimilarityResult>,
}

pub struct ResponseProcessor {
    config: ResponseConfig,
    similarity: SimilarityConfig,
    rewriter: ResponseRewriter,
    history: VecDeque<String>,
    reporter: Option<ComplianceReporter>,
    rng: Box<dyn RandomSource>,
}

impl ResponseProcessor {
    pub fn new(
        config: ResponseConfig,
        similarity: SimilarityConfig,
        rewriter: RewriterConfig,
    ) -> Self {
        let capacity = config.history_capacity.max(1);
        Self {
            config,
            similarity,
            rewriter: ResponseRewriter::new(rewriter),
            history: VecDeque::with_capacity(capacity),
            reporter: None,
            rng: Box::new(ThreadRandom),
        }
    }

    #[must_use]
    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: ComplianceReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn process(&mut self, raw: &str, character: &Character) -> String {
        self.process_detailed(raw, character).text
    }

    pub fn process_detailed(&mut self, raw: &str, character: &Character) -> ProcessOutcome {
        let outcome = if has_structured_format(raw) {
            ProcessOutcome {
                text: normalize_blank_lines(raw),
                structured: true,
                violations: Vec::new(),
                similarity: None,
            }
        } else {
            self.process_plain(raw, character)
        };

        self.remember(&outcome.text);
        if let Some(reporter) = &self.reporter {
            reporter.report(&outcome.violations, raw, &outcome.text);
        }
        outcome
    }

    /// Recent outputs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn process_plain(&mut self, raw: &str, character: &Character) -> ProcessOutcome {
        let raw = raw.trim();
        let mut violations = detect_violations(raw, &self.config);

        let cleaned = strip_forbidden(raw);
        let mut text = enforce_limits(&cleaned, self.config.max_chars, self.config.max_sentences);
        if self.config.enhance && !text.is_empty() {
            text = self.enhance(text, character);
        }

        let recent: Vec<String> = self.history.iter().cloned().collect();
        let similarity = detect_repetition(&text, &recent, &self.similarity);
        if similarity.is_repetitive {
            tracing::debug!(
                score = similarity.similarity,
                "reply repeats a recent one; rewriting"
            );
            let rewritten = self
                .rewriter
                .rewrite_with_history(&text, &recent, self.rng.as_mut());
            text = truncate_with_ellipsis(&rewritten, self.config.max_chars);
            violations.push(ViolationType::RepetitionViolation);
        }

        ProcessOutcome {
            text,
            structured: false,
            violations,
            similarity: Some(similarity),
        }
    }

    fn enhance(&mut self, mut text: String, character: &Character) -> String {
        let style = character.voice_style;
        let max_chars = self.config.max_chars;

        if self.rng.chance(self.config.tone_word_chance) && !ends_with_tone_word(&text) {
            let words = style.tone_words();
            let word = words[self.rng.below(words.len())];
            let candidate = insert_before_tail(&text, word);
            if char_count(&candidate) <= max_chars {
                text = candidate;
            }
        }

        if self.rng.chance(self.config.emoji_chance) && !text.chars().any(is_emoji) {
            let emojis = style.emojis();
            let emoji = emojis[self.rng.below(emojis.len())];
            if char_count(&text) + char_count(emoji) <= max_chars {
                text.push_str(emoji);
            }
        }

        text
    }

    fn remember(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let capacity = self.config.history_capacity.max(1);
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(text.to_string());
    }
}

fn detect_violations(raw: &str, config: &ResponseConfig) -> Vec<ViolationType> {
    let mut violations = Vec::new();
    if char_count(raw) > config.max_chars {
        violations.push(ViolationType::LengthViolation);
    }
    if sentence_count(raw) > config.max_sentences {
        violations.push(ViolationType::SentenceViolation);
    }
    if raw.contains(['\n', ':', '：']) {
        violations.push(ViolationType::FormatViolation);
    }
    if DISCOURSE_MARKERS
        .as_ref()
        .is_some_and(|markers| markers.is_match(raw))
    {
        violations.push(ViolationType::KeywordViolation);
    }
    violations
}

/// Drop enumeration openers, join lines with spaces and turn colons into commas.
fn strip_forbidden(raw: &str) -> String {
    strip_with(raw, DISCOURSE_MARKERS.as_ref(), LINE_BREAKS.as_ref())
}

/// Without a line break pattern, lines are trimmed and joined by hand.
fn strip_with(raw: &str, markers: Option<&Regex>, line_breaks: Option<&Regex>) -> String {
    let without_markers = match markers {
        Some(markers) => markers.replace_all(raw, ""),
        None => Cow::Borrowed(raw),
    };
    let single_line = match line_breaks {
        Some(line_breaks) => line_breaks.replace_all(&without_markers, " ").into_owned(),
        None => without_markers
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };
    single_line.replace([':', '：'], "，").trim().to_string()
}

/// Keep whole sentences while both caps hold, then truncate what is left.
fn enforce_limits(text: &str, max_chars: usize, max_sentences: usize) -> String {
    let mut kept = String::new();
    let mut kept_sentences = 0;

    for sentence in split_sentences(text) {
        if kept_sentences >= max_sentences {
            break;
        }
        if !kept.is_empty() && char_count(&kept) + char_count(sentence) > max_chars {
            break;
        }
        kept.push_str(sentence);
        kept_sentences += 1;
    }

    truncate_with_ellipsis(kept.trim(), max_chars)
}

fn is_tail_char(ch: char) -> bool {
    is_sentence_terminator(ch) || is_emoji(ch) || ch.is_whitespace() || matches!(ch, '~' | '～' | '…')
}

fn ends_with_tone_word(text: &str) -> bool {
    let body = text.trim_end_matches(is_tail_char);
    ALL_TONE_WORDS.iter().any(|word| body.ends_with(word))
}

/// Insert `word` before any trailing punctuation or emoji.
fn insert_before_tail(text: &str, word: &str) -> String {
    let body_len = text.trim_end_matches(is_tail_char).len();
    format!("{}{word}{}", &text[..body_len], &text[body_len..])
}
