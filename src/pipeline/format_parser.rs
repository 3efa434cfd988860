//! Inline reply markup.
//!
//! The model is prompted to emit pipe-delimited markers that split one reply
//! into several chat bubbles:
//!
//! | Marker                                   | Segment                  |
//! |------------------------------------------|--------------------------|
//! | `[Name\|Text]`                           | text                     |
//! | `<Name\|EmojiId>`                        | emoji                    |
//! | `[Name\|语音\|Duration\|Text]`           | voice                    |
//! | `{Name\|Text}`                           | text, retracted later    |
//! | `[Name\|引用\|QuotedName\|Quoted\|Text]` | quote                    |
//! | `【心声\|Name\|Thought】`                | inner voice              |
//! | `「随笔\|Name\|Essay」`                  | essay                    |
//! | `<系统>Text</系统>`                      | system                   |
//! | `<旁白>Text</旁白>`                      | narrator                 |
//!
//! Overlaps resolve to the match that starts first; on equal starts the marker
//! scanned first wins, which is why the voice and quote forms are scanned
//! before the generic text form that also matches them.

use super::random::RandomSource;
use super::segment::{MessageSegment, MessageType, QuotedMessage};
use crate::config::DisplayConfig;
use chrono::{TimeDelta, Utc};
use regex::{Regex, RegexSet};
use std::sync::LazyLock;
use std::time::Duration;

pub const SYSTEM_SPEAKER: &str = "系统";
pub const NARRATOR_SPEAKER: &str = "旁白";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Voice,
    Quote,
    Text,
    Retract,
    Emoji,
    InnerVoice,
    Essay,
    System,
    Narrator,
}

/// Scan order. Index positions line up with `PATTERN_SOURCES`.
const SCAN_ORDER: [MarkerKind; 9] = [
    MarkerKind::Voice,
    MarkerKind::Quote,
    MarkerKind::Text,
    MarkerKind::Retract,
    MarkerKind::Emoji,
    MarkerKind::InnerVoice,
    MarkerKind::Essay,
    MarkerKind::System,
    MarkerKind::Narrator,
];

const PATTERN_SOURCES: [&str; 9] = [
    r"\[([^\[\]|]+)\|语音\|([^\[\]|]+)\|([^\[\]]+)\]",
    r"\[([^\[\]|]+)\|引用\|([^\[\]|]+)\|([^\[\]|]+)\|([^\[\]]+)\]",
    r"\[([^\[\]|]+)\|([^\[\]]+)\]",
    r"\{([^{}|]+)\|([^{}]+)\}",
    r"<([^<>|/]+)\|([^<>|]+)>",
    r"【心声\|([^【】|]+)\|([^【】]+)】",
    r"「随笔\|([^「」|]+)\|([^「」]+)」",
    r"(?s)<系统>(.+?)</系统>",
    r"(?s)<旁白>(.+?)</旁白>",
];

static MARKER_PATTERNS: LazyLock<Vec<(MarkerKind, Regex)>> = LazyLock::new(|| {
    SCAN_ORDER
        .iter()
        .zip(PATTERN_SOURCES)
        .filter_map(|(kind, source)| match Regex::new(source) {
            Ok(regex) => Some((*kind, regex)),
            Err(e) => {
                tracing::error!("invalid marker pattern {source}: {e}");
                None
            }
        })
        .collect()
});

static MARKER_SET: LazyLock<Option<RegexSet>> = LazyLock::new(|| match RegexSet::new(PATTERN_SOURCES) {
    Ok(set) => Some(set),
    Err(e) => {
        tracing::error!("invalid marker pattern set: {e}");
        None
    }
});

/// A recognised marker with its fields, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Text { sender: String, text: String },
    Emoji { sender: String, emoji: String },
    Voice { sender: String, duration: String, text: String },
    Retract { sender: String, text: String },
    Quote {
        sender: String,
        quoted_sender: String,
        quoted_text: String,
        text: String,
    },
    InnerVoice { sender: String, thought: String },
    Essay { sender: String, essay: String },
    System { text: String },
    Narrator { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    /// Byte offsets into the scanned text.
    pub start: usize,
    pub end: usize,
    pub marker: Marker,
}

/// Cheap check: does `text` contain at least one marker of any kind?
pub fn has_structured_format(text: &str) -> bool {
    match MARKER_SET.as_ref() {
        Some(set) => set.is_match(text),
        None => MARKER_PATTERNS.iter().any(|(_, regex)| regex.is_match(text)),
    }
}

/// Every non-overlapping marker in `text`, in source order.
pub fn scan_markers(text: &str) -> Vec<MarkerMatch> {
    let mut found = Vec::new();
    for (kind, regex) in MARKER_PATTERNS.iter() {
        for caps in regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let field = |i: usize| caps.get(i).map_or("", |m| m.as_str().trim()).to_string();
            let marker = match kind {
                MarkerKind::Text => Marker::Text {
                    sender: field(1),
                    text: field(2),
                },
                MarkerKind::Emoji => Marker::Emoji {
                    sender: field(1),
                    emoji: field(2),
                },
                MarkerKind::Voice => Marker::Voice {
                    sender: field(1),
                    duration: field(2),
                    text: field(3),
                },
                MarkerKind::Retract => Marker::Retract {
                    sender: field(1),
                    text: field(2),
                },
                MarkerKind::Quote => Marker::Quote {
                    sender: field(1),
                    quoted_sender: field(2),
                    quoted_text: field(3),
                    text: field(4),
                },
                MarkerKind::InnerVoice => Marker::InnerVoice {
                    sender: field(1),
                    thought: field(2),
                },
                MarkerKind::Essay => Marker::Essay {
                    sender: field(1),
                    essay: field(2),
                },
                MarkerKind::System => Marker::System { text: field(1) },
                MarkerKind::Narrator => Marker::Narrator { text: field(1) },
            };
            found.push(MarkerMatch {
                start: whole.start(),
                end: whole.end(),
                marker,
            });
        }
    }

    // Stable: equal starts keep scan order.
    found.sort_by_key(|m| m.start);

    let mut kept: Vec<MarkerMatch> = Vec::with_capacity(found.len());
    for candidate in found {
        let overlaps = kept
            .last()
            .is_some_and(|previous| candidate.start < previous.end);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

/// Turns a raw reply into timed message segments.
pub struct FormatParser {
    display: DisplayConfig,
}

impl FormatParser {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    /// Parse `text` into segments. A reply without markers yields nothing; the
    /// caller falls back to showing it as one plain message.
    pub fn parse(
        &self,
        text: &str,
        character_id: &str,
        rng: &mut dyn RandomSource,
    ) -> Vec<MessageSegment> {
        let base = Utc::now();
        let step = i64::try_from(self.display.timestamp_step_ms).unwrap_or(i64::MAX);

        scan_markers(text)
            .into_iter()
            .enumerate()
            .map(|(index, found)| {
                let offset = i64::try_from(index)
                    .unwrap_or(i64::MAX)
                    .saturating_mul(step);
                let timestamp = base + TimeDelta::milliseconds(offset);
                let delay = self.display.base_delay_ms
                    + rng.jitter_ms(self.display.random_delay_range_ms);

                let mut segment = segment_for(found.marker, character_id)
                    .with_timestamp(timestamp)
                    .with_display_delay(Duration::from_millis(delay));

                if segment.retract_after.is_some() {
                    let retract = self.display.retract_base_ms
                        + rng.jitter_ms(self.display.retract_random_range_ms);
                    segment = segment.with_retraction(Duration::from_millis(retract));
                }
                segment
            })
            .collect()
    }
}

fn segment_for(marker: Marker, character_id: &str) -> MessageSegment {
    match marker {
        Marker::Text { sender, text } => {
            MessageSegment::new(MessageType::Text, text, sender, character_id)
        }
        Marker::Emoji { sender, emoji } => {
            MessageSegment::new(MessageType::Emoji, emoji, sender, character_id)
        }
        Marker::Voice {
            sender,
            duration,
            text,
        } => {
            let mut segment = MessageSegment::new(MessageType::Voice, text, sender, character_id);
            segment.voice_duration = Some(duration);
            segment
        }
        // Placeholder delay; `parse` replaces it with the configured one.
        Marker::Retract { sender, text } => {
            MessageSegment::new(MessageType::Text, text, sender, character_id)
                .with_retraction(Duration::ZERO)
        }
        Marker::Quote {
            sender,
            quoted_sender,
            quoted_text,
            text,
        } => {
            let mut segment = MessageSegment::new(MessageType::Quote, text, sender, character_id);
            segment.quote = Some(QuotedMessage {
                sender: quoted_sender,
                text: quoted_text,
            });
            segment
        }
        Marker::InnerVoice { sender, thought } => {
            MessageSegment::new(MessageType::InnerVoice, thought, sender, character_id)
        }
        Marker::Essay { sender, essay } => {
            MessageSegment::new(MessageType::Essay, essay, sender, character_id)
        }
        Marker::System { text } => {
            MessageSegment::new(MessageType::System, text, SYSTEM_SPEAKER, character_id)
        }
        Marker::Narrator { text } => {
            MessageSegment::new(MessageType::Narrator, text, NARRATOR_SPEAKER, character_id)
        }
    }
}
