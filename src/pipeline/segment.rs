use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Sending,
    Sent,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    Text,
    Emoji,
    Voice,
    Quote,
    InnerVoice,
    Essay,
    System,
    Narrator,
}

/// The message a quote-reply refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedMessage {
    pub sender: String,
    pub text: String,
}

/// One independently displayed unit of a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSegment {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub character_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: SegmentStatus,
    pub message_type: MessageType,
    /// Display name of the speaker; replies may voice several characters.
    pub original_sender: String,
    /// Wait before showing this segment, relative to the previous one.
    #[serde(with = "duration_ms")]
    pub display_delay: Duration,
    /// Present iff the segment is withdrawn again after being shown.
    #[serde(default, with = "option_duration_ms")]
    pub retract_after: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuotedMessage>,
}

impl MessageSegment {
    pub fn new(
        message_type: MessageType,
        content: impl Into<String>,
        original_sender: impl Into<String>,
        character_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: Sender::Ai,
            character_id: character_id.into(),
            timestamp: Utc::now(),
            status: SegmentStatus::Sent,
            message_type,
            original_sender: original_sender.into(),
            display_delay: Duration::ZERO,
            retract_after: None,
            voice_duration: None,
            quote: None,
        }
    }

    /// Single text segment for a reply that carries no inline markup.
    pub fn plain(
        content: impl Into<String>,
        speaker: impl Into<String>,
        character_id: impl Into<String>,
    ) -> Self {
        Self::new(MessageType::Text, content, speaker, character_id)
    }

    pub fn should_retract(&self) -> bool {
        self.retract_after.is_some()
    }

    #[must_use]
    pub fn with_display_delay(mut self, delay: Duration) -> Self {
        self.display_delay = delay;
        self
    }

    #[must_use]
    pub fn with_retraction(mut self, after: Duration) -> Self {
        self.retract_after = Some(after);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer
                .serialize_some(&u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
