use super::voice::VoiceStyle;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_NAME_CHARS: usize = 40;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_PERSONALITY_CHARS: usize = 1000;
pub const MAX_GREETING_CHARS: usize = 200;
pub const MAX_TAGS: usize = 10;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default = "new_character_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub voice_style: VoiceStyle,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn new_character_id() -> String {
    Uuid::new_v4().to_string()
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_character_id(),
            name: name.into(),
            description: String::new(),
            personality: String::new(),
            scenario: String::new(),
            greeting: String::new(),
            voice_style: VoiceStyle::default(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        validate_text_len("name", name, MAX_NAME_CHARS)?;
        validate_text_len("description", &self.description, MAX_DESCRIPTION_CHARS)?;
        validate_text_len("personality", &self.personality, MAX_PERSONALITY_CHARS)?;
        validate_text_len("greeting", &self.greeting, MAX_GREETING_CHARS)?;

        if self.tags.len() > MAX_TAGS {
            return Err(invalid(
                "tags",
                format!("exceeds max items of {MAX_TAGS}"),
            ));
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(invalid("tags", "contains empty item"));
        }
        Ok(())
    }

    /// Parse character data produced by a model. Accepts a fenced ```json
    /// block anywhere in the reply, or the bare JSON object on its own.
    pub fn from_generated(raw: &str) -> Result<Self, ValidationError> {
        let json = extract_json_block(raw).ok_or_else(|| ValidationError::GeneratedData {
            reason: "no JSON object found in generated text".to_string(),
        })?;

        let character: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::GeneratedData {
                reason: format!("malformed character JSON: {e}"),
            })?;
        character.validate()?;
        Ok(character)
    }
}

fn extract_json_block(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find(JSON_FENCE) {
        let after_start = &raw[start + JSON_FENCE.len()..];
        let end = after_start.find(FENCE)?;
        return Some(after_start[..end].trim());
    }

    let trimmed = raw.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}')).then_some(trimmed)
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::Character {
        field,
        reason: reason.into(),
    }
}

fn validate_text_len(field: &'static str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(invalid(
            field,
            format!("exceeds max length of {max_chars}"),
        ));
    }
    Ok(())
}
