use serde::{Deserialize, Serialize};

/// Speaking style of a character; picks the flourishes added to plain replies.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum VoiceStyle {
    #[default]
    Gentle,
    Lively,
    Cool,
    Cute,
    Mature,
}

/// Every sentence-final particle any style may append. Used to tell whether a
/// reply already carries one.
pub const ALL_TONE_WORDS: [&str; 10] = ["呢", "呀", "啊", "哦", "嘛", "啦", "吧", "哒", "哇", "嗯"];

impl VoiceStyle {
    pub fn tone_words(self) -> &'static [&'static str] {
        match self {
            Self::Gentle => &["呢", "哦", "呀"],
            Self::Lively => &["呀", "啦", "哇"],
            Self::Cool => &["吧", "嗯"],
            Self::Cute => &["呀", "嘛", "哒"],
            Self::Mature => &["呢", "吧"],
        }
    }

    pub fn emojis(self) -> &'static [&'static str] {
        match self {
            Self::Gentle => &["😊", "🌸", "☺️"],
            Self::Lively => &["😆", "✨", "🎉"],
            Self::Cool => &["😎", "🙃"],
            Self::Cute => &["🥰", "🙈", "💕"],
            Self::Mature => &["🙂", "☕"],
        }
    }
}
