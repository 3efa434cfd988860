pub mod character;
pub mod voice;

pub use character::Character;
pub use voice::VoiceStyle;
