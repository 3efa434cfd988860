use console::style;
use std::fmt::Display;

/// Cyan bold: speaker names
pub fn speaker<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}

/// Dim: typing indicator, timestamps, secondary text
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Magenta italic: inner voice and essays
pub fn inner<D: Display>(text: D) -> String {
    style(text).magenta().italic().to_string()
}

/// Yellow: system notices and narration
pub fn notice<D: Display>(text: D) -> String {
    style(text).yellow().to_string()
}

/// Red bold: errors shown to the user
pub fn error<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Green bold: confirmations
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// Struck through: retracted messages
pub fn retracted<D: Display>(text: D) -> String {
    style(text).dim().strikethrough().to_string()
}
