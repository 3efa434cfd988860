/// Sentence terminators recognised by the length rules, ASCII and full-width.
pub const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

const ELLIPSIS: char = '…';

#[must_use]
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

pub fn is_sentence_terminator(ch: char) -> bool {
    SENTENCE_TERMINATORS.contains(&ch)
}

/// Truncate to at most `max_chars` characters, the ellipsis included.
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if char_count(s) <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    match s.char_indices().nth(max_chars - 1) {
        Some((idx, _)) => {
            let mut truncated = s[..idx].trim_end().to_string();
            truncated.push(ELLIPSIS);
            truncated
        }
        None => s.to_string(),
    }
}

/// Split into sentences, each keeping its run of trailing terminators.
///
/// Concatenating the result reproduces the input exactly.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if !is_sentence_terminator(ch) {
            continue;
        }
        while let Some((_, next)) = chars.peek().copied() {
            if is_sentence_terminator(next) {
                chars.next();
            } else {
                break;
            }
        }
        let end = chars.peek().map_or(text.len(), |(idx, _)| *idx);
        parts.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        parts.push(&text[start..]);
    }

    parts
}

/// Number of sentences that carry visible text.
#[must_use]
pub fn sentence_count(text: &str) -> usize {
    split_sentences(text)
        .into_iter()
        .filter(|sentence| {
            sentence
                .chars()
                .any(|ch| !ch.is_whitespace() && !is_sentence_terminator(ch))
        })
        .count()
}

/// Trim every line and allow at most one blank line between paragraphs.
#[must_use]
pub fn normalize_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        out.push_str(line);
        blank_run = 0;
    }

    out
}
