use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Key prefixes used by the OpenAI-compatible vendors people point this at.
const KEY_PREFIXES: [&str; 5] = ["sk-", "sess-", "hf_", "gsk_", "AIza"];

/// Spots where a credential follows in echoed requests.
const KEY_MARKERS: [&str; 5] = [
    "Bearer ",
    "bearer ",
    "api_key=",
    "\"api_key\":\"",
    "\"authorization\":\"",
];

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/' | '=')
}

fn redact_after(text: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(marker) {
        let start = search_from + rel;
        let value_start = start + marker.len();
        let value_len: usize = text[value_start..]
            .chars()
            .take_while(|c| is_key_char(*c))
            .map(char::len_utf8)
            .sum();

        if value_len == 0 {
            search_from = value_start;
            continue;
        }
        text.replace_range(start..value_start + value_len, REDACTED);
        search_from = start + REDACTED.len();
    }
}

/// Redact `api_key` itself plus anything that looks like a credential.
pub fn scrub_secrets<'a>(input: &'a str, api_key: Option<&str>) -> Cow<'a, str> {
    let api_key = api_key.filter(|key| !key.trim().is_empty());
    let suspicious = api_key.is_some_and(|key| input.contains(key))
        || KEY_PREFIXES.iter().any(|prefix| input.contains(prefix))
        || KEY_MARKERS.iter().any(|marker| input.contains(marker));
    if !suspicious {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = match api_key {
        Some(key) => input.replace(key, REDACTED),
        None => input.to_string(),
    };
    for marker in KEY_MARKERS.iter().chain(KEY_PREFIXES.iter()) {
        redact_after(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrub and cap an error body before it reaches logs or the user.
pub fn sanitize_api_error(input: &str, api_key: Option<&str>) -> String {
    let scrubbed = scrub_secrets(input.trim(), api_key);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }
    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}
