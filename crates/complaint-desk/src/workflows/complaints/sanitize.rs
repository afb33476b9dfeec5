//! Input scrubbing applied to free-form contact fields.

use std::sync::LazyLock;

use regex::Regex;

/// Anything outside Unicode letters (general category L), space, apostrophe and hyphen.
static RE_NAME_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L} '-]").expect("name filter pattern is valid"));

/// Keeps letters from any script, spaces, hyphens and apostrophes.
pub fn sanitize_name(raw: &str) -> String {
    RE_NAME_DISALLOWED.replace_all(raw, "").into_owned()
}

/// Keeps digits plus a single `+`, and only as the first character.
pub fn sanitize_phone(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '+' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }
    cleaned
}

/// Reduces an uploaded path to its file name; attachments are tracked by name only.
pub fn evidence_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
