/// Tool names are matched case-insensitively with spaces replaced by underscores,
/// which is also the shape function-calling APIs accept.
pub fn normalize_tool_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Returns the first `max_chars` characters of `s` without splitting a character.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
