/// Clip a string to at most `max` characters, marking the cut with "…".
/// Operates on chars, not bytes, so multi-byte text never splits mid-glyph.
pub fn clip(s: &str, max: usize) -> String {
    let mut it = s.char_indices();
    match it.nth(max) {
        None => s.to_string(),
        Some((byte_idx, _)) => format!("{}…", &s[..byte_idx]),
    }
}

/// Epoch milliseconds. Status records carry this instead of a formatted
/// date so the observer can compute staleness without parsing.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
