//! Tolerant extraction of structured data from free-form oracle replies.
//!
//! The oracle is a text model: valid JSON often arrives wrapped in prose or
//! markdown fences. Three strategies run in order, first success wins. Total
//! failure returns `None`, which the batch executor treats as recoverable.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    // Triple-backtick block, optional language tag on the opening fence.
    Regex::new(r"```[A-Za-z0-9_-]*\s*([\s\S]*?)```").unwrap()
});

/// Extract the first JSON array or object found in `text`.
///
/// Never panics. Strategies, in order:
/// 1. parse the whole (trimmed) text directly;
/// 2. parse the contents of the first fenced code block;
/// 3. parse the slice from the first `[` to the last `]`, then the slice
///    from the first `{` to the last `}`.
pub fn parse(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        if v.is_array() || v.is_object() {
            return Some(v);
        }
    }

    if let Some(caps) = FENCE.captures(text) {
        if let Ok(v) = serde_json::from_str::<Value>(caps[1].trim()) {
            if v.is_array() || v.is_object() {
                return Some(v);
            }
        }
    }

    bracket_slice(text, '[', ']').or_else(|| bracket_slice(text, '{', '}'))
}

/// Like [`parse`], but only accepts an array. The consolidation path
/// requires an array of clusters; anything else counts as a parse failure.
pub fn parse_array(text: &str) -> Option<Vec<Value>> {
    match parse(text)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn bracket_slice(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
