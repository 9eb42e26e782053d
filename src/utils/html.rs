// src/utils/html.rs

use crate::error::AppError;

/// Checks a user-supplied display name and returns it trimmed, otherwise as typed.
///
/// Names are shown on every visitor's leaderboard, so anything `ammonia` would
/// strip (tags, comments) is rejected rather than silently rewritten. Plain
/// characters such as `&` or a lone `<` pass through unchanged.
pub fn validate_display_name(input: &str) -> Result<String, AppError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest(
            "Display name must contain visible text.".to_string(),
        ));
    }

    // With no tags allowed, ammonia only escapes plain text. Any other
    // difference means markup was removed.
    let cleaned = ammonia::Builder::empty().clean(name).to_string();
    if cleaned != escape_text(name) {
        return Err(AppError::BadRequest(
            "Display name must not contain HTML markup.".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Escapes text the way html5ever serializes a text node.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
