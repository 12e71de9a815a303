//! Text processing utilities.

/// Minimum trimmed length below which a document body is considered empty.
pub const MIN_TEXT_LENGTH: usize = 10;

/// Marker appended to values cut short by truncation.
pub const ELLIPSIS: &str = "...";

/// Check if a body has enough text to be worth indexing.
pub fn has_meaningful_content(content: &str) -> bool {
    content.trim().chars().count() >= MIN_TEXT_LENGTH
}

/// Take at most `max_chars` characters, respecting char boundaries.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate to `max_chars` characters and append [`ELLIPSIS`] when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    format!("{}{}", prefix_chars(text, max_chars), ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_meaningful_content() {
        assert!(!has_meaningful_content(""));
        assert!(!has_meaningful_content("   \n\n   "));
        assert!(!has_meaningful_content("  short  "));
        assert!(has_meaningful_content("Garlic Bread $6"));
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("abcdef", 10), "abcdef");
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        // multi-byte characters are never split
        assert_eq!(truncate_with_ellipsis("crème brûlée", 4), "crèm...");
    }
}
