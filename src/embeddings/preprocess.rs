//! Input preparation for embedding generation.
//!
//! 1. Replace line breaks with spaces
//! 2. Trim whitespace
//! 3. Skip if empty
//! 4. Truncate to max length with ellipsis

/// Maximum input length for embedding requests (characters, not tokens)
const MAX_INPUT_CHARS: usize = 8000;

/// Ellipsis suffix when content is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Prepares note content for an embedding request.
///
/// Returns `None` if nothing but whitespace is left.
pub fn preprocess_content(content: &str) -> Option<String> {
    let flattened = content.replace(['\r', '\n'], " ");
    let trimmed = flattened.trim();

    if trimmed.is_empty() {
        return None;
    }

    Some(truncate_content(trimmed))
}

/// Truncate content to MAX_INPUT_CHARS, adding ellipsis if truncated.
fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_INPUT_CHARS {
        return content.to_string();
    }

    let max_chars = MAX_INPUT_CHARS - TRUNCATION_SUFFIX.len();
    let truncated: String = content.chars().take(max_chars).collect();

    format!("{}{}", truncated, TRUNCATION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_returns_none() {
        assert!(preprocess_content("").is_none());
        assert!(preprocess_content("   ").is_none());
        assert!(preprocess_content("\n\t \r\n").is_none());
    }

    #[test]
    fn test_newlines_become_spaces() {
        let result = preprocess_content("first line\nsecond line\r\nthird");
        assert_eq!(result, Some("first line second line  third".to_string()));
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(preprocess_content("  idea  "), Some("idea".to_string()));
    }

    #[test]
    fn test_truncation_counts_chars() {
        let long_content = "想".repeat(MAX_INPUT_CHARS + 10);
        let content = preprocess_content(&long_content).unwrap();

        assert_eq!(content.chars().count(), MAX_INPUT_CHARS);
        assert!(content.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_no_truncation_for_short_content() {
        let short = "a short thought";
        assert_eq!(preprocess_content(short), Some(short.to_string()));
    }
}
