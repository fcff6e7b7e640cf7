//! Tag sanitizing for indexed profiles.

use serde_json::Value;

/// Keep only string tags, at most `array_size` of them, each truncated to
/// `string_length` characters. Non-string entries do not count towards the limit.
pub fn filter_tags(tags: &Value, array_size: usize, string_length: usize) -> Vec<String> {
    let Some(entries) = tags.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_str)
        .take(array_size)
        .map(|tag| tag.chars().take(string_length).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_strings_are_dropped() {
        let tags = json!(["rust", 42, {"a": 1}, "search", null]);
        assert_eq!(filter_tags(&tags, 5, 80), vec!["rust", "search"]);
    }

    #[test]
    fn test_array_size_limit() {
        let tags = json!(["a", 1, "b", "c", "d"]);
        assert_eq!(filter_tags(&tags, 2, 80), vec!["a", "b"]);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let tags = json!(["日本語のタグ", "abcdef"]);
        assert_eq!(filter_tags(&tags, 5, 3), vec!["日本語", "abc"]);
    }

    #[test]
    fn test_missing_or_scalar_tags() {
        assert!(filter_tags(&Value::Null, 5, 80).is_empty());
        assert!(filter_tags(&json!("rust"), 5, 80).is_empty());
    }
}
