//! Search tag model used for metadata filtering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TagError;

/// Key-value pair for filtering chunks in the vector store.
///
/// Tags follow the format `key:value`, for example `cuisine:italian`
/// or `diet:gluten_free`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// Create a new tag with the given key and value.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidKey` if the key is invalid.
    /// Returns `TagError::InvalidValue` if the value is invalid.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, TagError> {
        let key = key.into();
        let value = value.into();

        Self::validate_key(&key)?;
        Self::validate_value(&value)?;

        Ok(Self { key, value })
    }

    /// Build a tag from free text, lowercasing the value and folding
    /// anything outside the allowed alphabet into underscores.
    ///
    /// # Errors
    ///
    /// Fails when nothing usable is left of the value or the key is invalid.
    pub fn sanitized(key: &str, raw_value: &str) -> Result<Self, TagError> {
        let mut value = String::with_capacity(raw_value.len());
        for c in raw_value.trim().to_lowercase().chars() {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                value.push(c);
            } else if !value.ends_with('_') {
                value.push('_');
            }
        }
        let value: String = value.trim_matches('_').chars().take(100).collect();
        Self::new(key, value)
    }

    /// Keys must be 1-50 characters, alphanumeric with underscore/hyphen.
    fn validate_key(key: &str) -> Result<(), TagError> {
        if key.is_empty() {
            return Err(TagError::InvalidKey("key cannot be empty".to_string()));
        }
        if key.len() > 50 {
            return Err(TagError::InvalidKey(
                "key cannot exceed 50 characters".to_string(),
            ));
        }
        if !key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(TagError::InvalidKey(
                "key must be alphanumeric with underscore or hyphen".to_string(),
            ));
        }
        Ok(())
    }

    /// Values must be 1-100 characters, alphanumeric with underscore/hyphen/dot.
    fn validate_value(value: &str) -> Result<(), TagError> {
        if value.is_empty() {
            return Err(TagError::InvalidValue("value cannot be empty".to_string()));
        }
        if value.chars().count() > 100 {
            return Err(TagError::InvalidValue(
                "value cannot exceed 100 characters".to_string(),
            ));
        }
        if !value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(TagError::InvalidValue(
                "value must be alphanumeric with underscore, hyphen, or dot".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

impl FromStr for Tag {
    type Err = TagError;

    /// Parse a tag from the string format "key:value".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = s.split_once(':') else {
            return Err(TagError::ParseError(format!(
                "invalid tag format '{s}', expected 'key:value'"
            )));
        };
        Tag::new(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        let tag = Tag::new("cuisine", "italian").unwrap();
        assert_eq!(tag.to_string(), "cuisine:italian");
    }

    #[test]
    fn test_tag_parse() {
        let tag: Tag = "price:moderate".parse().unwrap();
        assert_eq!(tag.key, "price");
        assert_eq!(tag.value, "moderate");
    }

    #[test]
    fn test_tag_invalid_format() {
        assert!("invalid".parse::<Tag>().is_err());
        assert!(Tag::new("", "value").is_err());
    }

    #[test]
    fn test_sanitized_folds_free_text() {
        let tag = Tag::sanitized("restaurant", "Joe's  Diner & Grill").unwrap();
        assert_eq!(tag.value, "joe_s_diner_grill");

        let tag = Tag::sanitized("section", "MAIN COURSES").unwrap();
        assert_eq!(tag.to_string(), "section:main_courses");
    }

    #[test]
    fn test_sanitized_rejects_empty() {
        assert!(Tag::sanitized("restaurant", " &&& ").is_err());
    }
}
