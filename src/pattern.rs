//! Glob-style name patterns
//!
//! Supports `*` (any run of characters) and `?` (exactly one character).
//! `*` and `*.*` both match every name, the way directory listings treat them.

use crate::error::{DirectoryError, Result};
use regex::{Regex, RegexBuilder};

/// Compiled leaf-name pattern
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Option<Regex>,
}

impl NamePattern {
    /// Pattern that matches every name
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            regex: None,
        }
    }

    /// Compile `pattern`; an empty pattern matches everything
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern == "*" || pattern == "*.*" {
            return Ok(Self::any());
        }
        if pattern.contains(['/', '\\']) {
            return Err(DirectoryError::invalid_path(
                pattern,
                "search pattern must not contain path separators",
            ));
        }

        let mut expression = String::with_capacity(pattern.len() + 8);
        expression.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expression.push_str(".*"),
                '?' => expression.push('.'),
                other => expression.push_str(&regex::escape(&other.to_string())),
            }
        }
        expression.push('$');

        let regex = RegexBuilder::new(&expression)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| DirectoryError::invalid_path(pattern, e.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(name),
            None => true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for NamePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        let pattern = NamePattern::new("*.jpg", false).unwrap();
        assert!(pattern.is_match("photo.jpg"));
        assert!(pattern.is_match("PHOTO.JPG"));
        assert!(!pattern.is_match("photo.jpeg"));
        assert!(!pattern.is_match("photo.jpg.bak"));

        let pattern = NamePattern::new("img-??", true).unwrap();
        assert!(pattern.is_match("img-01"));
        assert!(!pattern.is_match("IMG-01"));
        assert!(!pattern.is_match("img-1"));
    }

    #[test]
    fn test_match_all() {
        for p in ["", "*", "*.*"] {
            let pattern = NamePattern::new(p, false).unwrap();
            assert!(pattern.is_match("no-extension"));
            assert!(pattern.is_match("a.b"));
        }
    }

    #[test]
    fn test_regex_characters_are_literal() {
        let pattern = NamePattern::new("a+b(1).txt", false).unwrap();
        assert!(pattern.is_match("a+b(1).txt"));
        assert!(!pattern.is_match("aab1.txt"));
    }

    #[test]
    fn test_separator_rejected() {
        assert!(NamePattern::new("a/*", false).is_err());
    }
}
