//! LIKE pattern matching.
//!
//! `%` matches any run of characters, `_` matches exactly one. Everything
//! else is literal. Matching is case-insensitive and anchored to the full
//! value; non-text cells never match.

use regex::{Regex, RegexBuilder};

use crate::value::Value;

#[derive(Debug, Clone)]
pub struct LikeMatcher {
    re: Regex,
}

impl LikeMatcher {
    /// Compile a LIKE pattern. Returns None if the translated regex fails
    /// to compile; callers treat that as a pattern that matches nothing.
    pub fn new(pattern: &str) -> Option<Self> {
        let mut source = String::with_capacity(pattern.len() + 2);
        source.push('^');
        for ch in pattern.chars() {
            match ch {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');

        RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .ok()
            .map(|re| Self { re })
    }

    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Text(s) => self.re.is_match(s),
            _ => false,
        }
    }
}
