//! SQL LIKE pattern compilation.

use crate::expression::{ExpressionError, ExpressionResult};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Characters with a meaning in regex syntax; they are always emitted hex-escaped.
const REGEX_CONTROL_CHARS: &[char] = &[
    '.', '\\', '[', ']', '^', '$', '?', '*', '+', '{', '}', '|', '(', ')', ':', '&', '<', '>', '=',
    '!',
];

/// A LIKE pattern compiled to an anchored regular expression
#[derive(Clone)]
pub struct LikePattern {
    like: String,
    escape: Option<char>,
    regex: Regex,
}

impl LikePattern {
    /// Compile a LIKE pattern with an optional escape character
    pub fn compile(like: &str, escape: Option<char>) -> ExpressionResult<Self> {
        let source = like_to_regex(like, escape);
        let regex = RegexBuilder::new(&source)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| ExpressionError::InvalidPattern {
                pattern: like.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            like: like.to_string(),
            escape,
            regex,
        })
    }

    /// Check if the whole input matches the pattern
    pub fn matches(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    pub fn like(&self) -> &str {
        &self.like
    }

    pub fn escape(&self) -> Option<char> {
        self.escape
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.like == other.like && self.escape == other.escape
    }
}

impl fmt::Debug for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LikePattern")
            .field("like", &self.like)
            .field("escape", &self.escape)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// Translate a LIKE pattern into regex source anchored at both ends.
///
/// `%` becomes a lazy `.*?`, `_` becomes `.`, and the escape character emits
/// the following character literally. A trailing escape character with
/// nothing after it ends the translation.
pub fn like_to_regex(like: &str, escape: Option<char>) -> String {
    let mut regex = String::with_capacity(like.len() * 2 + 4);
    regex.push_str("\\A");

    let mut chars = like.chars();
    while let Some(c) = chars.next() {
        if escape == Some(c) {
            match chars.next() {
                Some(escaped) => push_hex_escaped(&mut regex, escaped),
                None => break,
            }
        } else if c == '%' {
            regex.push_str(".*?");
        } else if c == '_' {
            regex.push('.');
        } else if REGEX_CONTROL_CHARS.contains(&c) {
            push_hex_escaped(&mut regex, c);
        } else {
            regex.push(c);
        }
    }

    regex.push_str("\\z");
    regex
}

fn push_hex_escaped(regex: &mut String, c: char) {
    regex.push_str(&format!("\\x{{{:x}}}", c as u32));
}
