//! Predicate parsing error types.

use crate::expression::ExpressionError;
use thiserror::Error;

/// Errors that can occur while parsing a predicate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("ESCAPE must be a single character, got '{0}'")]
    InvalidEscape(String),

    #[error("Illegal character '{character}' at offset {offset}")]
    IllegalCharacter { character: char, offset: usize },

    #[error("Unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("Predicate nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("Invalid expression: {0}")]
    Expression(#[from] ExpressionError),
}

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
