//! Error types for expression construction and evaluation.

use crate::reflect::PropertyAccessError;
use crate::value::ValueKind;
use std::fmt;

/// Errors that can occur while building or evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// A bound accessor failed for the current candidate
    PropertyAccess(PropertyAccessError),

    /// Identifier with no value in the evaluation context
    UnboundIdentifier { name: String },

    /// Invalid operand types for operator
    InvalidOperandTypes {
        operator: String,
        left_type: Option<ValueKind>,
        right_type: Option<ValueKind>,
    },

    /// Integer division or modulus by zero
    DivisionByZero,

    /// Node created with the wrong number of children
    ArityMismatch {
        node: String,
        expected: String,
        actual: usize,
    },

    /// Node used as a child of two parents
    NodeAlreadyAttached { node: String },

    /// Node that is neither the root nor attached to a parent
    DetachedNode { node: String },

    /// Tree nested deeper than the builder allows
    NestingTooDeep { limit: usize },

    /// LIKE pattern that could not be compiled
    InvalidPattern { pattern: String, message: String },

    /// Static kind check failed at bind time
    TypeMismatch {
        context: String,
        expected: String,
        actual: ValueKind,
    },

    /// Generic evaluation error
    EvaluationError { message: String },
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::PropertyAccess(err) => {
                write!(f, "Property access failed: {}", err)
            }

            ExpressionError::UnboundIdentifier { name } => {
                write!(f, "Identifier '{}' is not bound", name)
            }

            ExpressionError::InvalidOperandTypes {
                operator,
                left_type,
                right_type,
            } => {
                write!(
                    f,
                    "Invalid operand types for operator {}: left={:?}, right={:?}",
                    operator, left_type, right_type
                )
            }

            ExpressionError::DivisionByZero => write!(f, "Division by zero"),

            ExpressionError::ArityMismatch {
                node,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} expects {} operands, got {}",
                    node, expected, actual
                )
            }

            ExpressionError::NodeAlreadyAttached { node } => {
                write!(f, "Node {} already has a parent", node)
            }

            ExpressionError::DetachedNode { node } => {
                write!(f, "Node {} is not reachable from the root", node)
            }

            ExpressionError::NestingTooDeep { limit } => {
                write!(f, "Expression nested deeper than {} levels", limit)
            }

            ExpressionError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid LIKE pattern '{}': {}", pattern, message)
            }

            ExpressionError::TypeMismatch {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Type mismatch in {}: expected {}, got {}",
                    context, expected, actual
                )
            }

            ExpressionError::EvaluationError { message } => {
                write!(f, "Expression evaluation error: {}", message)
            }
        }
    }
}

impl std::error::Error for ExpressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExpressionError::PropertyAccess(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PropertyAccessError> for ExpressionError {
    fn from(err: PropertyAccessError) -> Self {
        ExpressionError::PropertyAccess(err)
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
