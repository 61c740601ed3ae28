//! Predicate expressions and their evaluation.
//!
//! This module provides:
//! - The arena-backed expression tree and its builder
//! - LIKE pattern compilation
//! - Evaluation contexts backed by bound property getters
//! - Three-valued evaluation and bind-time kind checking

pub mod context;
pub mod error;
pub mod eval;
pub mod expr;
pub mod operator;
pub mod pattern;
pub mod type_checker;

pub use context::{CandidateContext, EvaluationContext, MapContext};
pub use error::{ExpressionError, ExpressionResult};
pub use eval::{
    compare_values, evaluate_expression, is_selected, ternary_and, ternary_not, ternary_or,
    ExpressionEvaluator,
};
pub use expr::{
    Expression, ExpressionBuilder, Identifier, Node, NodeId, NodeKind, MAX_NESTING_DEPTH,
};
pub use operator::{ArithmeticOperator, Arity, ComparisonOperator};
pub use pattern::{like_to_regex, LikePattern};
pub use type_checker::{type_check_expression, validate_predicate, TypeChecker};
