//! Operator definitions for expressions.

use crate::expression::{ExpressionError, ExpressionResult};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOperator {
    /// Check whether an ordering between two operands satisfies this operator
    pub fn test(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Ne => ordering != Ordering::Equal,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Le => ordering != Ordering::Greater,
            ComparisonOperator::Ge => ordering != Ordering::Less,
        }
    }

    /// Compare two booleans. Only equality is defined; ordering operators
    /// yield false.
    pub fn test_booleans(&self, left: bool, right: bool) -> bool {
        match self {
            ComparisonOperator::Eq => left == right,
            ComparisonOperator::Ne => left != right,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "<>",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Ge => ">=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

impl ArithmeticOperator {
    /// Apply to two integers. Overflow wraps; division and modulus by zero fail.
    pub fn apply_i64(&self, left: i64, right: i64) -> ExpressionResult<i64> {
        match self {
            ArithmeticOperator::Add => Ok(left.wrapping_add(right)),
            ArithmeticOperator::Subtract => Ok(left.wrapping_sub(right)),
            ArithmeticOperator::Multiply => Ok(left.wrapping_mul(right)),
            ArithmeticOperator::Divide if right == 0 => Err(ExpressionError::DivisionByZero),
            ArithmeticOperator::Divide => Ok(left.wrapping_div(right)),
            ArithmeticOperator::Modulus if right == 0 => Err(ExpressionError::DivisionByZero),
            ArithmeticOperator::Modulus => Ok(left.wrapping_rem(right)),
        }
    }

    /// Apply to two floats with IEEE-754 semantics
    pub fn apply_f64(&self, left: f64, right: f64) -> f64 {
        match self {
            ArithmeticOperator::Add => left + right,
            ArithmeticOperator::Subtract => left - right,
            ArithmeticOperator::Multiply => left * right,
            ArithmeticOperator::Divide => left / right,
            ArithmeticOperator::Modulus => left % right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulus => "%",
        }
    }
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of children a node kind takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Leaf,
    Unary,
    Binary,
    Ternary,
    /// One or more
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Leaf => count == 0,
            Arity::Unary => count == 1,
            Arity::Binary => count == 2,
            Arity::Ternary => count == 3,
            Arity::Variadic => count >= 1,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Arity::Leaf => "0",
            Arity::Unary => "1",
            Arity::Binary => "2",
            Arity::Ternary => "3",
            Arity::Variadic => "at least 1",
        }
    }
}
