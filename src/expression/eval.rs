//! Expression evaluation with SQL three-valued logic.
//!
//! Unknown is represented by [`Value::Null`]. Boolean operators propagate
//! it per SQL rules; comparisons, BETWEEN, IN, LIKE and arithmetic yield
//! unknown whenever an operand they need is unknown.

use crate::expression::context::EvaluationContext;
use crate::expression::expr::{Expression, NodeId, NodeKind};
use crate::expression::operator::{ArithmeticOperator, ComparisonOperator};
use crate::expression::pattern::LikePattern;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::value::{Numeric, Promoted, Value};

/// Evaluator for expressions against one context
pub struct ExpressionEvaluator<'a> {
    context: &'a dyn EvaluationContext,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(context: &'a dyn EvaluationContext) -> Self {
        Self { context }
    }

    /// Evaluate the whole tree
    pub fn evaluate(&self, expr: &Expression) -> ExpressionResult<Value> {
        self.evaluate_node(expr, expr.root())
    }

    /// Evaluate the subtree rooted at `id`
    pub fn evaluate_node(&self, expr: &Expression, id: NodeId) -> ExpressionResult<Value> {
        let node = expr.node(id);
        let children = node.children();

        match node.kind() {
            NodeKind::Identifier(identifier) => self.context.value(identifier),

            NodeKind::BooleanLiteral(b) => Ok(Value::Boolean(*b)),
            NodeKind::NumericLiteral(Numeric::Integer(i)) => Ok(Value::Integer(*i)),
            NodeKind::NumericLiteral(Numeric::Float(f)) => Ok(Value::Float(*f)),
            NodeKind::StringLiteral(s) => Ok(Value::String(s.clone())),
            NodeKind::PatternLiteral(p) => Ok(Value::Pattern(p.clone())),

            NodeKind::And => self.chain(expr, id, "AND", ternary_and),
            NodeKind::Or => self.chain(expr, id, "OR", ternary_or),

            NodeKind::Not => {
                let operand = truth("NOT", self.evaluate_node(expr, children[0])?)?;
                Ok(Value::from(ternary_not(operand)))
            }

            NodeKind::Null => Ok(Value::Boolean(self.evaluate_node(expr, children[0])?.is_null())),

            NodeKind::Any => self.any(expr, children),
            NodeKind::Between => self.between(expr, children),
            NodeKind::In => self.in_list(expr, children),
            NodeKind::Like => self.like(expr, children),

            NodeKind::Comparison(op) => match self.operands(expr, children)? {
                Some((left, right)) => Ok(Value::Boolean(compare_values(*op, &left, &right))),
                None => Ok(Value::Null),
            },

            NodeKind::Arithmetic(op) => match self.operands(expr, children)? {
                Some((left, right)) => arithmetic(*op, &left, &right),
                None => Ok(Value::Null),
            },

            NodeKind::Negate => negate(self.evaluate_node(expr, children[0])?),
        }
    }

    /// Fold a run of the same AND or OR, left to right, without recursing
    /// down its spine
    fn chain(
        &self,
        expr: &Expression,
        id: NodeId,
        operator: &str,
        combine: fn(Option<bool>, Option<bool>) -> Option<bool>,
    ) -> ExpressionResult<Value> {
        let mut operands = expr.chain_operands(id).into_iter();
        let mut acc = match operands.next() {
            Some(first) => truth(operator, self.evaluate_node(expr, first)?)?,
            None => None,
        };
        for operand in operands {
            let value = truth(operator, self.evaluate_node(expr, operand)?)?;
            acc = combine(acc, value);
        }
        Ok(Value::from(acc))
    }

    /// Both operands of a binary node, or `None` as soon as one is unknown
    fn operands(
        &self,
        expr: &Expression,
        children: &[NodeId],
    ) -> ExpressionResult<Option<(Value, Value)>> {
        let left = self.evaluate_node(expr, children[0])?;
        if left.is_null() {
            return Ok(None);
        }
        let right = self.evaluate_node(expr, children[1])?;
        if right.is_null() {
            return Ok(None);
        }
        Ok(Some((left, right)))
    }

    fn any(&self, expr: &Expression, children: &[NodeId]) -> ExpressionResult<Value> {
        let mut known = false;
        for child in children {
            match truth("ANY", self.evaluate_node(expr, *child)?)? {
                Some(true) => return Ok(Value::Boolean(true)),
                Some(false) => known = true,
                None => {}
            }
        }
        Ok(if known {
            Value::Boolean(false)
        } else {
            Value::Null
        })
    }

    fn between(&self, expr: &Expression, children: &[NodeId]) -> ExpressionResult<Value> {
        let mut values = Vec::with_capacity(3);
        for child in children {
            let value = self.evaluate_node(expr, *child)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            values.push(value);
        }
        between(&values[0], &values[1], &values[2]).map(Value::Boolean)
    }

    fn in_list(&self, expr: &Expression, children: &[NodeId]) -> ExpressionResult<Value> {
        let value = self.evaluate_node(expr, children[0])?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mut saw_unknown = false;
        for child in &children[1..] {
            let item = self.evaluate_node(expr, *child)?;
            if item.is_null() {
                saw_unknown = true;
            } else if compare_values(ComparisonOperator::Eq, &value, &item) {
                return Ok(Value::Boolean(true));
            }
        }
        Ok(if saw_unknown {
            Value::Null
        } else {
            Value::Boolean(false)
        })
    }

    fn like(&self, expr: &Expression, children: &[NodeId]) -> ExpressionResult<Value> {
        let subject = self.evaluate_node(expr, children[0])?;
        let pattern = self.evaluate_node(expr, children[1])?;
        if subject.is_null() || pattern.is_null() {
            return Ok(Value::Null);
        }
        like(&subject, &pattern).map(Value::Boolean)
    }
}

impl Expression {
    /// Evaluate this tree against a context
    pub fn evaluate(&self, context: &dyn EvaluationContext) -> ExpressionResult<Value> {
        ExpressionEvaluator::new(context).evaluate(self)
    }
}

/// Helper function to evaluate an expression against a context
pub fn evaluate_expression(
    expr: &Expression,
    context: &dyn EvaluationContext,
) -> ExpressionResult<Value> {
    ExpressionEvaluator::new(context).evaluate(expr)
}

/// Root-level selection: only a literal `true` selects a candidate;
/// `false` and unknown both exclude it.
pub fn is_selected(value: &Value) -> bool {
    matches!(value, Value::Boolean(true))
}

/// SQL AND over unknown-or-boolean operands
pub fn ternary_and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

/// SQL OR over unknown-or-boolean operands
pub fn ternary_or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

pub fn ternary_not(operand: Option<bool>) -> Option<bool> {
    operand.map(|b| !b)
}

/// Compare two non-null values.
///
/// Strings compare lexicographically and numbers after promotion. Booleans
/// only support equality; any other combination is simply false.
pub fn compare_values(op: ComparisonOperator, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => op.test(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => op.test_booleans(*a, *b),
        _ => match (left.as_numeric(), right.as_numeric()) {
            (Some(a), Some(b)) => compare_numbers(op, Promoted::new(a, b)),
            _ => false,
        },
    }
}

fn compare_numbers(op: ComparisonOperator, operands: Promoted) -> bool {
    match operands.ordering() {
        Some(ordering) => op.test(ordering),
        // unordered (NaN) only satisfies <>
        None => op == ComparisonOperator::Ne,
    }
}

/// Unknown-or-boolean view of an operand of a logical operator
fn truth(operator: &str, value: Value) -> ExpressionResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(b)),
        other => Err(ExpressionError::InvalidOperandTypes {
            operator: operator.to_string(),
            left_type: other.kind(),
            right_type: None,
        }),
    }
}

/// Inclusive range check over non-null operands
fn between(value: &Value, low: &Value, high: &Value) -> ExpressionResult<bool> {
    match (value.as_numeric(), low.as_numeric(), high.as_numeric()) {
        (Some(Numeric::Integer(v)), Some(Numeric::Integer(l)), Some(Numeric::Integer(h))) => {
            Ok(l <= v && v <= h)
        }
        (Some(v), Some(l), Some(h)) => {
            let (v, l, h) = (v.as_f64(), l.as_f64(), h.as_f64());
            Ok(l <= v && v <= h)
        }
        _ => match (value, low, high) {
            (Value::String(v), Value::String(l), Value::String(h)) => Ok(l <= v && v <= h),
            _ => Err(ExpressionError::InvalidOperandTypes {
                operator: "BETWEEN".to_string(),
                left_type: value.kind(),
                right_type: if low.kind() != value.kind() {
                    low.kind()
                } else {
                    high.kind()
                },
            }),
        },
    }
}

/// Match a string against a compiled pattern, or against a string compiled
/// on the spot with no escape character.
fn like(subject: &Value, pattern: &Value) -> ExpressionResult<bool> {
    let invalid = || ExpressionError::InvalidOperandTypes {
        operator: "LIKE".to_string(),
        left_type: subject.kind(),
        right_type: pattern.kind(),
    };
    let text = subject.as_str().ok_or_else(invalid)?;
    match pattern {
        Value::Pattern(compiled) => Ok(compiled.matches(text)),
        Value::String(source) => Ok(LikePattern::compile(source, None)?.matches(text)),
        _ => Err(invalid()),
    }
}

fn negate(operand: Value) -> ExpressionResult<Value> {
    match operand {
        Value::Null => Ok(Value::Null),
        Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(ExpressionError::InvalidOperandTypes {
            operator: "-".to_string(),
            left_type: other.kind(),
            right_type: None,
        }),
    }
}

fn arithmetic(op: ArithmeticOperator, left: &Value, right: &Value) -> ExpressionResult<Value> {
    match (left.as_numeric(), right.as_numeric()) {
        (Some(a), Some(b)) => match Promoted::new(a, b) {
            Promoted::Integers(a, b) => op.apply_i64(a, b).map(Value::Integer),
            Promoted::Floats(a, b) => Ok(Value::Float(op.apply_f64(a, b))),
        },
        _ => Err(ExpressionError::InvalidOperandTypes {
            operator: op.as_str().to_string(),
            left_type: left.kind(),
            right_type: right.kind(),
        }),
    }
}
