//! Static kind checking for expressions.
//!
//! Run once at bind time with the declared return kinds of the bound
//! getters, so trees that would fail for every non-null candidate are
//! rejected before any evaluation. A kind of `None` means "not known
//! statically" and is always accepted.

use crate::expression::expr::{Expression, Identifier, NodeId, NodeKind};
use crate::expression::{ExpressionError, ExpressionResult};
use crate::value::{Numeric, ValueKind};
use std::collections::BTreeMap;

/// Type checker for expressions
pub struct TypeChecker<'a> {
    /// Declared kinds of the identifiers
    schema: &'a BTreeMap<Identifier, ValueKind>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(schema: &'a BTreeMap<Identifier, ValueKind>) -> Self {
        Self { schema }
    }

    /// Type check an expression and return the kind of its root
    pub fn check(&self, expr: &Expression) -> ExpressionResult<Option<ValueKind>> {
        self.check_node(expr, expr.root())
    }

    /// Check that an expression can be used as a selection predicate
    pub fn check_predicate(&self, expr: &Expression) -> ExpressionResult<()> {
        match self.check(expr)? {
            Some(ValueKind::Boolean) | None => Ok(()),
            Some(other) => Err(ExpressionError::TypeMismatch {
                context: "predicate".to_string(),
                expected: "boolean".to_string(),
                actual: other,
            }),
        }
    }

    fn check_node(&self, expr: &Expression, id: NodeId) -> ExpressionResult<Option<ValueKind>> {
        let node = expr.node(id);
        // a whole AND/OR run is checked as one flat node
        let operands = match node.kind() {
            NodeKind::And | NodeKind::Or => expr.chain_operands(id),
            _ => node.children().to_vec(),
        };
        let kinds = operands
            .iter()
            .map(|child| self.check_node(expr, *child))
            .collect::<ExpressionResult<Vec<_>>>()?;
        let name = node.kind().name();

        match node.kind() {
            NodeKind::Identifier(identifier) => Ok(self.schema.get(identifier).copied()),
            NodeKind::BooleanLiteral(_) => Ok(Some(ValueKind::Boolean)),
            NodeKind::NumericLiteral(Numeric::Integer(_)) => Ok(Some(ValueKind::Integer)),
            NodeKind::NumericLiteral(Numeric::Float(_)) => Ok(Some(ValueKind::Float)),
            NodeKind::StringLiteral(_) => Ok(Some(ValueKind::String)),
            NodeKind::PatternLiteral(_) => Ok(Some(ValueKind::Pattern)),

            NodeKind::And | NodeKind::Or | NodeKind::Not | NodeKind::Any => {
                for kind in kinds {
                    expect(name, kind, "boolean", |k| k == ValueKind::Boolean)?;
                }
                Ok(Some(ValueKind::Boolean))
            }

            NodeKind::Null | NodeKind::In | NodeKind::Comparison(_) => {
                Ok(Some(ValueKind::Boolean))
            }

            NodeKind::Between => {
                let known: Vec<ValueKind> = kinds.into_iter().flatten().collect();
                let numeric = known.iter().all(ValueKind::is_numeric);
                let strings = known.iter().all(|k| *k == ValueKind::String);
                if !numeric && !strings {
                    let actual = known
                        .iter()
                        .copied()
                        .find(|k| !k.is_numeric())
                        .unwrap_or(ValueKind::String);
                    return Err(ExpressionError::TypeMismatch {
                        context: name.to_string(),
                        expected: "all numeric or all string operands".to_string(),
                        actual,
                    });
                }
                Ok(Some(ValueKind::Boolean))
            }

            NodeKind::Like => {
                expect(name, kinds[0], "string", |k| k == ValueKind::String)?;
                expect(name, kinds[1], "string or pattern", |k| {
                    matches!(k, ValueKind::String | ValueKind::Pattern)
                })?;
                Ok(Some(ValueKind::Boolean))
            }

            NodeKind::Arithmetic(_) => {
                for kind in &kinds {
                    expect(name, *kind, "numeric", |k| k.is_numeric())?;
                }
                Ok(match (kinds[0], kinds[1]) {
                    (Some(ValueKind::Integer), Some(ValueKind::Integer)) => Some(ValueKind::Integer),
                    (Some(ValueKind::Float), _) | (_, Some(ValueKind::Float)) => {
                        Some(ValueKind::Float)
                    }
                    _ => None,
                })
            }

            NodeKind::Negate => {
                expect(name, kinds[0], "numeric", |k| k.is_numeric())?;
                Ok(kinds[0])
            }
        }
    }
}

fn expect(
    context: &str,
    kind: Option<ValueKind>,
    expected: &str,
    accepts: impl Fn(ValueKind) -> bool,
) -> ExpressionResult<()> {
    match kind {
        Some(actual) if !accepts(actual) => Err(ExpressionError::TypeMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual,
        }),
        _ => Ok(()),
    }
}

/// Helper function to type check an expression
pub fn type_check_expression(
    expr: &Expression,
    schema: &BTreeMap<Identifier, ValueKind>,
) -> ExpressionResult<Option<ValueKind>> {
    TypeChecker::new(schema).check(expr)
}

/// Helper function to validate a selection predicate
pub fn validate_predicate(
    expr: &Expression,
    schema: &BTreeMap<Identifier, ValueKind>,
) -> ExpressionResult<()> {
    TypeChecker::new(schema).check_predicate(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::expr::ExpressionBuilder;
    use crate::expression::operator::{ArithmeticOperator, ComparisonOperator};

    fn schema() -> BTreeMap<Identifier, ValueKind> {
        [
            ("age", ValueKind::Integer),
            ("salary", ValueKind::Float),
            ("name", ValueKind::String),
            ("retired", ValueKind::Boolean),
        ]
        .into_iter()
        .map(|(name, kind)| (Identifier::new(name), kind))
        .collect()
    }

    fn check<F>(build: F) -> ExpressionResult<Option<ValueKind>>
    where
        F: FnOnce(&mut ExpressionBuilder) -> ExpressionResult<NodeId>,
    {
        let mut builder = ExpressionBuilder::new();
        let root = build(&mut builder)?;
        let expr = builder.build(root)?;
        type_check_expression(&expr, &schema())
    }

    #[test]
    fn test_leaf_kinds() {
        assert_eq!(check(|b| Ok(b.identifier("age"))), Ok(Some(ValueKind::Integer)));
        assert_eq!(check(|b| Ok(b.identifier("other"))), Ok(None));
        assert_eq!(check(|b| Ok(b.float(1.0))), Ok(Some(ValueKind::Float)));
    }

    #[test]
    fn test_logical_operands() {
        let ok = check(|b| {
            let r = b.identifier("retired");
            let u = b.identifier("other");
            b.and(r, u)
        });
        assert_eq!(ok, Ok(Some(ValueKind::Boolean)));

        let err = check(|b| {
            let r = b.identifier("retired");
            let n = b.identifier("name");
            b.or(r, n)
        });
        assert_eq!(
            err,
            Err(ExpressionError::TypeMismatch {
                context: "OR".to_string(),
                expected: "boolean".to_string(),
                actual: ValueKind::String,
            })
        );
    }

    #[test]
    fn test_long_and_chain() {
        let build = |last: &str| {
            let last = last.to_string();
            check(move |b| {
                let mut root = b.identifier("retired");
                for _ in 0..2000 {
                    let next = b.identifier("retired");
                    root = b.and(root, next)?;
                }
                let tail = b.identifier(&last);
                b.and(root, tail)
            })
        };
        assert_eq!(build("other"), Ok(Some(ValueKind::Boolean)));
        assert!(matches!(
            build("age"),
            Err(ExpressionError::TypeMismatch {
                actual: ValueKind::Integer,
                ..
            })
        ));
    }

    #[test]
    fn test_arithmetic_kinds() {
        let promoted = check(|b| {
            let a = b.identifier("age");
            let s = b.identifier("salary");
            b.arithmetic(ArithmeticOperator::Multiply, a, s)
        });
        assert_eq!(promoted, Ok(Some(ValueKind::Float)));

        let integers = check(|b| {
            let a = b.identifier("age");
            let one = b.integer(1);
            b.arithmetic(ArithmeticOperator::Add, a, one)
        });
        assert_eq!(integers, Ok(Some(ValueKind::Integer)));

        let unknown = check(|b| {
            let a = b.identifier("age");
            let o = b.identifier("other");
            b.arithmetic(ArithmeticOperator::Add, a, o)
        });
        assert_eq!(unknown, Ok(None));

        let err = check(|b| {
            let n = b.identifier("name");
            b.negate(n)
        });
        assert!(matches!(err, Err(ExpressionError::TypeMismatch { .. })));
    }

    #[test]
    fn test_between_operands() {
        let mixed = check(|b| {
            let n = b.identifier("name");
            let l = b.integer(1);
            let h = b.integer(2);
            b.between(n, l, h)
        });
        assert!(matches!(mixed, Err(ExpressionError::TypeMismatch { .. })));

        let numbers = check(|b| {
            let a = b.identifier("age");
            let l = b.float(1.5);
            let h = b.identifier("other");
            b.between(a, l, h)
        });
        assert_eq!(numbers, Ok(Some(ValueKind::Boolean)));
    }

    #[test]
    fn test_like_subject() {
        let err = check(|b| {
            let a = b.identifier("age");
            let p = b.string("5%");
            b.like(a, p)
        });
        assert!(matches!(err, Err(ExpressionError::TypeMismatch { .. })));
    }

    #[test]
    fn test_predicate_root() {
        let mut builder = ExpressionBuilder::new();
        let a = builder.identifier("age");
        let one = builder.integer(1);
        let root = builder
            .arithmetic(ArithmeticOperator::Add, a, one)
            .unwrap();
        let expr = builder.build(root).unwrap();
        assert!(validate_predicate(&expr, &schema()).is_err());

        let mut builder = ExpressionBuilder::new();
        let a = builder.identifier("age");
        let fifty = builder.integer(50);
        let root = builder
            .compare(ComparisonOperator::Ge, a, fifty)
            .unwrap();
        let expr = builder.build(root).unwrap();
        assert!(validate_predicate(&expr, &schema()).is_ok());
    }
}
