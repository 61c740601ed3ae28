//! Identifier lookup during evaluation.

use crate::expression::expr::Identifier;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::reflect::Getter;
use crate::value::Value;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};

/// Supplies identifier values to the evaluator
pub trait EvaluationContext {
    fn value(&self, identifier: &Identifier) -> ExpressionResult<Value>;
}

/// Context for one candidate object, reading through the getters bound
/// for its type. Built fresh for every candidate.
pub struct CandidateContext<'a> {
    candidate: &'a dyn Any,
    accessors: &'a BTreeMap<Identifier, Getter>,
}

impl<'a> CandidateContext<'a> {
    pub fn new(candidate: &'a dyn Any, accessors: &'a BTreeMap<Identifier, Getter>) -> Self {
        Self {
            candidate,
            accessors,
        }
    }
}

impl EvaluationContext for CandidateContext<'_> {
    fn value(&self, identifier: &Identifier) -> ExpressionResult<Value> {
        let getter =
            self.accessors
                .get(identifier)
                .ok_or_else(|| ExpressionError::UnboundIdentifier {
                    name: identifier.name().to_string(),
                })?;
        Ok(getter.get(self.candidate)?)
    }
}

/// Context backed by a plain map of values, for evaluating trees without a
/// target object.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    values: HashMap<Identifier, Value>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(Identifier::new(name), value.into());
    }
}

impl EvaluationContext for MapContext {
    fn value(&self, identifier: &Identifier) -> ExpressionResult<Value> {
        self.values
            .get(identifier)
            .cloned()
            .ok_or_else(|| ExpressionError::UnboundIdentifier {
                name: identifier.name().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{AttributeResolver, PropertyAccessError, Reflect, TypeInfo};
    use std::sync::Arc;

    struct Gauge {
        level: i64,
    }

    impl Reflect for Gauge {
        fn type_info() -> Arc<TypeInfo> {
            TypeInfo::class::<Gauge>("Gauge")
                .getter("getLevel", |g: &Gauge| g.level)
                .try_getter("getRatio", |g: &Gauge| {
                    if g.level == 0 {
                        Err("empty gauge".to_string())
                    } else {
                        Ok(100 / g.level)
                    }
                })
                .build()
        }
    }

    fn accessors() -> BTreeMap<Identifier, Getter> {
        let resolver = AttributeResolver::new();
        let info = Gauge::type_info();
        ["level", "ratio"]
            .iter()
            .map(|name| {
                (
                    Identifier::new(name),
                    resolver.getter(&info, name).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_candidate_context() {
        let accessors = accessors();
        let gauge = Gauge { level: 4 };
        let context = CandidateContext::new(&gauge, &accessors);
        assert_eq!(
            context.value(&Identifier::new("level")),
            Ok(Value::Integer(4))
        );
        assert_eq!(
            context.value(&Identifier::new("ratio")),
            Ok(Value::Integer(25))
        );
        assert_eq!(
            context.value(&Identifier::new("depth")),
            Err(ExpressionError::UnboundIdentifier {
                name: "depth".to_string()
            })
        );
    }

    #[test]
    fn test_accessor_failure_propagates() {
        let accessors = accessors();
        let gauge = Gauge { level: 0 };
        let context = CandidateContext::new(&gauge, &accessors);
        assert_eq!(
            context.value(&Identifier::new("ratio")),
            Err(ExpressionError::PropertyAccess(
                PropertyAccessError::GetterFailed {
                    type_name: "Gauge".to_string(),
                    property: "ratio".to_string(),
                    message: "empty gauge".to_string(),
                }
            ))
        );
    }

    #[test]
    fn test_map_context() {
        let context = MapContext::new().with("age", 54).with("name", "bob");
        assert_eq!(context.value(&Identifier::new("age")), Ok(Value::Integer(54)));
        assert!(context.value(&Identifier::new("salary")).is_err());
    }
}
