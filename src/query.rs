//! Binding predicates to a target type and running them over collections.
//!
//! A [`BoundQuery`] pairs an expression with one resolved [`Getter`] per
//! identifier. Binding happens once and fails fast; evaluation then only
//! reads properties. [`Query`] is the typed façade over a `BoundQuery` with
//! the selection loops.

use crate::expression::{
    validate_predicate, CandidateContext, Expression, ExpressionError, Identifier,
};
use crate::reflect::{AttributeResolver, Getter, PropertyNotFoundError, Reflect, TypeInfo};
use crate::sql::{parse_predicate, ParseError};
use crate::value::ValueKind;
use log::debug;
use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building or running a query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    PropertyNotFound(#[from] PropertyNotFoundError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] ExpressionError),

    /// Bind-time kind check rejected the predicate
    #[error("Type error: {0}")]
    Type(ExpressionError),

    #[error("Predicate produced a {0} value instead of a boolean")]
    NotPredicate(ValueKind),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// An expression bound to one target type
#[derive(Debug, Clone)]
pub struct BoundQuery {
    type_info: Arc<TypeInfo>,
    expression: Expression,
    accessors: BTreeMap<Identifier, Getter>,
}

impl BoundQuery {
    /// Bind using the process-wide resolver
    pub fn bind(type_info: Arc<TypeInfo>, expression: Expression) -> QueryResult<Self> {
        Self::bind_with(type_info, expression, AttributeResolver::global())
    }

    /// Resolve every identifier of `expression` against `type_info`, then
    /// check the tree against the declared kinds of the resolved getters.
    pub fn bind_with(
        type_info: Arc<TypeInfo>,
        expression: Expression,
        resolver: &AttributeResolver,
    ) -> QueryResult<Self> {
        let accessors = expression
            .identifiers()
            .iter()
            .map(|identifier| {
                resolver
                    .getter(&type_info, identifier.name())
                    .map(|getter| (identifier.clone(), getter))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let schema: BTreeMap<Identifier, ValueKind> = accessors
            .iter()
            .map(|(identifier, getter)| (identifier.clone(), getter.return_kind()))
            .collect();
        validate_predicate(&expression, &schema).map_err(QueryError::Type)?;

        debug!(
            "Bound {} identifier(s) of query {} to {}",
            accessors.len(),
            expression,
            type_info.name()
        );

        Ok(Self {
            type_info,
            expression,
            accessors,
        })
    }

    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.type_info
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// The resolved getters, keyed by identifier
    pub fn accessors(&self) -> &BTreeMap<Identifier, Getter> {
        &self.accessors
    }

    /// Evaluate against one candidate. `None` is SQL's unknown.
    pub fn evaluate(&self, candidate: &dyn Any) -> QueryResult<Option<bool>> {
        let context = CandidateContext::new(candidate, &self.accessors);
        let value = self.expression.evaluate(&context)?;
        match (value.as_bool(), value.kind()) {
            (Some(selected), _) => Ok(Some(selected)),
            (None, None) => Ok(None),
            (None, Some(kind)) => Err(QueryError::NotPredicate(kind)),
        }
    }

    /// Only a definite `true` selects a candidate
    pub fn matches(&self, candidate: &dyn Any) -> QueryResult<bool> {
        Ok(self.evaluate(candidate)? == Some(true))
    }
}

/// A query over objects of type `T`
pub struct Query<T> {
    bound: BoundQuery,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Reflect> Query<T> {
    /// Parse and bind `predicate` using the process-wide resolver
    pub fn new(predicate: &str) -> QueryResult<Self> {
        Self::with_resolver(predicate, AttributeResolver::global())
    }

    pub fn with_resolver(predicate: &str, resolver: &AttributeResolver) -> QueryResult<Self> {
        let expression = parse_predicate(predicate)?;
        Self::from_expression_with(expression, resolver)
    }

    /// Bind an already built expression
    pub fn from_expression(expression: Expression) -> QueryResult<Self> {
        Self::from_expression_with(expression, AttributeResolver::global())
    }

    pub fn from_expression_with(
        expression: Expression,
        resolver: &AttributeResolver,
    ) -> QueryResult<Self> {
        let bound = BoundQuery::bind_with(T::type_info(), expression, resolver)?;
        Ok(Self {
            bound,
            _marker: PhantomData,
        })
    }

    pub fn bound(&self) -> &BoundQuery {
        &self.bound
    }

    pub fn expression(&self) -> &Expression {
        self.bound.expression()
    }

    pub fn evaluate(&self, candidate: &T) -> QueryResult<Option<bool>> {
        self.bound.evaluate(candidate)
    }

    pub fn matches(&self, candidate: &T) -> QueryResult<bool> {
        self.bound.matches(candidate)
    }

    /// Collect the matching candidates in input order. The first evaluation
    /// failure aborts the whole selection.
    pub fn select<'a, I>(&self, candidates: I) -> QueryResult<Vec<&'a T>>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let mut selected = Vec::new();
        for candidate in candidates {
            if self.matches(candidate)? {
                selected.push(candidate);
            }
        }
        Ok(selected)
    }

    /// Run `action` on every matching candidate and return how many matched.
    /// All candidates are evaluated before any action runs, so a failure
    /// leaves every candidate untouched.
    pub fn apply<'a, I, F>(&self, candidates: I, mut action: F) -> QueryResult<usize>
    where
        I: IntoIterator<Item = &'a mut T>,
        F: FnMut(&mut T),
    {
        let mut matched = Vec::new();
        for candidate in candidates {
            if self.matches(candidate)? {
                matched.push(candidate);
            }
        }
        for candidate in matched.iter_mut() {
            action(candidate);
        }
        Ok(matched.len())
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            bound: self.bound.clone(),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::accessor_strategy;

    #[derive(Debug)]
    struct Reading {
        sensor: String,
        celsius: Option<f64>,
        faulty: bool,
    }

    impl Reflect for Reading {
        fn type_info() -> Arc<TypeInfo> {
            TypeInfo::class::<Reading>("Reading")
                .getter("getSensor", |r: &Reading| r.sensor.clone())
                .try_getter("getCelsius", |r: &Reading| {
                    if r.faulty {
                        Err("sensor offline".to_string())
                    } else {
                        Ok(r.celsius)
                    }
                })
                .field(
                    "celsius",
                    |r: &Reading| r.celsius,
                    |r: &mut Reading, celsius| r.celsius = celsius,
                )
                .build()
        }
    }

    fn reading(sensor: &str, celsius: Option<f64>) -> Reading {
        Reading {
            sensor: sensor.to_string(),
            celsius,
            faulty: false,
        }
    }

    fn readings() -> Vec<Reading> {
        vec![
            reading("north", Some(21.5)),
            reading("south", None),
            reading("east", Some(30.0)),
            reading("west", Some(12.0)),
        ]
    }

    #[test]
    fn test_bind_fails_fast_on_unknown_property() {
        let result = Query::<Reading>::new("humidity > 40 or sensor = 'north'");
        match result {
            Err(QueryError::PropertyNotFound(err)) => {
                assert_eq!(err.property, "humidity");
                assert_eq!(err.type_name, "Reading");
            }
            _ => panic!("expected PropertyNotFound"),
        }
    }

    #[test]
    fn test_bind_rejects_ill_typed_tree() {
        assert!(matches!(
            Query::<Reading>::new("sensor * 2 > 1"),
            Err(QueryError::Type(ExpressionError::TypeMismatch { .. }))
        ));
        let Err(err) = Query::<Reading>::new("celsius + 1") else {
            panic!("non-boolean predicate should not bind");
        };
        assert!(matches!(
            err,
            QueryError::Type(ExpressionError::TypeMismatch { .. })
        ));
        assert!(err.to_string().starts_with("Type error"));
        assert!(matches!(
            Query::<Reading>::new("celsius >"),
            Err(QueryError::Parse(_))
        ));
    }

    #[test]
    fn test_ternary_result() {
        let query = Query::<Reading>::new("celsius > 20").unwrap();
        assert_eq!(query.evaluate(&reading("a", Some(25.0))).unwrap(), Some(true));
        assert_eq!(query.evaluate(&reading("a", Some(5.0))).unwrap(), Some(false));
        assert_eq!(query.evaluate(&reading("a", None)).unwrap(), None);
        assert!(!query.matches(&reading("a", None)).unwrap());
    }

    #[test]
    fn test_select_preserves_order() {
        let readings = readings();
        let query = Query::<Reading>::new("celsius > 20 or sensor = 'west'").unwrap();
        let selected: Vec<&str> = query
            .select(&readings)
            .unwrap()
            .into_iter()
            .map(|r| r.sensor.as_str())
            .collect();
        assert_eq!(selected, vec!["north", "east", "west"]);
    }

    #[test]
    fn test_apply_mutates_matches() {
        let mut readings = readings();
        let query = Query::<Reading>::new("celsius is null").unwrap();
        let count = query
            .apply(&mut readings, |r| r.celsius = Some(0.0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(readings[1].celsius, Some(0.0));
    }

    #[test]
    fn test_batch_failure_is_all_or_nothing() {
        let mut readings = readings();
        readings[2].faulty = true;
        let query = Query::<Reading>::new("celsius > 0").unwrap();

        let err = query.select(&readings).unwrap_err();
        let QueryError::Evaluation(ExpressionError::PropertyAccess(access)) = err else {
            panic!("expected a property access failure");
        };
        assert_eq!(access.type_name(), "Reading");
        assert_eq!(access.property(), "celsius");

        assert!(query.apply(&mut readings, |r| r.celsius = None).is_err());
        assert_eq!(readings[0].celsius, Some(21.5));
    }

    #[test]
    fn test_field_only_resolver() {
        let resolver = AttributeResolver::with_strategies(
            accessor_strategy("field").into_iter().collect(),
        );
        let query = Query::<Reading>::with_resolver("celsius < 15", &resolver).unwrap();
        let getter = &query.bound().accessors()[&Identifier::new("celsius")];
        assert_eq!(getter.to_string(), "FieldGetter(Reading.celsius)");

        let mut faulty = reading("x", Some(10.0));
        faulty.faulty = true;
        assert!(query.matches(&faulty).unwrap());

        assert!(matches!(
            Query::<Reading>::with_resolver("sensor = 'x'", &resolver),
            Err(QueryError::PropertyNotFound(_))
        ));
    }

    #[test]
    fn test_bound_query_rejects_foreign_candidates() {
        let bound = BoundQuery::bind(Reading::type_info(), parse_predicate("celsius > 1").unwrap())
            .unwrap();
        assert_eq!(bound.accessors().len(), 1);
        let err = bound.evaluate(&"not a reading".to_string()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::Evaluation(ExpressionError::PropertyAccess(
                crate::reflect::PropertyAccessError::ArgumentMismatch { .. }
            ))
        ));
    }
}
