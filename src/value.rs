//! Runtime values produced by expression nodes and property accessors.

use crate::expression::pattern::LikePattern;
use std::cmp::Ordering;
use std::fmt;

/// Kinds of non-null values a node or accessor may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
    Pattern,
}

impl ValueKind {
    /// Check if this kind takes part in numeric promotion
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Pattern => "pattern",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value flowing through evaluation. `Null` is SQL's unknown.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Pattern(LikePattern),
}

impl Value {
    /// Get the kind of this value, `None` for unknown
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Float(_) => Some(ValueKind::Float),
            Value::String(_) => Some(ValueKind::String),
            Value::Pattern(_) => Some(ValueKind::Pattern),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// View this value as a number, if it is one
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Value::Integer(i) => Some(Numeric::Integer(*i)),
            Value::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Pattern(p) => write!(f, "{}", p.like()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<LikePattern> for Value {
    fn from(value: LikePattern) -> Self {
        Value::Pattern(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A number before promotion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Integer(i) => *i as f64,
            Numeric::Float(f) => *f,
        }
    }
}

/// Operands after the promotion rule: floating if either side is floating,
/// otherwise both stay 64-bit integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Promoted {
    Integers(i64, i64),
    Floats(f64, f64),
}

impl Promoted {
    pub fn new(left: Numeric, right: Numeric) -> Self {
        match (left, right) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Promoted::Integers(a, b),
            (a, b) => Promoted::Floats(a.as_f64(), b.as_f64()),
        }
    }

    /// Order the operands, `None` when a float operand is NaN
    pub fn ordering(&self) -> Option<Ordering> {
        match self {
            Promoted::Integers(a, b) => Some(a.cmp(b)),
            Promoted::Floats(a, b) => a.partial_cmp(b),
        }
    }
}

/// Conversion between Rust property types and [`Value`], used when
/// registering typed accessors on a [`crate::reflect::TypeInfo`].
pub trait Property: Sized {
    /// Kind of the non-null values of this type
    const KIND: ValueKind;
    /// Whether `Value::Null` is a legal value for this type
    const NULLABLE: bool = false;

    fn into_value(self) -> Value;

    /// Convert back from a value, `None` on a kind mismatch
    fn from_value(value: Value) -> Option<Self>;
}

impl Property for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Property for i32 {
    const KIND: ValueKind = ValueKind::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }
}

impl Property for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }
}

impl Property for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_numeric().map(|n| n.as_f64())
    }
}

impl Property for String {
    const KIND: ValueKind = ValueKind::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl<P: Property> Property for Option<P> {
    const KIND: ValueKind = P::KIND;
    const NULLABLE: bool = true;

    fn into_value(self) -> Value {
        self.map_or(Value::Null, Property::into_value)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => P::from_value(other).map(Some),
        }
    }
}
