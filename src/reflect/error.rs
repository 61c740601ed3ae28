//! Attribute binding error types.

use crate::value::ValueKind;
use thiserror::Error;

/// No accessor exists for a property anywhere in a type's ancestry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not find a {access} for property '{property}' in {type_name}")]
pub struct PropertyNotFoundError {
    pub type_name: String,
    pub property: String,
    /// "getter" or "setter"
    pub access: &'static str,
}

impl PropertyNotFoundError {
    pub fn getter(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            property: property.into(),
            access: "getter",
        }
    }

    pub fn setter(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            property: property.into(),
            access: "setter",
        }
    }
}

/// An accessor exists but invoking it against a particular object failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyAccessError {
    #[error("Exception occurred inside getter of {type_name}.{property}: {message}")]
    GetterFailed {
        type_name: String,
        property: String,
        message: String,
    },

    #[error("Exception occurred inside setter of {type_name}.{property}: {message}")]
    SetterFailed {
        type_name: String,
        property: String,
        message: String,
    },

    #[error("Illegal access to {type_name}.{property}")]
    IllegalAccess { type_name: String, property: String },

    #[error("Object is not an instance of {type_name} while accessing {type_name}.{property}")]
    ArgumentMismatch { type_name: String, property: String },

    #[error("Cannot assign a {actual} value to {type_name}.{property} of kind {expected}")]
    ValueMismatch {
        type_name: String,
        property: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("Null value was assigned to a non-nullable property {type_name}.{property}")]
    NullAssignment { type_name: String, property: String },
}

impl PropertyAccessError {
    /// Name of the type declaring the failing accessor
    pub fn type_name(&self) -> &str {
        match self {
            PropertyAccessError::GetterFailed { type_name, .. }
            | PropertyAccessError::SetterFailed { type_name, .. }
            | PropertyAccessError::IllegalAccess { type_name, .. }
            | PropertyAccessError::ArgumentMismatch { type_name, .. }
            | PropertyAccessError::ValueMismatch { type_name, .. }
            | PropertyAccessError::NullAssignment { type_name, .. } => type_name,
        }
    }

    pub fn property(&self) -> &str {
        match self {
            PropertyAccessError::GetterFailed { property, .. }
            | PropertyAccessError::SetterFailed { property, .. }
            | PropertyAccessError::IllegalAccess { property, .. }
            | PropertyAccessError::ArgumentMismatch { property, .. }
            | PropertyAccessError::ValueMismatch { property, .. }
            | PropertyAccessError::NullAssignment { property, .. } => property,
        }
    }
}

/// Result type for property access.
pub type ReflectResult<T> = Result<T, PropertyAccessError>;
