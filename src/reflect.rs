//! Dynamic attribute binding.
//!
//! Predicates name properties of a target type that is only known at
//! runtime. This module maps those names to bound read and write
//! capabilities:
//!
//! - **TypeInfo**: runtime metadata a type publishes through [`Reflect`]
//! - **PropertyAccessor**: a strategy for locating accessors (methods, then fields)
//! - **Getter / Setter**: bound capabilities invoked against `&dyn Any` instances
//! - **AttributeResolver**: runs the strategy chain and caches each resolution

pub mod accessor;
pub mod error;
pub mod resolver;
pub mod type_info;

pub use accessor::{
    accessor_strategy, decapitalize, default_strategies, FieldAccessor, Getter, MemberKind,
    MethodAccessor, PropertyAccessor, Setter,
};
pub use error::{PropertyAccessError, PropertyNotFoundError, ReflectResult};
pub use resolver::AttributeResolver;
pub use type_info::{
    FieldInfo, MethodInfo, Reflect, Supertype, TypeInfo, TypeInfoBuilder, TypeKind, Visibility,
};
