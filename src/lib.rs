pub mod expression;
pub mod query;
pub mod reflect;
pub mod sample;
pub mod sql;
pub mod value;

pub use query::{BoundQuery, Query, QueryError, QueryResult};
pub use reflect::{Reflect, TypeInfo};
pub use value::{Value, ValueKind};
