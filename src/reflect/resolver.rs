//! Strategy-chain resolution with a per-resolver cache.

use crate::reflect::accessor::{default_strategies, Getter, PropertyAccessor, Setter};
use crate::reflect::error::PropertyNotFoundError;
use crate::reflect::type_info::{TypeInfo, TypeKind};
use dashmap::DashMap;
use log::debug;
use std::any::TypeId;
use std::sync::{Arc, LazyLock};

/// Cache key: one property of one type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolveKey {
    type_id: TypeId,
    kind: TypeKind,
    type_name: String,
    property: String,
}

impl ResolveKey {
    fn new(info: &TypeInfo, property: &str) -> Self {
        Self {
            type_id: info.target_type_id(),
            kind: info.kind(),
            type_name: info.name().to_string(),
            property: property.to_string(),
        }
    }
}

static GLOBAL: LazyLock<AttributeResolver> = LazyLock::new(AttributeResolver::new);

/// Resolves property names to bound accessors by trying each strategy in
/// order, caching every successful resolution.
pub struct AttributeResolver {
    strategies: Vec<Arc<dyn PropertyAccessor>>,
    getters: DashMap<ResolveKey, Getter>,
    setters: DashMap<ResolveKey, Setter>,
}

impl AttributeResolver {
    /// Create a resolver using accessor methods first, then fields
    pub fn new() -> Self {
        Self::with_strategies(default_strategies())
    }

    /// Create a resolver with a custom strategy chain
    pub fn with_strategies(strategies: Vec<Arc<dyn PropertyAccessor>>) -> Self {
        Self {
            strategies,
            getters: DashMap::new(),
            setters: DashMap::new(),
        }
    }

    /// The process-wide resolver shared by queries that do not bring their own
    pub fn global() -> &'static AttributeResolver {
        &GLOBAL
    }

    /// Names of the strategies, in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve a read accessor for `property` on `info`
    pub fn getter(&self, info: &TypeInfo, property: &str) -> Result<Getter, PropertyNotFoundError> {
        let key = ResolveKey::new(info, property);
        if let Some(getter) = self.getters.get(&key) {
            return Ok(getter.clone());
        }

        for strategy in &self.strategies {
            if let Ok(getter) = strategy.getter(info, property) {
                debug!(
                    "Resolved {}.{} to {} using '{}' strategy",
                    info.name(),
                    property,
                    getter,
                    strategy.name()
                );
                self.getters.insert(key, getter.clone());
                return Ok(getter);
            }
        }

        Err(PropertyNotFoundError::getter(info.name(), property))
    }

    /// Resolve a write accessor for `property` on `info`
    pub fn setter(&self, info: &TypeInfo, property: &str) -> Result<Setter, PropertyNotFoundError> {
        let key = ResolveKey::new(info, property);
        if let Some(setter) = self.setters.get(&key) {
            return Ok(setter.clone());
        }

        for strategy in &self.strategies {
            if let Ok(setter) = strategy.setter(info, property) {
                debug!(
                    "Resolved {}.{} to {} using '{}' strategy",
                    info.name(),
                    property,
                    setter,
                    strategy.name()
                );
                self.setters.insert(key, setter.clone());
                return Ok(setter);
            }
        }

        Err(PropertyNotFoundError::setter(info.name(), property))
    }

    /// Number of cached getter resolutions
    pub fn cached_getters(&self) -> usize {
        self.getters.len()
    }

    pub fn cached_setters(&self) -> usize {
        self.setters.len()
    }

    pub fn clear_cache(&self) {
        self.getters.clear();
        self.setters.clear();
    }
}

impl Default for AttributeResolver {
    fn default() -> Self {
        Self::new()
    }
}
