//! Bound property accessors and the strategies that locate them.
//!
//! Two strategies exist: [`MethodAccessor`] looks for bean-style accessor
//! methods (`getX`/`isX`/`setX`), [`FieldAccessor`] reads and writes
//! declared fields directly. Both walk the superclass first and then each
//! implemented interface, depth first, stopping at the first match.

use crate::reflect::error::{PropertyAccessError, PropertyNotFoundError, ReflectResult};
use crate::reflect::type_info::{
    MemberError, MethodBody, ReadFn, TypeInfo, Upcast, Visibility, WriteFn,
};
use crate::value::{Value, ValueKind};
use log::debug;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Which kind of member backs an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Field,
}

/// Location of a resolved member: where it is declared and how to reach the
/// declaring part of an instance of the bound type.
#[derive(Clone)]
struct Binding {
    declaring_type: String,
    property: String,
    member_name: String,
    member_kind: MemberKind,
    public: bool,
    accessible: bool,
    path: Vec<Upcast>,
}

impl Binding {
    fn new(
        info: &TypeInfo,
        property: &str,
        member_name: &str,
        member_kind: MemberKind,
        visibility: Visibility,
        path: &[Upcast],
    ) -> Self {
        let public = info.is_public(visibility);
        if !public {
            debug!(
                "Making non-public {}.{} invocable for property '{}'",
                info.name(),
                member_name,
                property
            );
        }
        Self {
            declaring_type: info.name().to_string(),
            property: property.to_string(),
            member_name: member_name.to_string(),
            member_kind,
            public,
            accessible: true,
            path: path.to_vec(),
        }
    }

    fn check_access(&self) -> ReflectResult<()> {
        if self.public || self.accessible {
            Ok(())
        } else {
            Err(PropertyAccessError::IllegalAccess {
                type_name: self.declaring_type.clone(),
                property: self.property.clone(),
            })
        }
    }

    fn project<'a>(&self, target: &'a dyn Any) -> ReflectResult<&'a dyn Any> {
        let mut object = target;
        for upcast in &self.path {
            object = upcast
                .apply(object)
                .ok_or_else(|| self.error(MemberError::WrongReceiver, false))?;
        }
        Ok(object)
    }

    fn project_mut<'a>(&self, target: &'a mut dyn Any) -> ReflectResult<&'a mut dyn Any> {
        let mut object = target;
        for upcast in &self.path {
            object = upcast
                .apply_mut(object)
                .ok_or_else(|| self.error(MemberError::WrongReceiver, true))?;
        }
        Ok(object)
    }

    fn error(&self, error: MemberError, writing: bool) -> PropertyAccessError {
        let type_name = self.declaring_type.clone();
        let property = self.property.clone();
        match error {
            MemberError::WrongReceiver => PropertyAccessError::ArgumentMismatch {
                type_name,
                property,
            },
            MemberError::Failed(message) if writing => PropertyAccessError::SetterFailed {
                type_name,
                property,
                message,
            },
            MemberError::Failed(message) => PropertyAccessError::GetterFailed {
                type_name,
                property,
                message,
            },
            MemberError::NullAssignment => PropertyAccessError::NullAssignment {
                type_name,
                property,
            },
            MemberError::Mismatch { expected, actual } => PropertyAccessError::ValueMismatch {
                type_name,
                property,
                expected,
                actual,
            },
            MemberError::ReadOnly => PropertyAccessError::IllegalAccess {
                type_name,
                property,
            },
        }
    }
}

/// A bound read capability for one property of one type
#[derive(Clone)]
pub struct Getter {
    binding: Binding,
    returns: ValueKind,
    read: ReadFn,
}

impl Getter {
    /// Read the property from an instance of the bound type
    pub fn get(&self, target: &dyn Any) -> ReflectResult<Value> {
        self.binding.check_access()?;
        let object = self.binding.project(target)?;
        (self.read)(object).map_err(|e| self.binding.error(e, false))
    }

    /// Declared kind of the values this getter produces
    pub fn return_kind(&self) -> ValueKind {
        self.returns
    }

    pub fn property(&self) -> &str {
        &self.binding.property
    }

    /// Name of the type that declares the backing member
    pub fn declaring_type(&self) -> &str {
        &self.binding.declaring_type
    }

    pub fn member_kind(&self) -> MemberKind {
        self.binding.member_kind
    }

    /// Name of the backing method, `None` for field access
    pub fn method_name(&self) -> Option<&str> {
        match self.binding.member_kind {
            MemberKind::Method => Some(&self.binding.member_name),
            MemberKind::Field => None,
        }
    }

    pub fn is_accessible(&self) -> bool {
        self.binding.public || self.binding.accessible
    }

    /// Toggle the accessibility override for a non-public member
    pub fn set_accessible(&mut self, accessible: bool) {
        self.binding.accessible = accessible;
    }
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.binding.member_kind {
            MemberKind::Method => "MethodGetter",
            MemberKind::Field => "FieldGetter",
        };
        write!(
            f,
            "{}({}.{})",
            prefix, self.binding.declaring_type, self.binding.property
        )
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A bound write capability for one property of one type
#[derive(Clone)]
pub struct Setter {
    binding: Binding,
    parameter: ValueKind,
    write: Option<WriteFn>,
}

impl Setter {
    /// Write the property on an instance of the bound type
    pub fn set(&self, target: &mut dyn Any, value: Value) -> ReflectResult<()> {
        self.binding.check_access()?;
        let write = self
            .write
            .as_ref()
            .ok_or_else(|| self.binding.error(MemberError::ReadOnly, true))?;
        let object = self.binding.project_mut(target)?;
        write(object, value).map_err(|e| self.binding.error(e, true))
    }

    /// Declared kind of the value this setter accepts
    pub fn parameter_kind(&self) -> ValueKind {
        self.parameter
    }

    pub fn property(&self) -> &str {
        &self.binding.property
    }

    pub fn declaring_type(&self) -> &str {
        &self.binding.declaring_type
    }

    pub fn member_kind(&self) -> MemberKind {
        self.binding.member_kind
    }

    pub fn method_name(&self) -> Option<&str> {
        match self.binding.member_kind {
            MemberKind::Method => Some(&self.binding.member_name),
            MemberKind::Field => None,
        }
    }

    pub fn set_accessible(&mut self, accessible: bool) {
        self.binding.accessible = accessible;
    }
}

impl fmt::Display for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.binding.member_kind {
            MemberKind::Method => "MethodSetter",
            MemberKind::Field => "FieldSetter",
        };
        write!(
            f,
            "{}({}.{})",
            prefix, self.binding.declaring_type, self.binding.property
        )
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One way of locating a property's accessors on a type
pub trait PropertyAccessor: Send + Sync {
    /// Strategy name, e.g. "property" or "field"
    fn name(&self) -> &'static str;

    fn getter(&self, info: &TypeInfo, property: &str) -> Result<Getter, PropertyNotFoundError>;

    fn setter(&self, info: &TypeInfo, property: &str) -> Result<Setter, PropertyNotFoundError>;
}

/// Walk `info`, its superclass chain and its interfaces depth first,
/// superclass before interfaces, returning the first hit of `find`.
fn walk_ancestry<R>(
    info: &TypeInfo,
    path: &mut Vec<Upcast>,
    find: &dyn Fn(&TypeInfo, &[Upcast]) -> Option<R>,
) -> Option<R> {
    if let Some(found) = find(info, path) {
        return Some(found);
    }

    let supertypes = info.superclass().into_iter().chain(info.interfaces());
    for supertype in supertypes {
        path.push(supertype.upcast.clone());
        let found = walk_ancestry(supertype.info(), path, find);
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Locates bean-style accessor methods
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodAccessor;

impl MethodAccessor {
    fn getter_method(info: &TypeInfo, property: &str, path: &[Upcast]) -> Option<Getter> {
        info.declared_methods().iter().find_map(|method| {
            let MethodBody::Read { returns, read } = &method.body else {
                return None;
            };
            let name = method.name();
            let matched = ["get", "is"].iter().any(|prefix| {
                name.strip_prefix(prefix)
                    .is_some_and(|rest| property_matches(rest, property))
            });
            matched.then(|| Getter {
                binding: Binding::new(
                    info,
                    property,
                    name,
                    MemberKind::Method,
                    method.visibility(),
                    path,
                ),
                returns: *returns,
                read: read.clone(),
            })
        })
    }

    fn setter_method(info: &TypeInfo, property: &str, path: &[Upcast]) -> Option<Setter> {
        // prefer the setter whose parameter matches the getter's return kind
        let expected = walk_ancestry(info, &mut Vec::new(), &|info, path| {
            Self::getter_method(info, property, path)
        })
        .map(|getter| getter.return_kind());

        let mut candidate = None;
        for method in info.declared_methods() {
            let MethodBody::Write { parameter, write } = &method.body else {
                continue;
            };
            let matched = method
                .name()
                .strip_prefix("set")
                .is_some_and(|rest| property_matches(rest, property));
            if !matched {
                continue;
            }
            candidate = Some(Setter {
                binding: Binding::new(
                    info,
                    property,
                    method.name(),
                    MemberKind::Method,
                    method.visibility(),
                    path,
                ),
                parameter: *parameter,
                write: Some(write.clone()),
            });
            if expected.is_none() || expected == Some(*parameter) {
                break;
            }
        }
        candidate
    }
}

impl PropertyAccessor for MethodAccessor {
    fn name(&self) -> &'static str {
        "property"
    }

    fn getter(&self, info: &TypeInfo, property: &str) -> Result<Getter, PropertyNotFoundError> {
        walk_ancestry(info, &mut Vec::new(), &|info, path| {
            Self::getter_method(info, property, path)
        })
        .ok_or_else(|| PropertyNotFoundError::getter(info.name(), property))
    }

    fn setter(&self, info: &TypeInfo, property: &str) -> Result<Setter, PropertyNotFoundError> {
        walk_ancestry(info, &mut Vec::new(), &|info, path| {
            Self::setter_method(info, property, path)
        })
        .ok_or_else(|| PropertyNotFoundError::setter(info.name(), property))
    }
}

/// Reads and writes declared fields directly
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldAccessor;

impl PropertyAccessor for FieldAccessor {
    fn name(&self) -> &'static str {
        "field"
    }

    fn getter(&self, info: &TypeInfo, property: &str) -> Result<Getter, PropertyNotFoundError> {
        walk_ancestry(info, &mut Vec::new(), &|info, path| {
            info.declared_field(property).map(|field| Getter {
                binding: Binding::new(
                    info,
                    property,
                    field.name(),
                    MemberKind::Field,
                    field.visibility(),
                    path,
                ),
                returns: field.kind(),
                read: field.read.clone(),
            })
        })
        .ok_or_else(|| PropertyNotFoundError::getter(info.name(), property))
    }

    fn setter(&self, info: &TypeInfo, property: &str) -> Result<Setter, PropertyNotFoundError> {
        walk_ancestry(info, &mut Vec::new(), &|info, path| {
            info.declared_field(property).map(|field| Setter {
                binding: Binding::new(
                    info,
                    property,
                    field.name(),
                    MemberKind::Field,
                    field.visibility(),
                    path,
                ),
                parameter: field.kind(),
                write: field.write.clone(),
            })
        })
        .ok_or_else(|| PropertyNotFoundError::setter(info.name(), property))
    }
}

/// Check a method name with its prefix stripped against a property name,
/// both as written ("Age" vs "Age") and decapitalized ("Age" vs "age").
fn property_matches(stripped: &str, property: &str) -> bool {
    !stripped.is_empty() && (stripped == property || decapitalize(stripped) == property)
}

/// Lowercase the first character unless the first two are both uppercase,
/// so "FooBah" becomes "fooBah" while "URL" stays "URL".
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if first.is_uppercase() && chars.next().is_some_and(char::is_uppercase) {
        return name.to_string();
    }
    first.to_lowercase().chain(name.chars().skip(1)).collect()
}

static METHOD_ACCESSOR: LazyLock<Arc<dyn PropertyAccessor>> =
    LazyLock::new(|| Arc::new(MethodAccessor) as Arc<dyn PropertyAccessor>);
static FIELD_ACCESSOR: LazyLock<Arc<dyn PropertyAccessor>> =
    LazyLock::new(|| Arc::new(FieldAccessor) as Arc<dyn PropertyAccessor>);

/// The default strategy chain: accessor methods first, then fields
pub fn default_strategies() -> Vec<Arc<dyn PropertyAccessor>> {
    vec![METHOD_ACCESSOR.clone(), FIELD_ACCESSOR.clone()]
}

/// Look up a default strategy by name. An empty name or "property" selects
/// method access, "field" selects direct field access.
pub fn accessor_strategy(name: &str) -> Option<Arc<dyn PropertyAccessor>> {
    match name {
        "" | "property" => Some(METHOD_ACCESSOR.clone()),
        "field" => Some(FIELD_ACCESSOR.clone()),
        _ => None,
    }
}
