//! Runtime type metadata standing in for reflection.
//!
//! A [`TypeInfo`] describes one Rust type the way a class file describes a
//! class: its declared accessor methods, its declared fields, an optional
//! superclass reached by projecting into an embedded parent value, and the
//! interfaces it implements. Interface descriptors are built per implementor
//! so their methods can dispatch through the implementor's trait impl.

use crate::value::{Property, Value, ValueKind};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Raw failure of a member invocation, before it is tagged with the
/// declaring type and property name.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MemberError {
    /// The receiver is not an instance of the declaring type
    WrongReceiver,
    /// The member itself reported an error
    Failed(String),
    /// Null passed for a non-nullable parameter
    NullAssignment,
    /// Value of the wrong kind passed for a parameter
    Mismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
    /// Write to a read-only member
    ReadOnly,
}

pub(crate) type ReadFn = Arc<dyn Fn(&dyn Any) -> Result<Value, MemberError> + Send + Sync>;
pub(crate) type WriteFn =
    Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), MemberError> + Send + Sync>;

type ProjectFn = dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync;
type ProjectMutFn = dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync;

/// Step from an instance of a type to the part of it that is an instance of
/// one of its supertypes.
#[derive(Clone)]
pub(crate) struct Upcast {
    project: Arc<ProjectFn>,
    project_mut: Arc<ProjectMutFn>,
}

impl Upcast {
    fn new<F, G>(project: F, project_mut: G) -> Self
    where
        F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
        G: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
    {
        Self {
            project: Arc::new(project),
            project_mut: Arc::new(project_mut),
        }
    }

    /// Interfaces are implemented by the object itself
    fn identity() -> Self {
        Self::new(|object| Some(object), |object| Some(object))
    }

    pub(crate) fn apply<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.project)(object)
    }

    pub(crate) fn apply_mut<'a>(&self, object: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.project_mut)(object)
    }
}

/// Whether a type or member is visible outside its declaring module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Class or interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Clone)]
pub(crate) enum MethodBody {
    /// No parameters, returns a value
    Read { returns: ValueKind, read: ReadFn },
    /// One parameter, returns nothing
    Write { parameter: ValueKind, write: WriteFn },
}

/// A declared accessor method
#[derive(Clone)]
pub struct MethodInfo {
    name: String,
    visibility: Visibility,
    pub(crate) body: MethodBody,
}

impl MethodInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn parameter_count(&self) -> usize {
        match self.body {
            MethodBody::Read { .. } => 0,
            MethodBody::Write { .. } => 1,
        }
    }

    pub fn return_kind(&self) -> Option<ValueKind> {
        match self.body {
            MethodBody::Read { returns, .. } => Some(returns),
            MethodBody::Write { .. } => None,
        }
    }

    pub fn parameter_kind(&self) -> Option<ValueKind> {
        match self.body {
            MethodBody::Read { .. } => None,
            MethodBody::Write { parameter, .. } => Some(parameter),
        }
    }
}

/// A declared field
#[derive(Clone)]
pub struct FieldInfo {
    name: String,
    visibility: Visibility,
    kind: ValueKind,
    nullable: bool,
    pub(crate) read: ReadFn,
    pub(crate) write: Option<WriteFn>,
}

impl FieldInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Final fields have no write access
    pub fn is_final(&self) -> bool {
        self.write.is_none()
    }
}

/// A superclass or implemented interface together with the step that
/// reaches it from the subtype.
#[derive(Clone)]
pub struct Supertype {
    info: Arc<TypeInfo>,
    pub(crate) upcast: Upcast,
}

impl Supertype {
    pub fn info(&self) -> &Arc<TypeInfo> {
        &self.info
    }
}

/// Metadata describing one reflectable type
pub struct TypeInfo {
    name: String,
    type_id: TypeId,
    kind: TypeKind,
    visibility: Visibility,
    superclass: Option<Supertype>,
    interfaces: Vec<Supertype>,
    methods: Vec<MethodInfo>,
    fields: Vec<FieldInfo>,
}

impl TypeInfo {
    /// Start describing a class backed by the Rust type `T`
    pub fn class<T: Any>(name: impl Into<String>) -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(name.into(), TypeKind::Class)
    }

    /// Start describing an interface as implemented by the Rust type `T`
    pub fn interface<T: Any>(name: impl Into<String>) -> TypeInfoBuilder<T> {
        TypeInfoBuilder::new(name.into(), TypeKind::Interface)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the Rust type whose instances this descriptor reads.
    /// Not `type_id`: `Any::type_id` would shadow it on an `Arc<TypeInfo>`.
    pub fn target_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn superclass(&self) -> Option<&Supertype> {
        self.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[Supertype] {
        &self.interfaces
    }

    pub fn declared_methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn declared_fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn declared_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// A member can be invoked without being made accessible only if both
    /// it and its declaring type are public.
    pub fn is_public(&self, member: Visibility) -> bool {
        self.visibility == Visibility::Public && member == Visibility::Public
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass.as_ref().map(|s| s.info.name()))
            .field(
                "interfaces",
                &self.interfaces.iter().map(|s| s.info.name()).collect::<Vec<_>>(),
            )
            .field(
                "methods",
                &self.methods.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field(
                "fields",
                &self.fields.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Types that can describe themselves to the attribute resolver
pub trait Reflect: Any {
    fn type_info() -> Arc<TypeInfo>;
}

/// Builder for [`TypeInfo`]
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> TypeInfoBuilder<T> {
    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            info: TypeInfo {
                name,
                type_id: TypeId::of::<T>(),
                kind,
                visibility: Visibility::Public,
                superclass: None,
                interfaces: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Mark the type itself as not publicly visible
    pub fn private(mut self) -> Self {
        self.info.visibility = Visibility::Private;
        self
    }

    /// Declare the superclass `P`, embedded in `T` and reached through the
    /// given projections.
    pub fn extends<P: Reflect>(
        mut self,
        project: fn(&T) -> &P,
        project_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        let upcast = Upcast::new(
            move |object| {
                object
                    .downcast_ref::<T>()
                    .map(|value| project(value) as &dyn Any)
            },
            move |object| {
                object
                    .downcast_mut::<T>()
                    .map(|value| project_mut(value) as &mut dyn Any)
            },
        );
        self.info.superclass = Some(Supertype {
            info: P::type_info(),
            upcast,
        });
        self
    }

    /// Declare an implemented interface, built with
    /// [`TypeInfo::interface`] for this same `T`.
    pub fn implements(mut self, interface: Arc<TypeInfo>) -> Self {
        debug_assert_eq!(interface.kind(), TypeKind::Interface);
        self.info.interfaces.push(Supertype {
            info: interface,
            upcast: Upcast::identity(),
        });
        self
    }

    /// Declare a public no-argument accessor method
    pub fn getter<V, F>(self, name: &str, read: F) -> Self
    where
        V: Property,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.read_method(name, Visibility::Public, move |value| Ok(read(value)))
    }

    /// Declare a non-public no-argument accessor method
    pub fn private_getter<V, F>(self, name: &str, read: F) -> Self
    where
        V: Property,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.read_method(name, Visibility::Private, move |value| Ok(read(value)))
    }

    /// Declare a public accessor method that may fail when invoked
    pub fn try_getter<V, F>(self, name: &str, read: F) -> Self
    where
        V: Property,
        F: Fn(&T) -> Result<V, String> + Send + Sync + 'static,
    {
        self.read_method(name, Visibility::Public, read)
    }

    /// Declare a public one-argument mutator method
    pub fn setter<V, F>(mut self, name: &str, write: F) -> Self
    where
        V: Property,
        F: Fn(&mut T, V) -> Result<(), String> + Send + Sync + 'static,
    {
        self.info.methods.push(MethodInfo {
            name: name.to_string(),
            visibility: Visibility::Public,
            body: MethodBody::Write {
                parameter: V::KIND,
                write: writer::<T, V, F>(write),
            },
        });
        self
    }

    /// Declare a private, writable field
    pub fn field<V, R, W>(self, name: &str, read: R, write: W) -> Self
    where
        V: Property,
        R: Fn(&T) -> V + Send + Sync + 'static,
        W: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let write = writer::<T, V, _>(move |target: &mut T, value: V| {
            write(target, value);
            Ok(())
        });
        self.push_field::<V, R>(name, Visibility::Private, read, Some(write))
    }

    /// Declare a public, writable field
    pub fn public_field<V, R, W>(self, name: &str, read: R, write: W) -> Self
    where
        V: Property,
        R: Fn(&T) -> V + Send + Sync + 'static,
        W: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let write = writer::<T, V, _>(move |target: &mut T, value: V| {
            write(target, value);
            Ok(())
        });
        self.push_field::<V, R>(name, Visibility::Public, read, Some(write))
    }

    /// Declare a private field that cannot be written
    pub fn final_field<V, R>(self, name: &str, read: R) -> Self
    where
        V: Property,
        R: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push_field::<V, R>(name, Visibility::Private, read, None)
    }

    pub fn build(self) -> Arc<TypeInfo> {
        Arc::new(self.info)
    }

    fn read_method<V, F>(mut self, name: &str, visibility: Visibility, read: F) -> Self
    where
        V: Property,
        F: Fn(&T) -> Result<V, String> + Send + Sync + 'static,
    {
        self.info.methods.push(MethodInfo {
            name: name.to_string(),
            visibility,
            body: MethodBody::Read {
                returns: V::KIND,
                read: reader::<T, V, F>(read),
            },
        });
        self
    }

    fn push_field<V, R>(
        mut self,
        name: &str,
        visibility: Visibility,
        read: R,
        write: Option<WriteFn>,
    ) -> Self
    where
        V: Property,
        R: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.info.fields.push(FieldInfo {
            name: name.to_string(),
            visibility,
            kind: V::KIND,
            nullable: V::NULLABLE,
            read: reader::<T, V, _>(move |value: &T| Ok(read(value))),
            write,
        });
        self
    }
}

fn reader<T, V, F>(read: F) -> ReadFn
where
    T: Any,
    V: Property,
    F: Fn(&T) -> Result<V, String> + Send + Sync + 'static,
{
    Arc::new(move |object: &dyn Any| {
        let target = object
            .downcast_ref::<T>()
            .ok_or(MemberError::WrongReceiver)?;
        read(target)
            .map(Property::into_value)
            .map_err(MemberError::Failed)
    })
}

fn writer<T, V, F>(write: F) -> WriteFn
where
    T: Any,
    V: Property,
    F: Fn(&mut T, V) -> Result<(), String> + Send + Sync + 'static,
{
    Arc::new(move |object: &mut dyn Any, value: Value| {
        let target = object
            .downcast_mut::<T>()
            .ok_or(MemberError::WrongReceiver)?;
        let actual = match value.kind() {
            None if !V::NULLABLE => return Err(MemberError::NullAssignment),
            None => V::KIND,
            Some(kind) => kind,
        };
        let value = V::from_value(value).ok_or(MemberError::Mismatch {
            expected: V::KIND,
            actual,
        })?;
        write(target, value).map_err(MemberError::Failed)
    })
}
