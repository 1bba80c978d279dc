//! # Native Runtime Introspection
//!
//! The substrate capability probes run against.
//!
//! A [`Runtime`] answers shape questions ("does class X have a constructor
//! taking these parameter types?", "what is the n-th field of type T?") and
//! performs construct/get/set/invoke through the handles it hands out. A
//! lookup that finds nothing returns `None`; that is the expected outcome of a
//! probe against the wrong build, not an error.
//!
//! [`SimulatedRuntime`] is an in-memory implementation; [`builds`] holds
//! prebuilt attribute-snapshot builds.

pub mod builds;
pub mod simulated;

pub use simulated::{ClassBuilder, SimulatedRuntime, SimulatedRuntimeBuilder};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

/// Shared handle to the running native runtime.
pub type SharedRuntime = Arc<dyn Runtime>;

/// Failure while operating through an already-resolved handle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("No member '{member}' on class '{class}'")]
    NoSuchMember { class: String, member: String },

    #[error("Invocation failed: {0}")]
    Invocation(String),

    #[error("Lookup returned nothing for '{0}'")]
    NotFound(String),
}

/// Parameter and field types as the native runtime sees them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    Bool,
    Int,
    Double,
    Str,
    Uuid,
    Collection,
    Object(Arc<str>),
}

impl NativeType {
    pub fn object(class: &str) -> Self {
        NativeType::Object(Arc::from(class))
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Bool => f.write_str("boolean"),
            NativeType::Int => f.write_str("int"),
            NativeType::Double => f.write_str("double"),
            NativeType::Str => f.write_str("String"),
            NativeType::Uuid => f.write_str("UUID"),
            NativeType::Collection => f.write_str("Collection"),
            NativeType::Object(class) => f.write_str(class),
        }
    }
}

/// An opaque native object. Equality is identity.
#[derive(Clone)]
pub struct NativeObject {
    class: Arc<str>,
    state: Arc<dyn Any + Send + Sync>,
}

impl NativeObject {
    pub fn new(class: impl Into<Arc<str>>, state: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            class: class.into(),
            state,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Runtime-specific backing state.
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }
}

impl PartialEq for NativeObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeObject({}@{:p})", self.class, Arc::as_ptr(&self.state))
    }
}

/// A value crossing the native boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Uuid(Uuid),
    Collection(Vec<NativeValue>),
    Object(NativeObject),
}

impl NativeValue {
    pub fn type_name(&self) -> String {
        match self {
            NativeValue::Null => "null".to_string(),
            NativeValue::Bool(_) => NativeType::Bool.to_string(),
            NativeValue::Int(_) => NativeType::Int.to_string(),
            NativeValue::Double(_) => NativeType::Double.to_string(),
            NativeValue::Str(_) => NativeType::Str.to_string(),
            NativeValue::Uuid(_) => NativeType::Uuid.to_string(),
            NativeValue::Collection(_) => NativeType::Collection.to_string(),
            NativeValue::Object(obj) => obj.class().to_string(),
        }
    }

    /// Whether the value may be stored in a slot of type `ty`. Null fits any
    /// reference type.
    pub fn conforms_to(&self, ty: &NativeType) -> bool {
        match (self, ty) {
            (NativeValue::Null, NativeType::Bool | NativeType::Int | NativeType::Double) => false,
            (NativeValue::Null, _) => true,
            (NativeValue::Bool(_), NativeType::Bool)
            | (NativeValue::Int(_), NativeType::Int)
            | (NativeValue::Double(_), NativeType::Double)
            | (NativeValue::Str(_), NativeType::Str)
            | (NativeValue::Uuid(_), NativeType::Uuid)
            | (NativeValue::Collection(_), NativeType::Collection) => true,
            (NativeValue::Object(obj), NativeType::Object(class)) => obj.class() == &**class,
            _ => false,
        }
    }

    fn mismatch(&self, expected: NativeType) -> RuntimeError {
        RuntimeError::TypeMismatch {
            expected: expected.to_string(),
            found: self.type_name(),
        }
    }

    pub fn into_string(self) -> Result<String, RuntimeError> {
        match self {
            NativeValue::Str(s) => Ok(s),
            other => Err(other.mismatch(NativeType::Str)),
        }
    }

    pub fn into_double(self) -> Result<f64, RuntimeError> {
        match self {
            NativeValue::Double(v) => Ok(v),
            other => Err(other.mismatch(NativeType::Double)),
        }
    }

    pub fn into_int(self) -> Result<i64, RuntimeError> {
        match self {
            NativeValue::Int(v) => Ok(v),
            other => Err(other.mismatch(NativeType::Int)),
        }
    }

    pub fn into_uuid(self) -> Result<Uuid, RuntimeError> {
        match self {
            NativeValue::Uuid(v) => Ok(v),
            other => Err(other.mismatch(NativeType::Uuid)),
        }
    }

    pub fn into_collection(self) -> Result<Vec<NativeValue>, RuntimeError> {
        match self {
            NativeValue::Collection(items) => Ok(items),
            other => Err(other.mismatch(NativeType::Collection)),
        }
    }

    pub fn into_object(self) -> Result<NativeObject, RuntimeError> {
        match self {
            NativeValue::Object(obj) => Ok(obj),
            other => Err(other.mismatch(NativeType::object("Object"))),
        }
    }
}

/// A class that exists in the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRef {
    name: Arc<str>,
}

impl ClassRef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorRef {
    class: Arc<str>,
    params: Arc<[NativeType]>,
}

impl ConstructorRef {
    pub fn new(class: impl Into<Arc<str>>, params: impl Into<Arc<[NativeType]>>) -> Self {
        Self {
            class: class.into(),
            params: params.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn params(&self) -> &[NativeType] {
        &self.params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    class: Arc<str>,
    name: Arc<str>,
    ty: NativeType,
    is_static: bool,
}

impl FieldRef {
    pub fn new(
        class: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        ty: NativeType,
        is_static: bool,
    ) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            ty,
            is_static,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &NativeType {
        &self.ty
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    class: Arc<str>,
    name: Arc<str>,
    params: Arc<[NativeType]>,
}

impl MethodRef {
    pub fn new(
        class: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        params: impl Into<Arc<[NativeType]>>,
    ) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            params: params.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[NativeType] {
        &self.params
    }
}

/// Introspection and invocation over a native object model.
pub trait Runtime: Send + Sync + fmt::Debug {
    /// Build identifier, for diagnostics.
    fn build(&self) -> &str;

    fn class(&self, name: &str) -> Option<ClassRef>;

    fn constructor(&self, class: &ClassRef, params: &[NativeType]) -> Option<ConstructorRef>;

    /// The `index`-th instance field of `class` whose declared type is `ty`.
    fn field_of_type(&self, class: &ClassRef, ty: &NativeType, index: usize) -> Option<FieldRef>;

    fn static_field(&self, class: &ClassRef, name: &str) -> Option<FieldRef>;

    fn method(&self, class: &ClassRef, name: &str, params: &[NativeType]) -> Option<MethodRef>;

    fn construct(
        &self,
        ctor: &ConstructorRef,
        args: Vec<NativeValue>,
    ) -> Result<NativeObject, RuntimeError>;

    /// Read a field. `target` is `None` for static fields.
    fn get(
        &self,
        field: &FieldRef,
        target: Option<&NativeObject>,
    ) -> Result<NativeValue, RuntimeError>;

    fn set(
        &self,
        field: &FieldRef,
        target: Option<&NativeObject>,
        value: NativeValue,
    ) -> Result<(), RuntimeError>;

    fn invoke(
        &self,
        method: &MethodRef,
        target: Option<&NativeObject>,
        args: Vec<NativeValue>,
    ) -> Result<NativeValue, RuntimeError>;
}
