//! The value representation flowing through slots, instances and caches.
//!
//! A closed tagged union rather than a trait object: the cache
//! specialization switch and the slot dispatch both stay exhaustive and
//! compile-time checked. Only the variants the type model itself needs are
//! present; a host embeds richer payloads behind [`crate::slot::HostSlot`].

use std::fmt;

use ferrotype_common::rc::PyRc;

use crate::{context::Context, error::AttributeError, instance::InstanceRef, typeobj::TypeRef};

/// Signature of a host-supplied native callable.
pub type NativeFnPtr =
    PyRc<dyn Fn(&Context, &[Value]) -> Result<Value, AttributeError> + Send + Sync>;

/// A named native callable. Equality is identity: two functions are the
/// same only if they share the underlying allocation.
#[derive(Clone)]
pub struct NativeFunction {
    name: &'static str,
    f: NativeFnPtr,
}

impl NativeFunction {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> Result<Value, AttributeError> + Send + Sync + 'static,
    {
        Self {
            name: crate::intern::intern(name),
            f: PyRc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, ctx: &Context, args: &[Value]) -> Result<Value, AttributeError> {
        (self.f)(ctx, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        PyRc::ptr_eq(&self.f, &other.f)
    }
}

/// A callable bound to the receiver it was resolved on.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundMethod {
    pub func: NativeFunction,
    pub receiver: Value,
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(PyRc<str>),
    Type(TypeRef),
    Instance(InstanceRef),
    Function(NativeFunction),
    BoundMethod(PyRc<BoundMethod>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Self::Str(PyRc::from(s))
    }

    pub fn function<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> Result<Value, AttributeError> + Send + Sync + 'static,
    {
        Self::Function(NativeFunction::new(name, f))
    }

    /// The type of this value. For a type object this is its metatype, so
    /// attribute access on types runs the same machinery one level up.
    pub fn class(&self, ctx: &Context) -> TypeRef {
        match self {
            Self::None => ctx.types.none_type.clone(),
            Self::Bool(_) => ctx.types.bool_type.clone(),
            Self::Int(_) => ctx.types.int_type.clone(),
            Self::Str(_) => ctx.types.str_type.clone(),
            Self::Type(t) => t.class().clone(),
            Self::Instance(i) => i.class().clone(),
            Self::Function(_) => ctx.types.function_type.clone(),
            Self::BoundMethod(_) => ctx.types.method_type.clone(),
        }
    }

    pub fn type_name(&self, ctx: &Context) -> String {
        self.class(ctx).name()
    }

    /// Identity comparison (the `is` of the modeled language).
    pub fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Type(a), Self::Type(b)) => PyRc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => PyRc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::BoundMethod(a), Self::BoundMethod(b)) => PyRc::ptr_eq(a, b),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => PyRc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Invoke this value as a callable. `None` means the value is not
    /// callable; the caller maps that to its own protocol error.
    pub fn call(&self, ctx: &Context, args: &[Value]) -> Option<Result<Value, AttributeError>> {
        match self {
            Self::Function(f) => Some(f.invoke(ctx, args)),
            Self::BoundMethod(m) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(m.receiver.clone());
                full.extend_from_slice(args);
                Some(m.func.invoke(ctx, &full))
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => PyRc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => PyRc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::BoundMethod(a), Self::BoundMethod(b)) => **a == **b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Type(t) => write!(f, "{t:?}"),
            Self::Instance(i) => write!(f, "{i:?}"),
            Self::Function(func) => write!(f, "{func:?}"),
            Self::BoundMethod(m) => write!(f, "<bound method {}>", m.func.name()),
        }
    }
}
