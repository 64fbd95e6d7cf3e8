//! Slots: capabilities installed under a name in a type.
//!
//! A slot is anything a type can hand out for an attribute name — a plain
//! stored value, a user property, a method that binds on access, an indexed
//! field of the instance layout, or an adapter around a host-native member.
//! Modeled as a closed enum with a single dispatch surface so the inline
//! cache's specialization switch stays exhaustive.
//!
//! Descriptor classes: a *data* descriptor (property, indexed field, a host
//! slot that says so) outranks the instance dictionary; a *non-data*
//! descriptor (method) is shadowed by it; a plain value is no descriptor at
//! all and behaves like a non-data one on reads.

use std::fmt;

use ferrotype_common::rc::PyRc;

use crate::{
    context::Context,
    error::AttributeError,
    intern::intern,
    typeobj::TypeRef,
    value::{BoundMethod, NativeFunction, Value},
};

/// Per-type mapping from attribute name to slot. Insertion order is kept
/// for host introspection; lookups are by key.
pub type SlotTable = indexmap::IndexMap<&'static str, Slot, ahash::RandomState>;

/// A host-native member wrapped as a slot. External collaborator: the core
/// only ever calls through this trait.
pub trait HostSlot: Send + Sync {
    fn name(&self) -> &str;

    fn is_data_descriptor(&self) -> bool {
        false
    }

    fn try_get(
        &self,
        ctx: &Context,
        subject: Option<&Value>,
        owner: &TypeRef,
    ) -> Result<Option<Value>, AttributeError>;

    fn try_set(
        &self,
        _ctx: &Context,
        _subject: &Value,
        _value: &Value,
    ) -> Result<bool, AttributeError> {
        Ok(false)
    }

    fn try_delete(&self, _ctx: &Context, _subject: &Value) -> Result<bool, AttributeError> {
        Ok(false)
    }
}

/// User-supplied get/set/delete functions under one name.
#[derive(Clone)]
pub struct PropertySlot {
    name: &'static str,
    getter: Option<NativeFunction>,
    setter: Option<NativeFunction>,
    deleter: Option<NativeFunction>,
}

impl PropertySlot {
    pub fn new(name: &str) -> Self {
        Self {
            name: intern(name),
            getter: None,
            setter: None,
            deleter: None,
        }
    }

    pub fn with_getter(mut self, f: NativeFunction) -> Self {
        self.getter = Some(f);
        self
    }

    pub fn with_setter(mut self, f: NativeFunction) -> Self {
        self.setter = Some(f);
        self
    }

    pub fn with_deleter(mut self, f: NativeFunction) -> Self {
        self.deleter = Some(f);
        self
    }
}

/// A callable that binds to the receiver on access.
#[derive(Clone)]
pub struct MethodSlot {
    func: NativeFunction,
}

/// An offset into the indexed storage of the instance layout.
#[derive(Clone, Copy)]
pub struct FieldSlot {
    name: &'static str,
    index: usize,
}

impl FieldSlot {
    pub fn new(name: &str, index: usize) -> Self {
        Self {
            name: intern(name),
            index,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Clone)]
pub enum Slot {
    /// A plain stored value; reads clone it, writes fall through to the
    /// instance dictionary.
    Value(Value),
    Property(PropertySlot),
    Method(MethodSlot),
    Field(FieldSlot),
    Host(PyRc<dyn HostSlot>),
}

impl Slot {
    pub fn value(v: Value) -> Self {
        Self::Value(v)
    }

    pub fn method<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> Result<Value, AttributeError> + Send + Sync + 'static,
    {
        Self::Method(MethodSlot {
            func: NativeFunction::new(name, f),
        })
    }

    pub fn field(name: &str, index: usize) -> Self {
        Self::Field(FieldSlot::new(name, index))
    }

    /// Data descriptors shadow the instance dictionary; non-data ones do not.
    pub fn is_data_descriptor(&self) -> bool {
        match self {
            Self::Value(_) | Self::Method(_) => false,
            Self::Property(_) | Self::Field(_) => true,
            Self::Host(h) => h.is_data_descriptor(),
        }
    }

    /// Read through the slot. `subject` is the object the attribute was
    /// requested on, or `None` for class-level access. `Ok(None)` means the
    /// slot holds no value for this subject (e.g. an unset indexed field);
    /// the resolution engine decides what that falls through to.
    pub fn try_get(
        &self,
        ctx: &Context,
        subject: Option<&Value>,
        owner: &TypeRef,
    ) -> Result<Option<Value>, AttributeError> {
        match self {
            Self::Value(v) => Ok(Some(v.clone())),
            Self::Property(p) => match subject {
                Some(s) => match &p.getter {
                    Some(getter) => getter.invoke(ctx, std::slice::from_ref(s)).map(Some),
                    None => Err(AttributeError::not_found(owner.name(), p.name)),
                },
                // Class-level access yields the raw accessor.
                None => Ok(p.getter.clone().map(Value::Function)),
            },
            Self::Method(m) => match subject {
                Some(s) => Ok(Some(Value::BoundMethod(PyRc::new(BoundMethod {
                    func: m.func.clone(),
                    receiver: s.clone(),
                })))),
                None => Ok(Some(Value::Function(m.func.clone()))),
            },
            Self::Field(fs) => match subject {
                Some(Value::Instance(i)) => Ok(i.get_field(fs.index)),
                _ => Ok(None),
            },
            Self::Host(h) => h.try_get(ctx, subject, owner),
        }
    }

    /// Write through the slot. `Ok(false)` means the slot does not claim
    /// writes for this subject and the engine should fall through.
    pub fn try_set(
        &self,
        ctx: &Context,
        subject: &Value,
        value: &Value,
    ) -> Result<bool, AttributeError> {
        match self {
            Self::Value(_) | Self::Method(_) => Ok(false),
            Self::Property(p) => match &p.setter {
                Some(setter) => {
                    setter.invoke(ctx, &[subject.clone(), value.clone()])?;
                    Ok(true)
                }
                None => Err(AttributeError::unsettable(subject.type_name(ctx), p.name)),
            },
            Self::Field(fs) => match subject {
                Value::Instance(i) => {
                    if i.set_field(fs.index, value.clone()) {
                        Ok(true)
                    } else {
                        // The instance predates a layout change; its storage
                        // has no room for this field.
                        Err(AttributeError::unsettable(subject.type_name(ctx), fs.name))
                    }
                }
                _ => Ok(false),
            },
            Self::Host(h) => h.try_set(ctx, subject, value),
        }
    }

    /// Delete through the slot; same fall-through convention as `try_set`.
    pub fn try_delete(&self, ctx: &Context, subject: &Value) -> Result<bool, AttributeError> {
        match self {
            Self::Value(_) | Self::Method(_) => Ok(false),
            Self::Property(p) => match &p.deleter {
                Some(deleter) => {
                    deleter.invoke(ctx, std::slice::from_ref(subject))?;
                    Ok(true)
                }
                None => Err(AttributeError::undeletable(subject.type_name(ctx), p.name)),
            },
            Self::Field(fs) => match subject {
                Value::Instance(i) => {
                    if fs.index >= i.field_len() {
                        return Err(AttributeError::undeletable(
                            subject.type_name(ctx),
                            fs.name,
                        ));
                    }
                    if i.clear_field(fs.index).is_some() {
                        Ok(true)
                    } else {
                        Err(AttributeError::not_found(subject.type_name(ctx), fs.name))
                    }
                }
                _ => Ok(false),
            },
            Self::Host(h) => h.try_delete(ctx, subject),
        }
    }
}

impl From<PropertySlot> for Slot {
    fn from(p: PropertySlot) -> Self {
        Self::Property(p)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "Slot::Value({v:?})"),
            Self::Property(p) => write!(f, "Slot::Property({})", p.name),
            Self::Method(m) => write!(f, "Slot::Method({})", m.func.name()),
            Self::Field(fs) => write!(f, "Slot::Field({} @ {})", fs.name, fs.index),
            Self::Host(h) => write!(f, "Slot::Host({})", h.name()),
        }
    }
}
