//! Instances, their storage layout, and the construction capability.
//!
//! The core does not evaluate user code, so instance construction is a
//! capability the host supplies; [`DefaultFactory`] covers embedders that
//! only need bare allocation plus the constructor hooks.

use std::fmt;

use ferrotype_common::{lock::PyRwLock, rc::PyRc};

use crate::{
    context::Context,
    error::AttributeError,
    intern::names,
    typeobj::TypeRef,
    value::Value,
};

/// The host-level storage shape instances of a type are allocated with:
/// the ordered indexed fields unioned along the MRO, plus the dictionary
/// and weak-reference capabilities.
///
/// A type re-derives its layout when its bases change, but every instance
/// keeps the layout it was allocated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    pub fields: Vec<&'static str>,
    pub has_dict: bool,
    pub has_weakrefs: bool,
}

/// Per-instance dynamic attribute storage.
pub type Dict = indexmap::IndexMap<&'static str, Value, ahash::RandomState>;

pub struct Instance {
    class: TypeRef,
    layout: PyRc<InstanceLayout>,
    dict: Option<PyRwLock<Dict>>,
    fields: PyRwLock<Vec<Option<Value>>>,
}

pub type InstanceRef = PyRc<Instance>;

impl Instance {
    /// Allocate a bare instance of `class` per its current layout.
    pub fn new(class: &TypeRef) -> InstanceRef {
        let layout = class.layout();
        let dict = layout.has_dict.then(|| PyRwLock::new(Dict::default()));
        let fields = PyRwLock::new(vec![None; layout.fields.len()]);
        PyRc::new(Self {
            class: class.clone(),
            layout,
            dict,
            fields,
        })
    }

    pub fn class(&self) -> &TypeRef {
        &self.class
    }

    /// The layout this instance was allocated with, which may predate the
    /// class's current one.
    pub fn layout(&self) -> &PyRc<InstanceLayout> {
        &self.layout
    }

    pub fn has_dict(&self) -> bool {
        self.dict.is_some()
    }

    pub fn dict_get(&self, name: &str) -> Option<Value> {
        self.dict.as_ref()?.read().get(name).cloned()
    }

    /// Returns false when the layout grants no dictionary.
    pub fn dict_set(&self, name: &'static str, value: Value) -> bool {
        match &self.dict {
            Some(dict) => {
                dict.write().insert(name, value);
                true
            }
            None => false,
        }
    }

    pub fn dict_remove(&self, name: &str) -> Option<Value> {
        self.dict.as_ref()?.write().shift_remove(name)
    }

    pub fn field_len(&self) -> usize {
        self.fields.read().len()
    }

    pub fn get_field(&self, index: usize) -> Option<Value> {
        self.fields.read().get(index).cloned().flatten()
    }

    /// Returns false when `index` lies outside this instance's storage
    /// (the slot was introduced by a later layout).
    pub fn set_field(&self, index: usize, value: Value) -> bool {
        let mut fields = self.fields.write();
        match fields.get_mut(index) {
            Some(cell) => {
                *cell = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn clear_field(&self, index: usize) -> Option<Value> {
        self.fields.write().get_mut(index)?.take()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name())
    }
}

/// Host capability: construct an instance of `class` from constructor
/// arguments.
pub trait InstanceFactory: Send + Sync {
    fn make_instance(
        &self,
        ctx: &Context,
        class: &TypeRef,
        args: &[Value],
    ) -> Result<Value, AttributeError>;
}

/// Allocation plus the `__new__`/`__init__` hooks, skipping both when the
/// type's cached default-constructor flag says they are absent.
pub struct DefaultFactory;

impl InstanceFactory for DefaultFactory {
    fn make_instance(
        &self,
        ctx: &Context,
        class: &TypeRef,
        args: &[Value],
    ) -> Result<Value, AttributeError> {
        if class.uses_default_new() {
            return Ok(Value::Instance(Instance::new(class)));
        }
        let obj = match class.lookup_skip_root(names::NEW) {
            Some((slot, owner)) => {
                let ctor = slot
                    .try_get(ctx, None, &owner)?
                    .ok_or_else(|| AttributeError::not_found(class.name(), names::NEW))?;
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(Value::Type(class.clone()));
                full.extend_from_slice(args);
                ctor.call(ctx, &full)
                    .ok_or_else(|| AttributeError::not_found(class.name(), names::NEW))??
            }
            None => Value::Instance(Instance::new(class)),
        };
        if let Some((slot, owner)) = class.lookup_skip_root(names::INIT) {
            let init = slot
                .try_get(ctx, Some(&obj), &owner)?
                .ok_or_else(|| AttributeError::not_found(class.name(), names::INIT))?;
            init.call(ctx, args)
                .ok_or_else(|| AttributeError::not_found(class.name(), names::INIT))??;
        }
        Ok(obj)
    }
}
