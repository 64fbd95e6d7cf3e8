//! The attribute resolution engine.
//!
//! One algorithm serves both levels of the object graph: attribute access
//! on an instance consults the instance's type, and attribute access on a
//! type consults the type's metatype, with the type's own MRO playing the
//! role the instance dictionary plays one level down. The only thing that
//! varies is which object is the "subject" and what its local storage is.
//!
//! Get protocol, in order:
//! 1. a `__getattribute__` override anywhere in the class MRO (excluding
//!    the universal root) delegates entirely; its result or failure is
//!    final;
//! 2. the first slot for the name along the class MRO — a data descriptor
//!    answers immediately, anything else is only a candidate;
//! 3. the subject's local storage (instance dictionary, or the type's own
//!    MRO for a type subject);
//! 4. the remembered non-data candidate;
//! 5. a `__getattr__` fallback anywhere in the class MRO;
//! 6. not-found.
//!
//! The resolution is split into a type-level part ([`specialize`], the MRO
//! walks) and a subject-level part ([`Specialization::execute`], the
//! dictionary probe and descriptor invocation). A call-site cache keeps the
//! former and replays the latter, which is what makes cached and uncached
//! lookups agree by construction.

use log::trace;

use crate::{
    context::Context,
    error::AttributeError,
    intern::{intern, names},
    slot::Slot,
    typeobj::TypeRef,
    value::Value,
};

/// A slot together with the MRO entry that owns it.
pub(crate) type Hook = (Slot, TypeRef);

/// The type-level outcome of resolving a name against a class: everything
/// the MRO walks can decide without seeing the subject.
pub(crate) enum Specialization {
    /// A `__getattribute__` override shadows the whole protocol.
    GetAttrOverride { slot: Slot, owner: TypeRef },
    /// A data descriptor outranks the subject's local storage.
    DataDescriptor {
        slot: Slot,
        owner: TypeRef,
        fallback: Option<Hook>,
    },
    /// A non-data descriptor (or plain class value) is shadowed by it.
    NonDataDescriptor {
        slot: Slot,
        owner: TypeRef,
        fallback: Option<Hook>,
    },
    /// No slot anywhere in the MRO: local storage, then fallback.
    Plain { fallback: Option<Hook> },
}

/// Resolve the type-level shape of `name` on `cls`.
pub(crate) fn specialize(cls: &TypeRef, name: &'static str) -> Specialization {
    if let Some((slot, owner)) = cls.lookup_skip_root(names::GETATTRIBUTE) {
        return Specialization::GetAttrOverride { slot, owner };
    }
    let fallback = cls.lookup(names::GETATTR);
    match cls.lookup(name) {
        Some((slot, owner)) if slot.is_data_descriptor() => Specialization::DataDescriptor {
            slot,
            owner,
            fallback,
        },
        Some((slot, owner)) => Specialization::NonDataDescriptor {
            slot,
            owner,
            fallback,
        },
        None => Specialization::Plain { fallback },
    }
}

impl Specialization {
    /// Run the subject-level tail of the protocol.
    pub(crate) fn execute(
        &self,
        ctx: &Context,
        obj: &Value,
        name: &'static str,
    ) -> Result<Value, AttributeError> {
        match self {
            Self::GetAttrOverride { slot, owner } => {
                let hook = slot
                    .try_get(ctx, Some(obj), owner)?
                    .ok_or_else(|| AttributeError::not_found(obj.type_name(ctx), name))?;
                call_hook(ctx, &hook, obj, &[Value::str(name)])
                    .unwrap_or_else(|| Err(AttributeError::not_found(obj.type_name(ctx), name)))
            }
            Self::DataDescriptor {
                slot,
                owner,
                fallback,
            } => {
                if let Some(value) = slot.try_get(ctx, Some(obj), owner)? {
                    return Ok(value);
                }
                // The descriptor holds no value for this subject (e.g. an
                // unset indexed field); only the fallback remains.
                fallback_get(ctx, fallback, obj, name)
            }
            Self::NonDataDescriptor {
                slot,
                owner,
                fallback,
            } => {
                // A candidate only: the local probe must complete first.
                if let Some(value) = local_get(ctx, obj, name)? {
                    return Ok(value);
                }
                if let Some(value) = slot.try_get(ctx, Some(obj), owner)? {
                    return Ok(value);
                }
                fallback_get(ctx, fallback, obj, name)
            }
            Self::Plain { fallback } => {
                if let Some(value) = local_get(ctx, obj, name)? {
                    return Ok(value);
                }
                fallback_get(ctx, fallback, obj, name)
            }
        }
    }
}

/// Resolve `obj.name`.
pub fn getattr(ctx: &Context, obj: &Value, name: &str) -> Result<Value, AttributeError> {
    let name = intern(name);
    let cls = obj.class(ctx);
    trace!("getattr '{}'.{name}", cls.name());
    specialize(&cls, name).execute(ctx, obj, name)
}

/// Assign `obj.name = value`.
pub fn setattr(ctx: &Context, obj: &Value, name: &str, value: Value) -> Result<(), AttributeError> {
    let name = intern(name);
    let cls = obj.class(ctx);
    trace!("setattr '{}'.{name}", cls.name());
    if let Some((slot, owner)) = cls.lookup_skip_root(names::SETATTR) {
        let hook = slot
            .try_get(ctx, Some(obj), &owner)?
            .ok_or_else(|| AttributeError::unsettable(obj.type_name(ctx), name))?;
        return match call_hook(ctx, &hook, obj, &[Value::str(name), value]) {
            Some(result) => result.map(drop),
            None => Err(AttributeError::unsettable(obj.type_name(ctx), name)),
        };
    }
    if let Some((slot, _owner)) = cls.lookup(name) {
        if slot.try_set(ctx, obj, &value)? {
            return Ok(());
        }
    }
    local_set(ctx, obj, name, value)
}

/// Delete `obj.name`.
pub fn delattr(ctx: &Context, obj: &Value, name: &str) -> Result<(), AttributeError> {
    let name = intern(name);
    let cls = obj.class(ctx);
    trace!("delattr '{}'.{name}", cls.name());
    if let Some((slot, owner)) = cls.lookup_skip_root(names::DELATTR) {
        let hook = slot
            .try_get(ctx, Some(obj), &owner)?
            .ok_or_else(|| AttributeError::undeletable(obj.type_name(ctx), name))?;
        return match call_hook(ctx, &hook, obj, &[Value::str(name)]) {
            Some(result) => result.map(drop),
            None => Err(AttributeError::undeletable(obj.type_name(ctx), name)),
        };
    }
    if let Some((slot, _owner)) = cls.lookup(name) {
        if slot.try_delete(ctx, obj)? {
            return Ok(());
        }
    }
    local_delete(ctx, obj, name)
}

/// The subject's own storage: the dictionary for an instance, the type's
/// own MRO (with class-level descriptor binding) for a type subject.
fn local_get(ctx: &Context, obj: &Value, name: &str) -> Result<Option<Value>, AttributeError> {
    match obj {
        Value::Type(ty) => match ty.lookup(name) {
            Some((slot, owner)) => slot.try_get(ctx, None, &owner),
            None => Ok(None),
        },
        Value::Instance(instance) => Ok(instance.dict_get(name)),
        // Host scalars carry no per-object storage.
        _ => Ok(None),
    }
}

fn local_set(
    ctx: &Context,
    obj: &Value,
    name: &'static str,
    value: Value,
) -> Result<(), AttributeError> {
    match obj {
        Value::Type(ty) => ty.add_slot(name, Slot::value(value)).map_err(|err| {
            trace!("setattr on type '{}' rejected: {err}", ty.name());
            AttributeError::unsettable(ty.name(), name)
        }),
        Value::Instance(instance) => {
            if instance.dict_set(name, value) {
                Ok(())
            } else {
                Err(AttributeError::unsettable(obj.type_name(ctx), name))
            }
        }
        _ => Err(AttributeError::unsettable(obj.type_name(ctx), name)),
    }
}

fn local_delete(ctx: &Context, obj: &Value, name: &'static str) -> Result<(), AttributeError> {
    match obj {
        Value::Type(ty) => match ty.remove_slot(name) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(AttributeError::not_found(ty.name(), name)),
            Err(err) => {
                trace!("delattr on type '{}' rejected: {err}", ty.name());
                Err(AttributeError::undeletable(ty.name(), name))
            }
        },
        Value::Instance(instance) => match instance.dict_remove(name) {
            Some(_) => Ok(()),
            None => Err(AttributeError::not_found(obj.type_name(ctx), name)),
        },
        _ => Err(AttributeError::undeletable(obj.type_name(ctx), name)),
    }
}

fn fallback_get(
    ctx: &Context,
    fallback: &Option<Hook>,
    obj: &Value,
    name: &'static str,
) -> Result<Value, AttributeError> {
    let Some((slot, owner)) = fallback else {
        return Err(AttributeError::not_found(obj.type_name(ctx), name));
    };
    let hook = slot
        .try_get(ctx, Some(obj), owner)?
        .ok_or_else(|| AttributeError::not_found(obj.type_name(ctx), name))?;
    call_hook(ctx, &hook, obj, &[Value::str(name)])
        .unwrap_or_else(|| Err(AttributeError::not_found(obj.type_name(ctx), name)))
}

/// Invoke a protocol hook, prepending the subject when the hook resolved to
/// an unbound function. `None` means the resolved value is not callable.
fn call_hook(
    ctx: &Context,
    hook: &Value,
    obj: &Value,
    extra: &[Value],
) -> Option<Result<Value, AttributeError>> {
    match hook {
        Value::BoundMethod(_) => hook.call(ctx, extra),
        Value::Function(_) => {
            let mut args = Vec::with_capacity(extra.len() + 1);
            args.push(obj.clone());
            args.extend_from_slice(extra);
            hook.call(ctx, &args)
        }
        _ => None,
    }
}
