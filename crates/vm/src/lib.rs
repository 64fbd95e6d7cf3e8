//! The runtime type model of a dynamically-typed object system hosted on a
//! statically-typed VM.
//!
//! Every class is a first-class [`TypeObject`]: name, base list, C3
//! resolution order, slot table, version stamp, and a weak registry of its
//! direct subtypes. Attribute access runs the descriptor protocol across
//! the MRO ([`resolve`]), the same algorithm serving instance-on-type and
//! type-on-metatype access. Repeated access sites hold [`cache::GetSite`]
//! inline caches, invalidated purely by the per-type version stamp that
//! every mutation propagates through the live subtype cone.
//!
//! The crate is a library consumed by a host evaluator; it does no I/O and
//! persists nothing. Instance construction and host-native members are
//! consumed behind the [`instance::InstanceFactory`] and [`slot::HostSlot`]
//! capabilities.

pub mod cache;
pub mod context;
pub mod error;
pub mod instance;
pub mod intern;
pub mod mro;
pub mod resolve;
pub mod slot;
pub mod typeobj;
pub mod value;
pub mod version;

pub use ferrotype_common as common;

pub use cache::GetSite;
pub use context::{Context, CoreTypes};
pub use error::{AttributeError, HierarchyError};
pub use instance::{DefaultFactory, Instance, InstanceFactory, InstanceLayout, InstanceRef};
pub use mro::linearize;
pub use resolve::{delattr, getattr, setattr};
pub use slot::{HostSlot, PropertySlot, Slot, SlotTable};
pub use typeobj::{TypeFlags, TypeKind, TypeObject, TypeRef, TypeWeak};
pub use value::{BoundMethod, NativeFunction, Value};
