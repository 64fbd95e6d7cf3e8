//! Error kinds of the type model.
//!
//! Construction and mutation failures ([`HierarchyError`]) are fatal to the
//! call that raised them and never leave a partially-applied mutation
//! behind. Resolution failures ([`AttributeError`]) are ordinary results
//! the host translates into its own attribute-error semantics. Nothing in
//! this crate retries.

use thiserror::Error;

/// A type-construction or type-mutation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// No linearization satisfies the C3 constraints.
    #[error("cannot create a consistent method resolution order (MRO) for bases {bases}")]
    Inconsistent { bases: String },

    /// Two direct bases contribute incompatible instance layouts.
    #[error("multiple bases have instance lay-out conflict")]
    LayoutConflict,

    /// Attempted structural mutation of a system type.
    #[error("cannot modify immutable type '{name}'")]
    ImmutableType { name: String },

    /// The same type appears twice among the direct bases.
    #[error("duplicate base class {name}")]
    DuplicateBase { name: String },
}

/// An attribute-resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("'{type_name}' object has no attribute '{name}'")]
    NotFound { type_name: String, name: String },

    #[error("attribute '{name}' of '{type_name}' objects is not writable")]
    Unsettable { type_name: String, name: String },

    #[error("attribute '{name}' of '{type_name}' objects cannot be deleted")]
    Undeletable { type_name: String, name: String },
}

impl AttributeError {
    pub fn not_found(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn unsettable(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Unsettable {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn undeletable(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Undeletable {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}
