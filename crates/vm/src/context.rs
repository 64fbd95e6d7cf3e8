//! The genesis context: the root of the type graph.
//!
//! A [`Context`] owns the system types every resolution needs — the
//! universal root, the metatype, and the types of the host scalar values.
//! System types are created once here and are structurally immutable
//! afterwards. Hosts that want a single shared graph use
//! [`Context::genesis`]; tests and isolated embeddings build their own
//! with [`Context::new`].

use ferrotype_common::lock::LazyLock;

use crate::{
    slot::SlotTable,
    typeobj::{TypeFlags, TypeObject, TypeRef},
};

/// The system types of a context.
pub struct CoreTypes {
    /// The universal base terminating every resolution order.
    pub object_type: TypeRef,
    /// The metatype: the type of every type object.
    pub type_type: TypeRef,
    pub none_type: TypeRef,
    pub bool_type: TypeRef,
    pub int_type: TypeRef,
    pub str_type: TypeRef,
    pub function_type: TypeRef,
    pub method_type: TypeRef,
}

pub struct Context {
    pub types: CoreTypes,
}

impl Context {
    pub fn new() -> Self {
        let object_type = TypeObject::new_system(
            "object",
            vec![],
            SlotTable::default(),
            TypeFlags::BASETYPE,
            None,
        )
        .expect("the root type has no bases to conflict");
        let type_type = TypeObject::new_system(
            "type",
            vec![object_type.clone()],
            SlotTable::default(),
            TypeFlags::BASETYPE,
            None,
        )
        .expect("genesis hierarchy is consistent");
        // Knot the roots: object is a type, and type is its own type.
        object_type.set_class(type_type.clone());
        type_type.set_class(type_type.clone());

        let system = |name: &str| {
            TypeObject::new_system(
                name,
                vec![object_type.clone()],
                SlotTable::default(),
                TypeFlags::empty(),
                Some(type_type.clone()),
            )
            .expect("genesis hierarchy is consistent")
        };
        let types = CoreTypes {
            none_type: system("NoneType"),
            bool_type: system("bool"),
            int_type: system("int"),
            str_type: system("str"),
            function_type: system("function"),
            method_type: system("method"),
            object_type,
            type_type,
        };
        Self { types }
    }

    /// The process-wide shared context, built on first use.
    pub fn genesis() -> &'static Context {
        static GENESIS: LazyLock<Context> = LazyLock::new(Context::new);
        &GENESIS
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
