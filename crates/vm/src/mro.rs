//! Method resolution order.
//!
//! C3-style merge: repeatedly select the head of the first sequence whose
//! head appears in no other sequence's tail. Python additionally requires
//! that the direct bases keep their written order (local precedence
//! ordering); for classes A(), B(A) we must reject C(A, B) even though the
//! plain merge would accept [C, B, A, root], so no direct base may appear
//! in the tail of a base listed after it.
//!
//! Two degraded paths: a legacy (old-style) base has no internal
//! linearization and enters the merge as an opaque single-node segment;
//! interface-like bases are kept out of the concrete merge entirely and
//! appended after the concrete ancestors, just before the terminal root.

use std::collections::HashMap;

use ferrotype_common::rc::PyRc;
use itertools::Itertools;

use crate::{
    error::HierarchyError,
    typeobj::{TypeKind, TypeRef},
};

/// Pending MRO replacements, keyed by type identity. Used by base-list
/// mutation to validate a whole subtype cone before committing anything.
pub(crate) type MroOverrides = HashMap<usize, Vec<TypeRef>>;

/// Linearize `ty` over its direct `bases`. `root` is the universal base
/// that terminates every resolution order.
pub fn linearize(
    ty: &TypeRef,
    bases: &[TypeRef],
    root: &TypeRef,
) -> Result<Vec<TypeRef>, HierarchyError> {
    linearize_with(ty, bases, root, &MroOverrides::new())
}

pub(crate) fn linearize_with(
    ty: &TypeRef,
    bases: &[TypeRef],
    root: &TypeRef,
    overrides: &MroOverrides,
) -> Result<Vec<TypeRef>, HierarchyError> {
    let (concrete, interfaces): (Vec<TypeRef>, Vec<TypeRef>) = bases
        .iter()
        .cloned()
        .partition(|b| !b.is_interface());

    let segments: Vec<Vec<TypeRef>> = concrete
        .iter()
        .map(|b| base_segment(b, overrides))
        .collect();

    // An inheritance cycle shows up as the new type already being an
    // ancestor of one of its bases.
    if segments.iter().flatten().any(|t| PyRc::ptr_eq(t, ty)) {
        return Err(inconsistent(bases));
    }

    // Local precedence ordering: no direct base may be an ancestor of a
    // base listed after it.
    for (i, segment) in segments.iter().enumerate() {
        let base = &segment[0];
        for later in &segments[i + 1..] {
            if later[1..].iter().any(|t| PyRc::ptr_eq(t, base)) {
                return Err(inconsistent(bases));
            }
        }
    }

    let mut result = vec![ty.clone()];
    result.extend(merge(segments).ok_or_else(|| inconsistent(bases))?);

    if !interfaces.is_empty() {
        append_interfaces(&mut result, &interfaces, root);
    }

    // Legacy-only (or empty) ancestries do not reach the root on their own.
    if !result.iter().any(|t| PyRc::ptr_eq(t, root)) {
        result.push(root.clone());
    }

    Ok(result)
}

/// Classic (pre-unification) linearization: depth-first, left-to-right,
/// first occurrence wins, root-terminated. Used for legacy types only.
pub(crate) fn classic_linearize(ty: &TypeRef, bases: &[TypeRef], root: &TypeRef) -> Vec<TypeRef> {
    fn visit(t: &TypeRef, root: &TypeRef, order: &mut Vec<TypeRef>) {
        if PyRc::ptr_eq(t, root) || order.iter().any(|o| PyRc::ptr_eq(o, t)) {
            return;
        }
        order.push(t.clone());
        for base in t.bases() {
            visit(&base, root, order);
        }
    }

    let mut order = vec![ty.clone()];
    for base in bases {
        visit(base, root, &mut order);
    }
    order.push(root.clone());
    order
}

/// The merge segment a direct base contributes: its own MRO for a modern
/// type (possibly overridden during a pending mutation), or just the base
/// itself for a legacy type, which has no internal linearization to merge.
fn base_segment(base: &TypeRef, overrides: &MroOverrides) -> Vec<TypeRef> {
    if base.kind() == TypeKind::Legacy {
        return vec![base.clone()];
    }
    match overrides.get(&base.id()) {
        Some(mro) => mro.clone(),
        None => base.mro(),
    }
}

fn merge(mut segments: Vec<Vec<TypeRef>>) -> Option<Vec<TypeRef>> {
    let mut result = vec![];
    while !segments.is_empty() {
        result.push(take_next_base(&mut segments)?);
        segments.retain(|s| !s.is_empty());
    }
    Some(result)
}

fn take_next_base(segments: &mut [Vec<TypeRef>]) -> Option<TypeRef> {
    for segment in segments.iter() {
        let head = segment[0].clone();
        if !segments
            .iter()
            .any(|s| s[1..].iter().any(|t| PyRc::ptr_eq(t, &head)))
        {
            for segment in segments.iter_mut() {
                if PyRc::ptr_eq(&segment[0], &head) {
                    segment.remove(0);
                }
            }
            return Some(head);
        }
    }
    None
}

/// Append interface bases (and their interface ancestors) after the
/// concrete ancestors, immediately before the terminal root. Concrete
/// ancestors are never reordered by this step.
fn append_interfaces(result: &mut Vec<TypeRef>, interfaces: &[TypeRef], root: &TypeRef) {
    let had_root = result
        .last()
        .is_some_and(|t| PyRc::ptr_eq(t, root));
    if had_root {
        result.pop();
    }
    for iface in interfaces {
        for t in iface.mro() {
            if PyRc::ptr_eq(&t, root) || result.iter().any(|o| PyRc::ptr_eq(o, &t)) {
                continue;
            }
            result.push(t);
        }
    }
    if had_root {
        result.push(root.clone());
    }
}

fn inconsistent(bases: &[TypeRef]) -> HierarchyError {
    HierarchyError::Inconsistent {
        bases: bases.iter().map(|b| b.name()).format(", ").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Context, slot::SlotTable, typeobj::TypeObject};

    fn user(ctx: &Context, name: &str, bases: &[&TypeRef]) -> TypeRef {
        TypeObject::new_user(
            ctx,
            name,
            bases.iter().map(|b| (*b).clone()).collect(),
            SlotTable::default(),
            &[],
        )
        .unwrap()
    }

    fn names(mro: &[TypeRef]) -> Vec<String> {
        mro.iter().map(|t| t.name()).collect()
    }

    #[test]
    fn single_inheritance_chain() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let b = user(&ctx, "B", &[&a]);
        assert_eq!(names(&b.mro()), ["B", "A", "object"]);
    }

    #[test]
    fn diamond_resolves_without_duplicates() {
        let ctx = Context::new();
        let base = user(&ctx, "Base", &[]);
        let left = user(&ctx, "Left", &[&base]);
        let right = user(&ctx, "Right", &[&base]);
        let bottom = user(&ctx, "Bottom", &[&left, &right]);
        assert_eq!(
            names(&bottom.mro()),
            ["Bottom", "Left", "Right", "Base", "object"]
        );
    }

    #[test]
    fn base_order_is_preserved() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let b = user(&ctx, "B", &[]);
        let c = user(&ctx, "C", &[&a, &b]);
        assert_eq!(names(&c.mro()), ["C", "A", "B", "object"]);
    }

    #[test]
    fn local_precedence_violation_is_rejected() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let b = user(&ctx, "B", &[&a]);
        // C(A, B) requires A before B, but B's own MRO requires B before A.
        let err = TypeObject::new_user(
            &ctx,
            "C",
            vec![a.clone(), b.clone()],
            SlotTable::default(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, HierarchyError::Inconsistent { .. }));
    }

    #[test]
    fn contradictory_orderings_are_rejected() {
        let ctx = Context::new();
        let x = user(&ctx, "X", &[]);
        let y = user(&ctx, "Y", &[]);
        let a = user(&ctx, "A", &[&x, &y]);
        let b = user(&ctx, "B", &[&y, &x]);
        let err = TypeObject::new_user(
            &ctx,
            "C",
            vec![a.clone(), b.clone()],
            SlotTable::default(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, HierarchyError::Inconsistent { .. }));
    }

    #[test]
    fn legacy_base_is_an_opaque_segment() {
        let ctx = Context::new();
        let old_base = TypeObject::new_legacy(&ctx, "OldBase", vec![]).unwrap();
        let old = TypeObject::new_legacy(&ctx, "Old", vec![old_base.clone()]).unwrap();
        // The legacy type's own chain is visible on itself...
        assert_eq!(names(&old.mro()), ["Old", "OldBase", "object"]);
        // ...but inside a modern merge it contributes only itself.
        let modern = user(&ctx, "Modern", &[&old]);
        assert_eq!(names(&modern.mro()), ["Modern", "Old", "object"]);
    }

    #[test]
    fn interfaces_append_after_concrete_ancestors() {
        let ctx = Context::new();
        let iface = TypeObject::new_interface(&ctx, "Readable");
        let base = user(&ctx, "Base", &[]);
        let t = TypeObject::new_user(
            &ctx,
            "T",
            vec![base.clone(), iface.clone()],
            SlotTable::default(),
            &[],
        )
        .unwrap();
        assert_eq!(names(&t.mro()), ["T", "Base", "Readable", "object"]);
    }

    #[test]
    fn every_mro_is_root_terminated_and_duplicate_free() {
        let ctx = Context::new();
        let base = user(&ctx, "Base", &[]);
        let left = user(&ctx, "Left", &[&base]);
        let right = user(&ctx, "Right", &[&base]);
        let bottom = user(&ctx, "Bottom", &[&left, &right]);
        for t in [&base, &left, &right, &bottom] {
            let mro = t.mro();
            assert!(PyRc::ptr_eq(mro.last().unwrap(), &ctx.types.object_type));
            for (i, a) in mro.iter().enumerate() {
                for b in &mro[i + 1..] {
                    assert!(!PyRc::ptr_eq(a, b), "duplicate in MRO of {}", t.name());
                }
            }
        }
    }
}
