//! The type object: the runtime representation of a class.
//!
//! Every type is a first-class object carrying its name, direct bases,
//! resolution order, slot table, version stamp and a weak registry of its
//! direct subtypes. Mutations are serialized per type by the interior
//! locks; the version stamp is written with release ordering only after the
//! mutation is fully published, so a lock-free reader comparing a captured
//! version can never validate a cache entry against a half-applied change.

use std::{collections::HashSet, fmt};

use crossbeam_utils::atomic::AtomicCell;
use ferrotype_common::{
    atomic::{AtomicU64, Ordering},
    lock::{OnceCell, PyRwLock},
    rc::{PyRc, PyWeak},
};
use log::debug;

use crate::{
    context::Context,
    error::HierarchyError,
    instance::InstanceLayout,
    intern::{intern, names},
    mro::{self, MroOverrides},
    slot::{Slot, SlotTable},
    version::next_version,
};

pub type TypeRef = PyRc<TypeObject>;
pub type TypeWeak = PyWeak<TypeObject>;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u64 {
        /// May be subclassed.
        const BASETYPE = 1 << 0;
        /// This type itself grants its instances a dynamic dictionary.
        const HAS_DICT = 1 << 1;
        /// This type itself grants its instances weak-reference support.
        const HAS_WEAKREFS = 1 << 2;
        /// Trait-like host type: kept out of the concrete C3 merge and
        /// appended after concrete ancestors.
        const INTERFACE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Host-native; structurally immutable once created.
    System,
    /// Dynamically defined; slot table and bases stay mutable for life.
    User,
    /// Bridges the pre-unification class model; no indexed fields, no
    /// internal C3 linearization.
    Legacy,
}

/// Lazily recomputed answer to "does this type use the default
/// constructor?". Any version bump resets it to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtorCache {
    Unknown,
    Default,
    Custom,
}

pub struct TypeObject {
    name: PyRwLock<Box<str>>,
    kind: TypeKind,
    flags: TypeFlags,
    bases: PyRwLock<Vec<TypeRef>>,
    mro: PyRwLock<Vec<TypeRef>>,
    subtypes: PyRwLock<Vec<TypeWeak>>,
    slots: PyRwLock<SlotTable>,
    version: AtomicU64,
    layout: PyRwLock<PyRc<InstanceLayout>>,
    /// Indexed fields this type itself declared; fixed at creation.
    declared_fields: Box<[&'static str]>,
    /// The metatype. Set once during construction; self-referential for
    /// the root metatype.
    class_: OnceCell<TypeRef>,
    ctor_cache: AtomicCell<CtorCache>,
}

impl TypeObject {
    fn alloc(
        name: &str,
        kind: TypeKind,
        flags: TypeFlags,
        bases: Vec<TypeRef>,
        slots: SlotTable,
        layout: InstanceLayout,
        declared_fields: Box<[&'static str]>,
    ) -> TypeRef {
        PyRc::new(Self {
            name: PyRwLock::new(name.into()),
            kind,
            flags,
            bases: PyRwLock::new(bases),
            mro: PyRwLock::new(vec![]),
            subtypes: PyRwLock::new(vec![]),
            slots: PyRwLock::new(slots),
            version: AtomicU64::new(next_version()),
            layout: PyRwLock::new(PyRc::new(layout)),
            declared_fields,
            class_: OnceCell::new(),
            ctor_cache: AtomicCell::new(CtorCache::Unknown),
        })
    }

    /// Create a host-native type. System types are structurally immutable
    /// after this call returns. `metaclass` is `None` only while the
    /// genesis roots are being knotted together.
    pub fn new_system(
        name: &str,
        bases: Vec<TypeRef>,
        attrs: SlotTable,
        flags: TypeFlags,
        metaclass: Option<TypeRef>,
    ) -> Result<TypeRef, HierarchyError> {
        check_duplicate_bases(&bases)?;
        let layout = compute_layout(&bases, &[], flags)?;
        let ty = Self::alloc(name, TypeKind::System, flags, bases.clone(), attrs, layout, Box::new([]));
        *ty.mro.write() = if bases.is_empty() {
            vec![ty.clone()]
        } else {
            let root = ancestral_root(&bases);
            mro::linearize(&ty, &bases, &root)?
        };
        if let Some(metaclass) = metaclass {
            ty.set_class(metaclass);
        }
        for base in &bases {
            base.register_subtype(&ty);
        }
        Ok(ty)
    }

    /// Create a trait-like host type that participates in MROs only as an
    /// appended segment.
    pub fn new_interface(ctx: &Context, name: &str) -> TypeRef {
        Self::new_system(
            name,
            vec![ctx.types.object_type.clone()],
            SlotTable::default(),
            TypeFlags::INTERFACE,
            Some(ctx.types.type_type.clone()),
        )
        .expect("single-base interface hierarchy is consistent")
    }

    /// Create a dynamically defined type.
    ///
    /// `fields` declares indexed fields of the instance layout; declaring
    /// any suppresses the instance dictionary unless a base grants one.
    /// Fails without side effects on duplicate bases, layout conflicts and
    /// unlinearizable hierarchies.
    pub fn new_user(
        ctx: &Context,
        name: &str,
        bases: Vec<TypeRef>,
        attrs: SlotTable,
        fields: &[&str],
    ) -> Result<TypeRef, HierarchyError> {
        Self::new_user_with_metaclass(ctx, name, bases, attrs, fields, ctx.types.type_type.clone())
    }

    pub fn new_user_with_metaclass(
        ctx: &Context,
        name: &str,
        mut bases: Vec<TypeRef>,
        mut attrs: SlotTable,
        fields: &[&str],
        metaclass: TypeRef,
    ) -> Result<TypeRef, HierarchyError> {
        if bases.is_empty() {
            bases.push(ctx.types.object_type.clone());
        }
        check_duplicate_bases(&bases)?;

        let mut flags = TypeFlags::BASETYPE;
        if fields.is_empty() {
            flags |= TypeFlags::HAS_DICT;
        }
        let declared: Box<[&'static str]> = fields.iter().map(|f| intern(f)).collect();
        let layout = compute_layout(&bases, &declared, flags)?;

        // Declared fields resolve as data descriptors over the indexed
        // storage, continuing the inherited layout's offsets.
        let inherited = layout.fields.len() - declared.len();
        for (i, field) in declared.iter().enumerate() {
            attrs.insert(*field, Slot::field(field, inherited + i));
        }

        let ty = Self::alloc(name, TypeKind::User, flags, bases.clone(), attrs, layout, declared);
        *ty.mro.write() = mro::linearize(&ty, &bases, &ctx.types.object_type)?;
        ty.set_class(metaclass);
        for base in &bases {
            base.register_subtype(&ty);
        }
        debug!("created user type '{name}' v{}", ty.version());
        Ok(ty)
    }

    /// Create a legacy (pre-unification) type. Its resolution order is the
    /// classic depth-first, left-to-right walk, and inside a modern C3
    /// merge it contributes only itself.
    pub fn new_legacy(
        ctx: &Context,
        name: &str,
        bases: Vec<TypeRef>,
    ) -> Result<TypeRef, HierarchyError> {
        check_duplicate_bases(&bases)?;
        let layout = InstanceLayout {
            fields: vec![],
            has_dict: true,
            has_weakrefs: false,
        };
        let ty = Self::alloc(
            name,
            TypeKind::Legacy,
            TypeFlags::BASETYPE | TypeFlags::HAS_DICT,
            bases.clone(),
            SlotTable::default(),
            layout,
            Box::new([]),
        );
        *ty.mro.write() = mro::classic_linearize(&ty, &bases, &ctx.types.object_type);
        ty.set_class(ctx.types.type_type.clone());
        for base in &bases {
            base.register_subtype(&ty);
        }
        Ok(ty)
    }

    pub fn name(&self) -> String {
        self.name.read().to_string()
    }

    /// Rename the type. System-type names are immutable.
    pub fn set_name(&self, name: &str) -> Result<(), HierarchyError> {
        if self.kind == TypeKind::System {
            return Err(HierarchyError::ImmutableType { name: self.name() });
        }
        *self.name.write() = name.into();
        Ok(())
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }

    /// Stable identity, distinct from the name.
    pub fn id(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    pub fn is(&self, other: &TypeObject) -> bool {
        self.id() == other.id()
    }

    /// The live version stamp. Paired with the release store in
    /// [`TypeObject::bump`]: an acquire load here observes every slot-table
    /// write that preceded the stamp.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// The metatype.
    pub fn class(&self) -> &TypeRef {
        self.class_.get().expect("type metaclass not initialized")
    }

    pub(crate) fn set_class(&self, metaclass: TypeRef) {
        self.class_
            .set(metaclass)
            .unwrap_or_else(|_| panic!("metaclass of '{}' initialized twice", self.name()));
    }

    pub fn bases(&self) -> Vec<TypeRef> {
        self.bases.read().clone()
    }

    pub fn mro(&self) -> Vec<TypeRef> {
        self.mro.read().clone()
    }

    pub fn layout(&self) -> PyRc<InstanceLayout> {
        self.layout.read().clone()
    }

    pub fn has_dict(&self) -> bool {
        self.layout.read().has_dict
    }

    /// This type's own slot for `name`, ignoring the ancestry.
    pub fn own_slot(&self, name: &str) -> Option<Slot> {
        self.slots.read().get(name).cloned()
    }

    /// First slot for `name` along the resolution order, with the type
    /// that owns it.
    pub fn lookup(&self, name: &str) -> Option<(Slot, TypeRef)> {
        let mro = self.mro.read();
        for ty in mro.iter() {
            if let Some(slot) = ty.slots.read().get(name) {
                return Some((slot.clone(), ty.clone()));
            }
        }
        None
    }

    /// Like [`TypeObject::lookup`] but never consults the universal root,
    /// whose behavior for the reserved protocol names is the generic
    /// engine itself.
    pub(crate) fn lookup_skip_root(&self, name: &str) -> Option<(Slot, TypeRef)> {
        let mro = self.mro.read();
        for ty in &mro[..mro.len() - 1] {
            if let Some(slot) = ty.slots.read().get(name) {
                return Some((slot.clone(), ty.clone()));
            }
        }
        None
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn is_subtype(&self, other: &TypeObject) -> bool {
        self.mro.read().iter().any(|t| t.is(other))
    }

    /// Whether `value` is an instance of this type or of a subtype.
    pub fn is_instance(&self, ctx: &Context, value: &crate::value::Value) -> bool {
        value.class(ctx).is_subtype(self)
    }

    /// The direct subtypes still alive, pruning stale entries as a side
    /// effect.
    pub fn live_subtypes(&self) -> Vec<TypeRef> {
        let mut subs = self.subtypes.write();
        let mut live = Vec::with_capacity(subs.len());
        subs.retain(|weak| match weak.upgrade() {
            Some(ty) => {
                live.push(ty);
                true
            }
            None => false,
        });
        live
    }

    fn register_subtype(&self, child: &TypeRef) {
        self.subtypes.write().push(PyRc::downgrade(child));
    }

    fn unregister_subtype(&self, child_id: usize) {
        self.subtypes
            .write()
            .retain(|weak| weak.upgrade().is_some_and(|ty| ty.id() != child_id));
    }

    /// Union of every slot visible on this type, later MRO entries
    /// shadowed by earlier ones. For host `dir()`-style introspection.
    pub fn attributes(&self) -> SlotTable {
        let mut table = SlotTable::default();
        for ty in self.mro().iter().rev() {
            for (name, slot) in ty.slots.read().iter() {
                table.insert(*name, slot.clone());
            }
        }
        table
    }

    /// Whether construction can skip the constructor/initializer hooks.
    /// Cached per type; any version bump anywhere in the ancestry resets
    /// the cache.
    pub fn uses_default_new(&self) -> bool {
        match self.ctor_cache.load() {
            CtorCache::Default => true,
            CtorCache::Custom => false,
            CtorCache::Unknown => {
                let custom = self.lookup_skip_root(names::NEW).is_some()
                    || self.lookup_skip_root(names::INIT).is_some();
                self.ctor_cache.store(if custom {
                    CtorCache::Custom
                } else {
                    CtorCache::Default
                });
                !custom
            }
        }
    }

    /// Install or replace a slot. Bumps this type's version and,
    /// transitively, every live subtype's.
    pub fn add_slot(&self, name: &str, slot: Slot) -> Result<(), HierarchyError> {
        if self.kind == TypeKind::System {
            return Err(HierarchyError::ImmutableType { name: self.name() });
        }
        let name = intern(name);
        self.slots.write().insert(name, slot);
        debug!("'{}': slot '{name}' installed", self.name());
        self.bump();
        Ok(())
    }

    /// Remove a slot. `Ok(None)` means nothing was installed under `name`
    /// and nothing changed; the resolution layer surfaces that as a
    /// not-found failure.
    pub fn remove_slot(&self, name: &str) -> Result<Option<Slot>, HierarchyError> {
        if self.kind == TypeKind::System {
            return Err(HierarchyError::ImmutableType { name: self.name() });
        }
        let removed = self.slots.write().shift_remove(name);
        if removed.is_some() {
            debug!("'{}': slot '{name}' removed", self.name());
            self.bump();
        }
        Ok(removed)
    }

    /// Stamp a fresh version on this type and every live descendant.
    ///
    /// The subtype list is copied out under the owner's lock before
    /// recursing, so no two type locks are ever held at once. The visited
    /// set keeps the walk terminating even if a buggy base-list mutation
    /// ever produced a cyclic subtype graph.
    pub fn bump(&self) {
        let mut seen = HashSet::new();
        self.bump_inner(&mut seen);
    }

    fn bump_inner(&self, seen: &mut HashSet<usize>) {
        if !seen.insert(self.id()) {
            return;
        }
        self.ctor_cache.store(CtorCache::Unknown);
        self.version.store(next_version(), Ordering::Release);
        for subtype in self.live_subtypes() {
            subtype.bump_inner(seen);
        }
    }

    /// Replace the base list.
    ///
    /// Revalidates layout compatibility, rejects inheritance cycles,
    /// recomputes the resolution order of this type and of every live
    /// descendant (all validated before anything is published), relinks
    /// the weak subtype registrations, and bumps versions transitively.
    /// On any error nothing has changed.
    ///
    /// Instances allocated before the call keep the layout they were
    /// allocated with; only future allocations see the new one.
    pub fn set_bases(
        zelf: &TypeRef,
        mut new_bases: Vec<TypeRef>,
        ctx: &Context,
    ) -> Result<(), HierarchyError> {
        if zelf.kind == TypeKind::System {
            return Err(HierarchyError::ImmutableType { name: zelf.name() });
        }
        if new_bases.is_empty() {
            new_bases.push(ctx.types.object_type.clone());
        }
        check_duplicate_bases(&new_bases)?;
        for base in &new_bases {
            if base.is(zelf) || base.mro().iter().any(|t| t.is(zelf)) {
                return Err(HierarchyError::Inconsistent {
                    bases: zelf.name(),
                });
            }
        }
        let new_layout = compute_layout(&new_bases, &zelf.declared_fields, zelf.flags)?;

        let root = &ctx.types.object_type;
        let new_mro = mro::linearize(zelf, &new_bases, root)?;

        // Validate the whole descendant cone against the pending MRO before
        // committing anything: either every linearization succeeds or the
        // mutation reports failure with no observable change. A descendant
        // is linearized only after every base of it inside the cone has its
        // pending MRO in place.
        let mut overrides = MroOverrides::new();
        overrides.insert(zelf.id(), new_mro.clone());
        let descendants = collect_descendants(zelf);
        let mut cone: HashSet<usize> = descendants.iter().map(|t| t.id()).collect();
        cone.insert(zelf.id());
        for ty in &descendants {
            plan_mro(ty, root, &cone, &mut overrides)?;
        }

        // Commit. Bases, MRO and layout of this type swap under its own
        // locks in one critical section; no reader sees them out of step.
        let old_bases;
        {
            let mut bases_guard = zelf.bases.write();
            let mut mro_guard = zelf.mro.write();
            let mut layout_guard = zelf.layout.write();
            old_bases = std::mem::replace(&mut *bases_guard, new_bases.clone());
            *mro_guard = new_mro;
            *layout_guard = PyRc::new(new_layout);
        }
        for old in &old_bases {
            if !new_bases.iter().any(|b| b.is(old)) {
                old.unregister_subtype(zelf.id());
            }
        }
        for new in &new_bases {
            if !old_bases.iter().any(|b| b.is(new)) {
                new.register_subtype(zelf);
            }
        }
        for ty in &descendants {
            if let Some(mro) = overrides.remove(&ty.id()) {
                *ty.mro.write() = mro;
            }
        }
        zelf.bump();
        debug!("'{}': bases replaced, v{}", zelf.name(), zelf.version());
        Ok(())
    }
}

impl fmt::Display for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name.read())
    }
}

impl fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Type {}]", self.name.read())
    }
}

fn check_duplicate_bases(bases: &[TypeRef]) -> Result<(), HierarchyError> {
    let mut seen = HashSet::new();
    for base in bases {
        if !seen.insert(base.id()) {
            return Err(HierarchyError::DuplicateBase { name: base.name() });
        }
    }
    Ok(())
}

/// The universal root reachable from `bases`: the terminal entry of the
/// first base's resolution order.
fn ancestral_root(bases: &[TypeRef]) -> TypeRef {
    let mro = bases[0].mro.read();
    mro.last().expect("resolution order is never empty").clone()
}

/// Union the instance layout along the prospective ancestry.
///
/// At most one chain of indexed fields may flow in: every field-carrying
/// base's layout must be a prefix of the longest one (the solid base),
/// otherwise the shapes cannot coexist in one allocation.
fn compute_layout(
    bases: &[TypeRef],
    declared: &[&'static str],
    own_flags: TypeFlags,
) -> Result<InstanceLayout, HierarchyError> {
    let mut solid: Option<PyRc<InstanceLayout>> = None;
    let mut has_dict = own_flags.contains(TypeFlags::HAS_DICT);
    let mut has_weakrefs = own_flags.contains(TypeFlags::HAS_WEAKREFS);
    for base in bases {
        let layout = base.layout();
        has_dict |= layout.has_dict;
        has_weakrefs |= layout.has_weakrefs;
        if layout.fields.is_empty() {
            continue;
        }
        solid = match solid {
            None => Some(layout),
            Some(current) => {
                let (longer, shorter) = if layout.fields.len() >= current.fields.len() {
                    (layout, current)
                } else {
                    (current, layout)
                };
                if longer.fields[..shorter.fields.len()] != shorter.fields[..] {
                    return Err(HierarchyError::LayoutConflict);
                }
                Some(longer)
            }
        };
    }
    let mut fields = solid.map(|s| s.fields.clone()).unwrap_or_default();
    fields.extend_from_slice(declared);
    Ok(InstanceLayout {
        fields,
        has_dict,
        has_weakrefs,
    })
}

/// Snapshot of the live descendant cone, each type once.
fn collect_descendants(ty: &TypeRef) -> Vec<TypeRef> {
    let mut seen = HashSet::from([ty.id()]);
    let mut order = vec![];
    let mut queue: Vec<TypeRef> = ty.live_subtypes();
    while let Some(next) = queue.pop() {
        if !seen.insert(next.id()) {
            continue;
        }
        queue.extend(next.live_subtypes());
        order.push(next);
    }
    order
}

/// Compute the pending MRO of `ty`, first planning every base of `ty` that
/// lies inside the mutated cone, so each linearization sees its bases'
/// pending orders rather than their stale ones.
fn plan_mro(
    ty: &TypeRef,
    root: &TypeRef,
    cone: &HashSet<usize>,
    overrides: &mut MroOverrides,
) -> Result<(), HierarchyError> {
    if overrides.contains_key(&ty.id()) {
        return Ok(());
    }
    let bases = ty.bases();
    for base in &bases {
        if cone.contains(&base.id()) {
            plan_mro(base, root, cone, overrides)?;
        }
    }
    let mro = mro::linearize_with(ty, &bases, root, overrides)?;
    overrides.insert(ty.id(), mro);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

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

    #[test]
    fn duplicate_bases_are_rejected() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let err =
            TypeObject::new_user(&ctx, "B", vec![a.clone(), a.clone()], SlotTable::default(), &[])
                .unwrap_err();
        assert_eq!(err, HierarchyError::DuplicateBase { name: "A".into() });
    }

    #[test]
    fn mutation_bumps_version_strictly() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let v0 = a.version();
        a.add_slot("x", Slot::value(crate::value::Value::Int(1))).unwrap();
        let v1 = a.version();
        assert!(v1 > v0);
        a.remove_slot("x").unwrap();
        assert!(a.version() > v1);
    }

    #[test]
    fn ancestor_mutation_bumps_every_live_subtype() {
        let ctx = Context::new();
        let base = user(&ctx, "Base", &[]);
        let mid = user(&ctx, "Mid", &[&base]);
        let leaf = user(&ctx, "Leaf", &[&mid]);
        let (vm, vl) = (mid.version(), leaf.version());
        base.add_slot("x", Slot::value(crate::value::Value::Int(1))).unwrap();
        assert!(mid.version() > vm);
        assert!(leaf.version() > vl);
    }

    #[test]
    fn dropped_subtypes_are_pruned() {
        let ctx = Context::new();
        let base = user(&ctx, "Base", &[]);
        {
            let _transient = user(&ctx, "Transient", &[&base]);
            assert_eq!(base.live_subtypes().len(), 1);
        }
        assert!(base.live_subtypes().is_empty());
    }

    #[test]
    fn system_types_are_immutable() {
        let ctx = Context::new();
        let int = &ctx.types.int_type;
        let before = int.version();
        let err = int
            .add_slot("x", Slot::value(crate::value::Value::Int(1)))
            .unwrap_err();
        assert!(matches!(err, HierarchyError::ImmutableType { .. }));
        assert!(int.own_slot("x").is_none());
        assert_eq!(int.version(), before);
        assert!(matches!(
            int.remove_slot("x"),
            Err(HierarchyError::ImmutableType { .. })
        ));
        assert!(matches!(
            int.set_name("renamed"),
            Err(HierarchyError::ImmutableType { .. })
        ));
    }

    #[test]
    fn user_types_can_be_renamed() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        a.set_name("Renamed").unwrap();
        assert_eq!(a.name(), "Renamed");
    }

    #[test]
    fn layout_conflict_between_field_bases() {
        let ctx = Context::new();
        let a = TypeObject::new_user(&ctx, "A", vec![], SlotTable::default(), &["x"]).unwrap();
        let b = TypeObject::new_user(&ctx, "B", vec![], SlotTable::default(), &["y"]).unwrap();
        let err = TypeObject::new_user(
            &ctx,
            "C",
            vec![a.clone(), b.clone()],
            SlotTable::default(),
            &[],
        )
        .unwrap_err();
        assert_eq!(err, HierarchyError::LayoutConflict);
    }

    #[test]
    fn field_layout_extends_down_a_single_chain() {
        let ctx = Context::new();
        let a = TypeObject::new_user(&ctx, "A", vec![], SlotTable::default(), &["x"]).unwrap();
        let b = TypeObject::new_user(&ctx, "B", vec![a.clone()], SlotTable::default(), &["y"])
            .unwrap();
        assert_eq!(b.layout().fields, ["x", "y"]);
        // Diamond over the same field-carrying base is not a conflict.
        let l = user(&ctx, "L", &[&b]);
        let r = user(&ctx, "R", &[&b]);
        let bottom = TypeObject::new_user(
            &ctx,
            "Bottom",
            vec![l.clone(), r.clone()],
            SlotTable::default(),
            &[],
        )
        .unwrap();
        assert_eq!(bottom.layout().fields, ["x", "y"]);
    }

    #[test]
    fn declaring_fields_suppresses_the_dictionary() {
        let ctx = Context::new();
        let slotted = TypeObject::new_user(&ctx, "Slotted", vec![], SlotTable::default(), &["x"])
            .unwrap();
        assert!(!slotted.has_dict());
        let open = user(&ctx, "Open", &[]);
        assert!(open.has_dict());
        // Inheriting from a dict-granting base re-grants it.
        let child = TypeObject::new_user(
            &ctx,
            "Child",
            vec![open.clone()],
            SlotTable::default(),
            &["y"],
        )
        .unwrap();
        assert!(child.has_dict());
    }

    #[test]
    fn set_bases_relinks_and_recomputes() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let b = user(&ctx, "B", &[]);
        let t = user(&ctx, "T", &[&a]);
        assert_eq!(t.mro().len(), 3);
        TypeObject::set_bases(&t, vec![b.clone()], &ctx).unwrap();
        assert!(t.mro().iter().any(|x| x.is(&b)));
        assert!(!t.mro().iter().any(|x| x.is(&a)));
        assert!(a.live_subtypes().is_empty());
        assert_eq!(b.live_subtypes().len(), 1);
    }

    #[test]
    fn set_bases_rejects_cycles_without_side_effects() {
        let ctx = Context::new();
        let a = user(&ctx, "A", &[]);
        let b = user(&ctx, "B", &[&a]);
        let before = a.mro();
        let err = TypeObject::set_bases(&a, vec![b.clone()], &ctx).unwrap_err();
        assert!(matches!(err, HierarchyError::Inconsistent { .. }));
        assert_eq!(a.mro().len(), before.len());
        assert_eq!(a.live_subtypes().len(), 1);
    }

    #[test]
    fn set_bases_updates_descendant_mros() {
        let ctx = Context::new();
        let old_base = user(&ctx, "OldBase", &[]);
        let new_base = user(&ctx, "NewBase", &[]);
        let mid = user(&ctx, "Mid", &[&old_base]);
        let leaf = user(&ctx, "Leaf", &[&mid]);
        TypeObject::set_bases(&mid, vec![new_base.clone()], &ctx).unwrap();
        assert!(leaf.mro().iter().any(|t| t.is(&new_base)));
        assert!(!leaf.mro().iter().any(|t| t.is(&old_base)));
    }

    #[test]
    fn default_ctor_flag_invalidates_across_the_cone() {
        let ctx = Context::new();
        let base = user(&ctx, "Base", &[]);
        let leaf = user(&ctx, "Leaf", &[&base]);
        assert!(leaf.uses_default_new());
        base.add_slot(
            names::INIT,
            Slot::method("__init__", |_, _| Ok(crate::value::Value::None)),
        )
        .unwrap();
        assert!(!leaf.uses_default_new());
    }

    #[test]
    fn is_subtype_follows_the_mro() {
        let ctx = Context::new();
        let base = user(&ctx, "Base", &[]);
        let leaf = user(&ctx, "Leaf", &[&base]);
        assert!(leaf.is_subtype(&base));
        assert!(leaf.is_subtype(&ctx.types.object_type));
        assert!(!base.is_subtype(&leaf));
    }
}
