//! End-to-end scenarios across the whole type model: hierarchy
//! construction, attribute resolution, cache invalidation, and concurrent
//! mutation.

use ferrotype_vm::{
    AttributeError, Context, GetSite, HierarchyError, Instance, NativeFunction, PropertySlot,
    Slot, SlotTable, TypeObject, TypeRef, Value, delattr, getattr, setattr,
};

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

fn instance_of(ty: &TypeRef) -> Value {
    Value::Instance(Instance::new(ty))
}

#[test]
fn diamond_inheritance_scenario() {
    let ctx = Context::new();
    let base = user(&ctx, "Base", &[]);
    let left = user(&ctx, "Left", &[&base]);
    let right = user(&ctx, "Right", &[&base]);
    let bottom = user(&ctx, "Bottom", &[&left, &right]);
    let names: Vec<String> = bottom.mro().iter().map(|t| t.name()).collect();
    assert_eq!(names, ["Bottom", "Left", "Right", "Base", "object"]);

    // Attribute resolution follows that order.
    base.add_slot("x", Slot::value(Value::Int(0))).unwrap();
    right.add_slot("x", Slot::value(Value::Int(2))).unwrap();
    let obj = instance_of(&bottom);
    assert_eq!(getattr(&ctx, &obj, "x").unwrap(), Value::Int(2));
    left.add_slot("x", Slot::value(Value::Int(1))).unwrap();
    assert_eq!(getattr(&ctx, &obj, "x").unwrap(), Value::Int(1));
}

#[test]
fn failed_construction_registers_nothing() {
    let ctx = Context::new();
    let a = user(&ctx, "A", &[]);
    let b = user(&ctx, "B", &[&a]);
    let subtypes_before = (a.live_subtypes().len(), b.live_subtypes().len());
    // C(A, B) violates local precedence ordering.
    let err = TypeObject::new_user(
        &ctx,
        "C",
        vec![a.clone(), b.clone()],
        SlotTable::default(),
        &[],
    )
    .unwrap_err();
    assert!(matches!(err, HierarchyError::Inconsistent { .. }));
    let subtypes_after = (a.live_subtypes().len(), b.live_subtypes().len());
    assert_eq!(subtypes_before, subtypes_after);
}

#[test]
fn slot_add_invalidates_subtype_cache_scenario() {
    let ctx = Context::new();
    let base = user(&ctx, "Base", &[]);
    let derived = user(&ctx, "Derived", &[&base]);
    let obj = instance_of(&derived);
    let mut site = GetSite::new("y");
    assert!(matches!(
        site.load(&ctx, &obj),
        Err(AttributeError::NotFound { .. })
    ));
    base.add_slot("y", Slot::value(Value::Int(41))).unwrap();
    // Without any manual clearing the same site re-resolves.
    assert_eq!(site.load(&ctx, &obj).unwrap(), Value::Int(41));
}

#[test]
fn immutable_system_type_scenario() {
    let ctx = Context::new();
    let int = &ctx.types.int_type;
    let version = int.version();
    let err = int.add_slot("x", Slot::value(Value::Int(1))).unwrap_err();
    assert!(matches!(err, HierarchyError::ImmutableType { .. }));
    assert_eq!(int.version(), version);
    assert!(int.own_slot("x").is_none());
}

#[test]
fn descriptor_priority_scenario() {
    let ctx = Context::new();
    let t = user(&ctx, "T", &[]);
    let data = PropertySlot::new("x")
        .with_getter(NativeFunction::new("x", |_, _| Ok(Value::str("descriptor"))));
    t.add_slot("x", data.into()).unwrap();
    t.add_slot("y", Slot::method("y", |_, _| Ok(Value::str("method"))))
        .unwrap();

    let obj = instance_of(&t);
    let Value::Instance(raw) = &obj else { unreachable!() };
    raw.dict_set(ferrotype_vm::intern::intern("x"), Value::str("dict"));
    raw.dict_set(ferrotype_vm::intern::intern("y"), Value::str("dict"));

    // Data descriptor beats the dictionary; the dictionary beats a
    // non-data descriptor.
    assert_eq!(getattr(&ctx, &obj, "x").unwrap(), Value::str("descriptor"));
    assert_eq!(getattr(&ctx, &obj, "y").unwrap(), Value::str("dict"));
}

#[test]
fn version_monotonicity_across_mixed_mutations() {
    let ctx = Context::new();
    let a = user(&ctx, "A", &[]);
    let b = user(&ctx, "B", &[&a]);
    let c = user(&ctx, "C", &[&b]);
    let mut last = (a.version(), b.version(), c.version());
    let observe = |a: &TypeRef, b: &TypeRef, c: &TypeRef| (a.version(), b.version(), c.version());

    a.add_slot("s", Slot::value(Value::Int(1))).unwrap();
    let now = observe(&a, &b, &c);
    assert!(now.0 > last.0 && now.1 > last.1 && now.2 > last.2);
    last = now;

    b.remove_slot("missing").unwrap();
    // Removing nothing changes nothing.
    assert_eq!(observe(&a, &b, &c), last);

    b.add_slot("t", Slot::value(Value::Int(2))).unwrap();
    let now = observe(&a, &b, &c);
    assert_eq!(now.0, last.0);
    assert!(now.1 > last.1 && now.2 > last.2);
}

#[test]
fn set_bases_preserves_existing_instances() {
    let ctx = Context::new();
    let slotted = TypeObject::new_user(&ctx, "Slotted", vec![], SlotTable::default(), &["x"])
        .unwrap();
    let plain = user(&ctx, "Plain", &[]);
    let t = TypeObject::new_user(
        &ctx,
        "T",
        vec![slotted.clone()],
        SlotTable::default(),
        &[],
    )
    .unwrap();

    let old = instance_of(&t);
    setattr(&ctx, &old, "x", Value::Int(1)).unwrap();

    TypeObject::set_bases(&t, vec![plain.clone()], &ctx).unwrap();

    // The old instance keeps its allocation-time layout and storage.
    let Value::Instance(raw) = &old else { unreachable!() };
    assert_eq!(raw.layout().fields, ["x"]);
    assert_eq!(raw.get_field(0), Some(Value::Int(1)));

    // New instances follow the new layout: no indexed fields, dict granted.
    let fresh = instance_of(&t);
    let Value::Instance(raw) = &fresh else { unreachable!() };
    assert!(raw.layout().fields.is_empty());
    assert!(raw.has_dict());
    setattr(&ctx, &fresh, "x", Value::Int(2)).unwrap();
    assert_eq!(getattr(&ctx, &fresh, "x").unwrap(), Value::Int(2));
}

#[test]
fn legacy_types_participate_in_resolution() {
    let ctx = Context::new();
    let old = TypeObject::new_legacy(&ctx, "Old", vec![]).unwrap();
    old.add_slot("tag", Slot::value(Value::str("legacy"))).unwrap();
    let modern = user(&ctx, "Modern", &[&old]);
    let obj = instance_of(&modern);
    assert_eq!(getattr(&ctx, &obj, "tag").unwrap(), Value::str("legacy"));
    // Invalidation flows through the legacy link too.
    let mut site = GetSite::new("tag");
    assert_eq!(site.load(&ctx, &obj).unwrap(), Value::str("legacy"));
    old.add_slot("tag", Slot::value(Value::str("updated"))).unwrap();
    assert_eq!(site.load(&ctx, &obj).unwrap(), Value::str("updated"));
}

#[test]
fn metatype_access_uses_the_same_engine() {
    let ctx = Context::new();
    let meta = user(&ctx, "Meta", &[&ctx.types.type_type]);
    meta.add_slot("kindof", Slot::value(Value::str("meta-attr")))
        .unwrap();
    let t = TypeObject::new_user_with_metaclass(
        &ctx,
        "T",
        vec![],
        SlotTable::default(),
        &[],
        meta.clone(),
    )
    .unwrap();
    let as_value = Value::Type(t.clone());
    // Resolved on the metatype, shadowed by the type's own table, and a
    // cache on a type subject follows the same rules.
    assert_eq!(getattr(&ctx, &as_value, "kindof").unwrap(), Value::str("meta-attr"));
    setattr(&ctx, &as_value, "kindof", Value::str("own")).unwrap();
    assert_eq!(getattr(&ctx, &as_value, "kindof").unwrap(), Value::str("own"));
    delattr(&ctx, &as_value, "kindof").unwrap();
    assert_eq!(getattr(&ctx, &as_value, "kindof").unwrap(), Value::str("meta-attr"));
}

#[test]
fn concurrent_mutation_and_cached_lookup_agree() {
    let ctx = Context::new();
    let base = user(&ctx, "Base", &[]);
    let derived = user(&ctx, "Derived", &[&base]);
    base.add_slot("x", Slot::value(Value::Int(0))).unwrap();
    let obj = instance_of(&derived);

    const WRITES: i64 = 200;
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 1..=WRITES {
                base.add_slot("x", Slot::value(Value::Int(i))).unwrap();
            }
        });
        for _ in 0..4 {
            scope.spawn(|| {
                let mut site = GetSite::new("x");
                let mut last_seen = -1;
                let mut last_version = 0;
                for _ in 0..400 {
                    // Every cached read returns some value that was
                    // actually installed, and versions only move forward.
                    let Value::Int(seen) = site.load(&ctx, &obj).unwrap() else {
                        panic!("unexpected payload");
                    };
                    assert!((0..=WRITES).contains(&seen));
                    // A later-installed value can never be followed by an
                    // earlier one: the single writer installs increasing
                    // values and the version stamp orders them.
                    assert!(seen >= last_seen);
                    last_seen = seen;
                    let version = derived.version();
                    assert!(version >= last_version);
                    last_version = version;
                }
            });
        }
    });

    // After the writer finishes, a cold site and a warm site agree.
    let mut site = GetSite::new("x");
    assert_eq!(site.load(&ctx, &obj).unwrap(), Value::Int(WRITES));
    assert_eq!(getattr(&ctx, &obj, "x").unwrap(), Value::Int(WRITES));
}

#[test]
fn concurrent_bumps_of_sibling_branches_terminate() {
    let ctx = Context::new();
    let root = user(&ctx, "Root", &[]);
    let left = user(&ctx, "L", &[&root]);
    let right = user(&ctx, "R", &[&root]);
    let leaves: Vec<TypeRef> = (0..8)
        .map(|i| {
            user(
                &ctx,
                &format!("Leaf{i}"),
                &[if i % 2 == 0 { &left } else { &right }],
            )
        })
        .collect();
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..100 {
                left.add_slot("a", Slot::value(Value::Int(i))).unwrap();
            }
        });
        scope.spawn(|| {
            for i in 0..100 {
                right.add_slot("b", Slot::value(Value::Int(i))).unwrap();
            }
        });
    });
    for leaf in &leaves {
        assert!(leaf.version() > 0);
    }
}
