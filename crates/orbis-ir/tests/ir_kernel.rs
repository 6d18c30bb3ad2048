use orbis_ir::spv::{Op, StorageClass};
use orbis_ir::{clone_node, Builder, Context, Kind, Location, Node, Operand, OverrideMap};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn types_are_interned_by_structure() {
    let mut ctx = Context::new();
    let a = ctx.type_int(32, false);
    let b = ctx.type_int(32, false);
    assert_eq!(a, b);

    let signed = ctx.type_int(32, true);
    assert_ne!(a, signed);

    let vec_a = ctx.type_vector(a, 2);
    let vec_b = ctx.type_vector(b, 2);
    assert_eq!(vec_a, vec_b);

    let ptr_a = ctx.type_pointer(StorageClass::Private, vec_a);
    let ptr_b = ctx.type_pointer(StorageClass::Private, vec_b);
    assert_eq!(ptr_a, ptr_b);
    let ptr_fn = ctx.type_pointer(StorageClass::Function, vec_a);
    assert_ne!(ptr_a, ptr_fn);
}

#[test]
fn constants_are_interned_per_type() {
    let mut ctx = Context::new();
    assert_eq!(ctx.const_u32(7), ctx.const_u32(7));
    assert_ne!(ctx.const_u32(7), ctx.const_u32(8));
    // Same bit pattern under a different type is a different constant.
    assert_ne!(ctx.const_u32(7), ctx.const_i32(7));
    assert_eq!(ctx.const_bool(true), ctx.const_bool(true));
    assert_ne!(ctx.const_bool(true), ctx.const_bool(false));
}

#[test]
fn use_lists_track_operands_exactly_once() {
    let mut ctx = Context::new();
    let region = ctx.create_region();
    let u32_type = ctx.type_uint32();
    let one = ctx.const_u32(1);

    let mut builder = Builder::append(&mut ctx, region);
    let loc = Location::Unknown;
    let sum = builder.i_add(loc, u32_type, one, one);

    // `one` appears as two distinct operand slots of `sum`.
    let sites: Vec<_> = ctx
        .uses(one)
        .iter()
        .filter(|site| site.user == sum)
        .collect();
    assert_eq!(sites.len(), 2);
    let mut indices: Vec<usize> = sites.iter().map(|site| site.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2]);
}

#[test]
fn replace_all_uses_moves_the_use_list() {
    let mut ctx = Context::new();
    let region = ctx.create_region();
    let u32_type = ctx.type_uint32();
    let one = ctx.const_u32(1);
    let loc = Location::Unknown;

    let temp = {
        let mut builder = Builder::append(&mut ctx, region);
        builder.undef(loc, u32_type)
    };
    let sum = {
        let mut builder = Builder::append(&mut ctx, region);
        builder.i_add(loc, u32_type, temp, one)
    };

    let replacement = ctx.const_u32(9);
    let before = ctx.uses(replacement).len();
    ctx.replace_all_uses_with(temp, replacement);

    assert!(ctx.uses(temp).is_empty());
    assert_eq!(ctx.uses(replacement).len(), before + 1);
    assert_eq!(ctx.operand_value(sum, 1), Some(replacement));

    // With no uses left the node can be removed.
    ctx.remove(temp);
    assert!(ctx.parent(temp).is_none());
}

#[test]
fn erase_operand_keeps_use_indices_consistent() {
    let mut ctx = Context::new();
    let region = ctx.create_region();
    let u32_type = ctx.type_uint32();
    let a = ctx.const_u32(10);
    let b = ctx.const_u32(20);

    let mut builder = Builder::append(&mut ctx, region);
    let node = builder.emit_value(
        Location::Unknown,
        Kind::Spv,
        Op::CompositeConstruct as u32,
        vec![u32_type.into(), a.into(), b.into()],
    );

    ctx.erase_operand(node, 1);
    assert_eq!(ctx.operands(node).len(), 2);
    assert_eq!(ctx.operand_value(node, 1), Some(b));
    // b's use site must have shifted from index 2 to index 1.
    assert!(ctx
        .uses(b)
        .iter()
        .any(|site| site.user == node && site.index == 1));
    assert!(!ctx.uses(a).iter().any(|site| site.user == node));
}

#[test]
fn region_linking_preserves_order() {
    let mut ctx = Context::new();
    let region = ctx.create_region();
    let loc = Location::Unknown;

    let (first, second, third) = {
        let mut builder = Builder::append(&mut ctx, region);
        let first = builder.label(loc);
        let third = builder.label(loc);
        (first, ctx.create(loc, Kind::Spv, Op::Label as u32, true, vec![]), third)
    };
    ctx.insert_after(first, second);

    assert_eq!(ctx.children_vec(region), vec![first, second, third]);

    ctx.unlink(second);
    assert_eq!(ctx.children_vec(region), vec![first, third]);
    ctx.insert_before(first, second);
    assert_eq!(ctx.children_vec(region), vec![second, first, third]);
}

#[test]
fn clone_remaps_internal_references_and_honors_pins() {
    let mut ctx = Context::new();
    let region = ctx.create_region();
    let u32_type = ctx.type_uint32();
    let one = ctx.const_u32(1);
    let loc = Location::Unknown;

    let base = {
        let mut builder = Builder::append(&mut ctx, region);
        builder.undef(loc, u32_type)
    };
    let sum = {
        let mut builder = Builder::append(&mut ctx, region);
        builder.i_add(loc, u32_type, base, one)
    };

    let mut cmap = OverrideMap::new();
    // Interned nodes and the shared operand stay pinned.
    cmap.pin(u32_type);
    cmap.pin(one);

    let cloned_sum = clone_node(&mut ctx, sum, &mut cmap);
    assert_ne!(cloned_sum, sum);
    assert_eq!(ctx.operand_value(cloned_sum, 0), Some(u32_type));
    assert_eq!(ctx.operand_value(cloned_sum, 2), Some(one));

    let cloned_base = ctx.operand_value(cloned_sum, 1).expect("operand");
    assert_ne!(cloned_base, base, "unpinned operand must be cloned");
    assert_eq!(ctx.op_of(cloned_base), ctx.op_of(base));
}

proptest! {
    /// Interning is a pure function of structure: any sequence of integer
    /// type requests yields identical nodes for identical parameters.
    #[test]
    fn interning_is_deterministic(widths in proptest::collection::vec((1u32..=64, any::<bool>()), 1..32)) {
        let mut ctx = Context::new();
        let first: Vec<Node> = widths.iter().map(|&(w, s)| ctx.type_int(w, s)).collect();
        let second: Vec<Node> = widths.iter().map(|&(w, s)| ctx.type_int(w, s)).collect();
        prop_assert_eq!(first, second);
    }

    /// Every value operand of every instruction appears in the value's use
    /// list exactly once.
    #[test]
    fn use_lists_stay_consistent(values in proptest::collection::vec(0u32..8, 1..24)) {
        let mut ctx = Context::new();
        let region = ctx.create_region();
        let u32_type = ctx.type_uint32();
        let constants: Vec<Node> = (0..8).map(|v| ctx.const_u32(v)).collect();

        let mut created = Vec::new();
        for pair in values.chunks(2) {
            let lhs = constants[pair[0] as usize];
            let rhs = constants[*pair.get(1).unwrap_or(&0) as usize];
            let mut builder = Builder::append(&mut ctx, region);
            created.push(builder.i_add(Location::Unknown, u32_type, lhs, rhs));
        }

        for &node in &created {
            for (index, operand) in ctx.operands(node).iter().enumerate() {
                if let Some(value) = operand.as_value() {
                    let count = ctx
                        .uses(value)
                        .iter()
                        .filter(|site| site.user == node && site.index == index)
                        .count();
                    prop_assert_eq!(count, 1);
                }
            }
        }
    }
}

#[test]
fn operand_accessors_roundtrip() {
    let op: Operand = 3i32.into();
    assert_eq!(op.as_i32(), Some(3));
    let op: Operand = true.into();
    assert_eq!(op.as_bool(), Some(true));
    let op: Operand = "main".into();
    assert_eq!(op.as_str(), Some("main"));
}
