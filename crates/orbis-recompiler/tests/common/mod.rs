//! Shared builders for the recompiler integration tests: a small semantic
//! module compiled from IR, GCN word encoders, and structural checks over
//! emitted SPIR-V.
#![allow(dead_code)]

use orbis_ir::analysis::{branch_targets, terminator_of};
use orbis_ir::spv::{self, Op, StorageClass};
use orbis_ir::{Builder, Context, Kind, Location, Node, Operand};
use std::collections::HashSet;

/// Wires `tracing` output into the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Builds a semantic module covering the scalar ALU subset the tests use:
/// `add_u32`, `addc_u32` (carry through `scc`), and `cmp_eq_u32`.
pub fn build_semantic_module() -> Vec<u32> {
    let mut ctx = Context::new();
    let loc = Location::Unknown;

    let caps = ctx.section(spv::Section::Capabilities);
    Builder::append(&mut ctx, caps).emit(
        loc,
        Kind::Spv,
        Op::Capability as u32,
        vec![Operand::Int32(spv::CAPABILITY_SHADER)],
    );
    let memory_model = ctx.section(spv::Section::MemoryModel);
    Builder::append(&mut ctx, memory_model).emit(
        loc,
        Kind::Spv,
        Op::MemoryModel as u32,
        vec![
            Operand::Int32(spv::ADDRESSING_MODEL_LOGICAL),
            Operand::Int32(spv::MEMORY_MODEL_GLSL450),
        ],
    );

    let bool_type = ctx.type_bool();
    let u32_type = ctx.type_uint32();
    let void_type = ctx.type_void();

    // The carry/compare bit lives in the canonical `scc` register variable.
    let scc = {
        let pointer = ctx.type_pointer(StorageClass::Private, bool_type);
        let globals = ctx.section(spv::Section::Globals);
        let variable =
            Builder::append(&mut ctx, globals).variable(loc, pointer, StorageClass::Private);
        let debugs = ctx.section(spv::Section::Debugs);
        Builder::append(&mut ctx, debugs).name(loc, variable, "scc");
        variable
    };

    let param_pointer = ctx.type_pointer(StorageClass::Function, u32_type);
    let binary_fn = ctx.type_function(u32_type, &[param_pointer, param_pointer]);
    let compare_fn = ctx.type_function(void_type, &[param_pointer, param_pointer]);

    let begin_function =
        |ctx: &mut Context, name: &str, return_type: Node, fn_type: Node| -> (Node, Node, Node) {
            let functions = ctx.section(spv::Section::Functions);
            let function = Builder::append(ctx, functions).emit_value(
                loc,
                Kind::Spv,
                Op::Function as u32,
                vec![
                    return_type.into(),
                    Operand::Int32(spv::FUNCTION_CONTROL_NONE),
                    fn_type.into(),
                ],
            );
            let p0 = Builder::append(ctx, functions).emit_value(
                loc,
                Kind::Spv,
                Op::FunctionParameter as u32,
                vec![param_pointer.into()],
            );
            let p1 = Builder::append(ctx, functions).emit_value(
                loc,
                Kind::Spv,
                Op::FunctionParameter as u32,
                vec![param_pointer.into()],
            );
            Builder::append(ctx, functions).label(loc);
            let debugs = ctx.section(spv::Section::Debugs);
            Builder::append(ctx, debugs).name(loc, function, name);
            (function, p0, p1)
        };

    // add_u32(a, b) -> a + b, carry in scc.
    {
        let (_, p0, p1) = begin_function(&mut ctx, "add_u32(uu;)", u32_type, binary_fn);
        let functions = ctx.section(spv::Section::Functions);
        let mut builder = Builder::append(&mut ctx, functions);
        let a = builder.load(loc, u32_type, p0);
        let b = builder.load(loc, u32_type, p1);
        let sum = builder.i_add(loc, u32_type, a, b);
        let carry = builder.binary(loc, Op::ULessThan, bool_type, sum, a);
        builder.store(loc, scc, carry);
        builder.emit(loc, Kind::Spv, Op::ReturnValue as u32, vec![sum.into()]);
        builder.emit(loc, Kind::Spv, Op::FunctionEnd as u32, vec![]);
    }

    // addc_u32(a, b) -> a + b + scc, carry back into scc.
    {
        let (_, p0, p1) = begin_function(&mut ctx, "addc_u32(uu;)", u32_type, binary_fn);
        let one = ctx.const_u32(1);
        let zero = ctx.const_u32(0);
        let functions = ctx.section(spv::Section::Functions);
        let mut builder = Builder::append(&mut ctx, functions);
        let a = builder.load(loc, u32_type, p0);
        let b = builder.load(loc, u32_type, p1);
        let carry_in = builder.load(loc, bool_type, scc);
        let carry_word = builder.select(loc, u32_type, carry_in, one, zero);
        let partial = builder.i_add(loc, u32_type, a, b);
        let sum = builder.i_add(loc, u32_type, partial, carry_word);
        let carry = builder.binary(loc, Op::ULessThan, bool_type, sum, a);
        builder.store(loc, scc, carry);
        builder.emit(loc, Kind::Spv, Op::ReturnValue as u32, vec![sum.into()]);
        builder.emit(loc, Kind::Spv, Op::FunctionEnd as u32, vec![]);
    }

    // cmp_eq_u32(a, b): scc = (a == b).
    {
        let (_, p0, p1) = begin_function(&mut ctx, "cmp_eq_u32(uu;)", void_type, compare_fn);
        let functions = ctx.section(spv::Section::Functions);
        let mut builder = Builder::append(&mut ctx, functions);
        let a = builder.load(loc, u32_type, p0);
        let b = builder.load(loc, u32_type, p1);
        let equal = builder.binary(loc, Op::IEqual, bool_type, a, b);
        builder.store(loc, scc, equal);
        builder.ret(loc);
        builder.emit(loc, Kind::Spv, Op::FunctionEnd as u32, vec![]);
    }

    spv::serialize(&ctx, 0)
}

// ---- GCN word encoders --------------------------------------------------

pub fn sop1_word(op: u32, sdst: u32, ssrc0: u32) -> u32 {
    (0b1_0111_1101 << 23) | (sdst << 16) | (op << 8) | ssrc0
}

pub fn sop2_word(op: u32, sdst: u32, ssrc0: u32, ssrc1: u32) -> u32 {
    (0b10 << 30) | (op << 23) | (sdst << 16) | (ssrc1 << 8) | ssrc0
}

pub fn sopc_word(op: u32, ssrc0: u32, ssrc1: u32) -> u32 {
    (0b1_0111_1110 << 23) | (op << 16) | (ssrc1 << 8) | ssrc0
}

pub fn sopp_word(op: u32, simm: i16) -> u32 {
    (0b1_0111_1111 << 23) | (op << 16) | (simm as u16 as u32)
}

pub const ENDPGM: u32 = 0xBF81_0000;

/// Word fetch over an in-memory program based at 0.
pub fn reader(words: Vec<u32>) -> impl FnMut(u64) -> u32 {
    move |address| {
        let index = usize::try_from(address / 4).expect("address fits");
        words[index]
    }
}

// ---- output inspection --------------------------------------------------

pub fn parse_output(spirv: &[u32]) -> Context {
    let mut ctx = Context::new();
    spv::deserialize(&mut ctx, spirv).expect("emitted SPIR-V deserializes");
    ctx
}

pub fn function_section_nodes(ctx: &Context) -> Vec<Node> {
    ctx.section_if_present(spv::Section::Functions)
        .map(|region| ctx.children_vec(region))
        .unwrap_or_default()
}

pub fn labels(ctx: &Context) -> Vec<Node> {
    function_section_nodes(ctx)
        .into_iter()
        .filter(|&node| ctx.is_spv(node, Op::Label))
        .collect()
}

pub fn find_instructions(ctx: &Context, op: Op) -> Vec<Node> {
    function_section_nodes(ctx)
        .into_iter()
        .filter(|&node| ctx.is_spv(node, op))
        .collect()
}

/// Structurizer soundness over emitted code: every multi-successor block
/// carries `OpSelectionMerge` or `OpLoopMerge`, and merge labels are unique.
pub fn assert_structured(ctx: &Context) {
    let mut merges: HashSet<Node> = HashSet::new();
    for label in labels(ctx) {
        let Some(terminator) = terminator_of(ctx, label) else {
            continue;
        };
        let successors = branch_targets(ctx, terminator);
        let merge_inst = ctx.prev(terminator).filter(|&prev| {
            matches!(
                ctx.spv_op(prev),
                Some(Op::SelectionMerge) | Some(Op::LoopMerge)
            )
        });
        if successors.len() > 1 {
            assert!(
                merge_inst.is_some(),
                "multi-successor block without a merge declaration"
            );
        }
        if let Some(merge_inst) = merge_inst {
            let merge = ctx.operand_value(merge_inst, 0).expect("merge label");
            assert!(merges.insert(merge), "merge block shared by two headers");
        }
    }
}

/// The emitted module has no instruction outside the SPIR-V dialect and a
/// single entry point named "main".
pub fn assert_module_shape(ctx: &Context) {
    let entry_points = ctx
        .section_if_present(spv::Section::EntryPoints)
        .map(|region| ctx.children_vec(region))
        .unwrap_or_default();
    assert_eq!(entry_points.len(), 1, "exactly one entry point");
    assert_eq!(
        ctx.operand(entry_points[0], 2).as_str(),
        Some("main"),
        "entry point is named main"
    );
}
