//! End-to-end recompilation: assembled GCN words in, structured SPIR-V out.

mod common;

use common::*;
use orbis_gcn::ops::{sop1, sop2, sopc, sopp};
use orbis_ir::spv::Op;
use orbis_recompiler::{recompile, Environment, RecompileError};
use pretty_assertions::assert_eq;

fn compute_env() -> Environment {
    Environment::compute(vec![])
}

#[test]
fn empty_shader_returns_through_the_epilogue() {
    init_tracing();
    let program = vec![ENDPGM];
    let result = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("recompile");

    let ctx = parse_output(&result.spirv);
    assert_module_shape(&ctx);
    assert_structured(&ctx);

    // Entry block, program block, epilogue: all straight branches into one
    // OpReturn.
    assert!(labels(&ctx).len() >= 2);
    assert_eq!(find_instructions(&ctx, Op::Return).len(), 1);
    assert!(!find_instructions(&ctx, Op::Branch).is_empty());
    assert_eq!(result.spirv[0], 0x0723_0203);
}

#[test]
fn mov_writes_the_constant_before_the_epilogue() {
    // s_mov_b32 s0, 42; s_endpgm
    let program = vec![sop1_word(sop1::MOV_B32, 0, 128 + 42), ENDPGM];
    let result = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("recompile");

    let ctx = parse_output(&result.spirv);
    assert_structured(&ctx);

    // A store of the constant 42 must exist in the function body.
    let stores = find_instructions(&ctx, Op::Store);
    let stores_forty_two = stores.iter().any(|&store| {
        ctx.operand_value(store, 1).is_some_and(|value| {
            ctx.is_spv(value, Op::Constant) && ctx.operand(value, 1).as_i32() == Some(42)
        })
    });
    assert!(stores_forty_two, "expected a store of 42 into s[0]");
}

#[test]
fn resolvable_indirect_branch_becomes_direct() {
    init_tracing();
    // s_getpc_b64 s[0:1]          ; s[0:1] = 4
    // s_add_u32 s0, s0, 12        ; s0 = 16
    // s_addc_u32 s1, s1, 0        ; carries through scc
    // s_setpc_b64 s[0:1]          ; must fold to a branch to 16
    // s_endpgm                    ; at 16
    let program = vec![
        sop1_word(sop1::GETPC_B64, 0, 0),
        sop2_word(sop2::ADD_U32, 0, 0, 128 + 12),
        sop2_word(sop2::ADDC_U32, 1, 1, 128),
        sop1_word(sop1::SETPC_B64, 0, 0),
        ENDPGM,
    ];
    let result = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("the indirect branch is statically resolvable");

    let ctx = parse_output(&result.spirv);
    assert_module_shape(&ctx);
    assert_structured(&ctx);
    // The placeholder is gone: only plain branches and the final return.
    assert_eq!(find_instructions(&ctx, Op::Return).len(), 1);
}

#[test]
fn unresolvable_indirect_branch_is_reported() {
    // s_setpc_b64 s[0:1] with nothing ever written to s[0:1].
    let program = vec![sop1_word(sop1::SETPC_B64, 0, 0), ENDPGM];
    let error = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect_err("must not resolve");
    match error {
        RecompileError::UnresolvedBranch { address } => assert_eq!(address, 0),
        other => panic!("expected UnresolvedBranch, got {other}"),
    }
}

#[test]
fn conditional_diamond_is_structured() {
    // s_cmp_eq_u32 s0, s1
    // s_cbranch_scc1 +2
    // s_mov_b32 s2, 1
    // s_branch +1
    // s_mov_b32 s2, 2
    // s_endpgm
    let program = vec![
        sopc_word(sopc::CMP_EQ_U32, 0, 1),
        sopp_word(sopp::CBRANCH_SCC1, 2),
        sop1_word(sop1::MOV_B32, 2, 128 + 1),
        sopp_word(sopp::BRANCH, 1),
        sop1_word(sop1::MOV_B32, 2, 128 + 2),
        ENDPGM,
    ];
    let result = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("recompile");

    let ctx = parse_output(&result.spirv);
    assert_structured(&ctx);

    let conditionals = find_instructions(&ctx, Op::BranchConditional);
    assert_eq!(conditionals.len(), 1, "one structured conditional");
    let merge_inst = ctx.prev(conditionals[0]).expect("preceding instruction");
    assert_eq!(
        ctx.spv_op(merge_inst),
        Some(Op::SelectionMerge),
        "the diamond header declares a selection merge"
    );
}

#[test]
fn counted_loop_gets_a_loop_merge() {
    // s_add_u32 s0, s0, -1
    // s_cmp_eq_u32 s0, 0
    // s_cbranch_scc0 -3        ; loop while s0 != 0
    // s_endpgm
    let program = vec![
        sop2_word(sop2::ADD_U32, 0, 0, 193),
        sopc_word(sopc::CMP_EQ_U32, 0, 128),
        sopp_word(sopp::CBRANCH_SCC0, -3),
        ENDPGM,
    ];
    let result = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("recompile");

    let ctx = parse_output(&result.spirv);
    assert_structured(&ctx);

    let loop_merges = find_instructions(&ctx, Op::LoopMerge);
    assert_eq!(loop_merges.len(), 1, "one loop construct");
    let merge = ctx.operand_value(loop_merges[0], 0).expect("merge label");
    let continue_label = ctx.operand_value(loop_merges[0], 1).expect("continue label");
    assert_ne!(merge, continue_label, "distinct merge and continue blocks");
}

#[test]
fn user_sgprs_seed_the_register_file() {
    let mut env = compute_env();
    env.user_sgprs = vec![0x11, 0x22, 0x33];

    let program = vec![ENDPGM];
    let result =
        recompile(&env, &build_semantic_module(), 0, reader(program)).expect("recompile");

    // Every seeded slot lowers to a constant store and is reported as bound.
    assert_eq!(result.required_user_sgprs, 0b111);

    let ctx = parse_output(&result.spirv);
    for expected in [0x11i32, 0x22, 0x33] {
        let found = find_instructions(&ctx, Op::Store).iter().any(|&store| {
            ctx.operand_value(store, 1).is_some_and(|value| {
                ctx.is_spv(value, Op::Constant)
                    && ctx.operand(value, 1).as_i32() == Some(expected)
            })
        });
        assert!(found, "expected seeded store of {expected:#x}");
    }
}

#[test]
fn trailing_literals_fold_into_constants() {
    // s_mov_b32 s0, 0xDEADBEEF (literal); s_endpgm
    let program = vec![sop1_word(sop1::MOV_B32, 0, 255), 0xDEAD_BEEF, ENDPGM];
    let result = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("recompile");

    let ctx = parse_output(&result.spirv);
    let found = find_instructions(&ctx, Op::Store).iter().any(|&store| {
        ctx.operand_value(store, 1).is_some_and(|value| {
            ctx.is_spv(value, Op::Constant)
                && ctx.operand(value, 1).as_i32() == Some(0xDEAD_BEEFu32 as i32)
        })
    });
    assert!(found, "the trailing literal must lower to a constant store");
}

#[test]
fn missing_semantic_is_a_module_error() {
    // s_nand_b32 has no semantic in the test module.
    let program = vec![sop2_word(sop2::NAND_B32, 0, 0, 1), ENDPGM];
    let error = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect_err("no semantic available");
    assert!(
        matches!(error, RecompileError::BadSemanticModule(_)),
        "expected BadSemanticModule, got {error}"
    );
}

#[test]
fn emitted_modules_are_deterministic() {
    let program = vec![
        sopc_word(sopc::CMP_EQ_U32, 0, 1),
        sopp_word(sopp::CBRANCH_SCC1, 2),
        sop1_word(sop1::MOV_B32, 2, 128 + 1),
        sopp_word(sopp::BRANCH, 1),
        sop1_word(sop1::MOV_B32, 2, 128 + 2),
        ENDPGM,
    ];
    let first = recompile(
        &compute_env(),
        &build_semantic_module(),
        0,
        reader(program.clone()),
    )
    .expect("recompile");
    let second = recompile(&compute_env(), &build_semantic_module(), 0, reader(program))
        .expect("recompile");
    assert_eq!(first.spirv, second.spirv);
}
