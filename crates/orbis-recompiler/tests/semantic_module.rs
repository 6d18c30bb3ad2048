//! Semantic module loading: mnemonic matching, access discovery, and the
//! register layout check.

mod common;

use common::build_semantic_module;
use orbis_gcn::ops::{sop2, sopc, vopc};
use orbis_gcn::{Access, Family};
use orbis_ir::spv::{self, Op, StorageClass};
use orbis_ir::{Builder, Context, Kind, Location, Operand};
use orbis_recompiler::registers::RegId;
use orbis_recompiler::{SemanticError, SemanticModule};

#[test]
fn matches_short_mnemonics_across_families() {
    let mut ctx = Context::new();
    let module = SemanticModule::load(&mut ctx, &build_semantic_module()).expect("load");

    let add = module
        .find(Kind::Gcn(Family::Sop2), sop2::ADD_U32)
        .expect("add_u32 semantic");
    assert_eq!(add.params.len(), 2);
    assert!(add.params.iter().all(|param| param.access == Access::R));

    // The short name also binds the VOPC comparison with the same mnemonic.
    assert!(module
        .find(Kind::Gcn(Family::Sopc), sopc::CMP_EQ_U32)
        .is_some());
    assert!(module
        .find(Kind::Gcn(Family::Vopc), vopc::CMP_EQ_U32)
        .is_some());

    // Nothing was declared for shifts.
    assert!(module.find(Kind::Gcn(Family::Sop2), sop2::LSHL_B32).is_none());
}

#[test]
fn discovers_register_accesses() {
    let mut ctx = Context::new();
    let module = SemanticModule::load(&mut ctx, &build_semantic_module()).expect("load");

    assert!(module.registers.contains_key(&RegId::Scc));

    let add = module
        .find(Kind::Gcn(Family::Sop2), sop2::ADD_U32)
        .expect("add_u32 semantic");
    assert_eq!(add.register_access.get(&RegId::Scc), Some(&Access::W));

    // addc reads the carry in and writes it back out.
    let addc = module
        .find(Kind::Gcn(Family::Sop2), sop2::ADDC_U32)
        .expect("addc_u32 semantic");
    assert_eq!(addc.register_access.get(&RegId::Scc), Some(&Access::RW));
}

#[test]
fn rejects_register_variables_with_wrong_layout() {
    // A module that declares `scc` as a 32-bit integer instead of a bool.
    let mut ctx = Context::new();
    let loc = Location::Unknown;
    let u32_type = ctx.type_uint32();
    let pointer = ctx.type_pointer(StorageClass::Private, u32_type);
    let globals = ctx.section(spv::Section::Globals);
    let variable = Builder::append(&mut ctx, globals).variable(loc, pointer, StorageClass::Private);
    let debugs = ctx.section(spv::Section::Debugs);
    Builder::append(&mut ctx, debugs).name(loc, variable, "scc");
    let words = spv::serialize(&ctx, 0);

    let mut target = Context::new();
    let error = SemanticModule::load(&mut target, &words).expect_err("layout must be rejected");
    assert!(matches!(error, SemanticError::RegisterLayout { ref name } if name == "scc"));
}

#[test]
fn ignores_unnamed_and_unmatched_functions() {
    // A function whose name matches no mnemonic is kept but unmapped.
    let mut ctx = Context::new();
    let loc = Location::Unknown;
    let void_type = ctx.type_void();
    let fn_type = ctx.type_function(void_type, &[]);
    let functions = ctx.section(spv::Section::Functions);
    let function = Builder::append(&mut ctx, functions).emit_value(
        loc,
        Kind::Spv,
        Op::Function as u32,
        vec![
            void_type.into(),
            Operand::Int32(spv::FUNCTION_CONTROL_NONE),
            fn_type.into(),
        ],
    );
    {
        let functions = ctx.section(spv::Section::Functions);
        let mut builder = Builder::append(&mut ctx, functions);
        builder.label(loc);
        builder.ret(loc);
        builder.emit(loc, Kind::Spv, Op::FunctionEnd as u32, vec![]);
    }
    let debugs = ctx.section(spv::Section::Debugs);
    Builder::append(&mut ctx, debugs).name(loc, function, "helper_fn(;)");
    let words = spv::serialize(&ctx, 0);

    let mut target = Context::new();
    let module = SemanticModule::load(&mut target, &words).expect("load");
    assert!(module
        .find(Kind::Gcn(Family::Sop2), sop2::ADD_U32)
        .is_none());
}
