//! GCN → SPIR-V shader recompiler.
//!
//! [`recompile`] lifts one GCN program — reachable through a caller-supplied
//! word fetch — into the IR, resolves data-dependent branches with the
//! partial evaluator, structurizes the control flow, and serializes a
//! Vulkan-ready SPIR-V module. Per-opcode semantics come from a pre-compiled
//! SPIR-V semantic module whose exported function names match GCN mnemonics.

mod eval;
mod lift;
mod lower;
pub mod registers;
pub mod semantics;

pub use eval::{ConstValue, Evaluator, RegisterClobbers};
pub use semantics::{SemanticError, SemanticModule};

use lift::Lifter;
use orbis_ir::spv::{self, Op};
use orbis_ir::{Builder, Context, Kind, Location, Node, Operand, StructurizeError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    fn execution_model(self) -> spv::ExecutionModel {
        match self {
            ShaderStage::Vertex => spv::ExecutionModel::Vertex,
            ShaderStage::Fragment => spv::ExecutionModel::Fragment,
            ShaderStage::Compute => spv::ExecutionModel::GlCompute,
        }
    }
}

/// Host-supplied state snapshot for one dispatch.
#[derive(Debug, Clone)]
pub struct Environment {
    pub stage: ShaderStage,
    pub supports_barycentric: bool,
    /// Initial user-SGPR words, up to 16.
    pub user_sgprs: Vec<u32>,
    pub sgpr_count: u32,
    pub vgpr_count: u32,
    /// Generator magic for the emitted module header.
    pub generator: u32,
}

impl Environment {
    pub fn compute(user_sgprs: Vec<u32>) -> Environment {
        Environment {
            stage: ShaderStage::Compute,
            supports_barycentric: false,
            user_sgprs,
            sgpr_count: 104,
            vgpr_count: 256,
            generator: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecompileError {
    #[error(transparent)]
    Decode(#[from] orbis_gcn::DecodeError),
    #[error("bad semantic module: {0}")]
    BadSemanticModule(#[from] SemanticError),
    #[error("indirect branch at {address:#x} could not be resolved")]
    UnresolvedBranch { address: u64 },
    #[error(transparent)]
    Structurizer(#[from] StructurizeError),
}

#[derive(Debug)]
pub struct Recompiled {
    /// Little-endian SPIR-V word stream.
    pub spirv: Vec<u32>,
    /// Bitmask of user-SGPR slots the shader actually consumes.
    pub required_user_sgprs: u32,
}

/// Recompiles the GCN program entered at `entry` into SPIR-V.
pub fn recompile<R: FnMut(u64) -> u32>(
    env: &Environment,
    semantic_module: &[u32],
    entry: u64,
    mut read_word: R,
) -> Result<Recompiled, RecompileError> {
    let mut ctx = Context::new();
    let semantics = SemanticModule::load(&mut ctx, semantic_module)?;

    let output = Lifter::new(&mut ctx, env, &semantics, &mut read_word).run(entry)?;
    tracing::debug!(
        required_user_sgprs = output.required_user_sgprs,
        "lifted program"
    );

    orbis_ir::structurize(&mut ctx, output.body, output.epilogue_label)?;

    let mut required_user_sgprs = output.required_user_sgprs;
    lower::lower_pseudo_ops(
        &mut ctx,
        output.body,
        env,
        &mut read_word,
        &mut required_user_sgprs,
    )?;

    finalize_module(&mut ctx, env, output.body);
    let spirv = spv::serialize(&ctx, env.generator);

    Ok(Recompiled {
        spirv,
        required_user_sgprs,
    })
}

fn has_capability(ctx: &Context, capability: i32) -> bool {
    let Some(region) = ctx.section_if_present(spv::Section::Capabilities) else {
        return false;
    };
    ctx.children_vec(region).into_iter().any(|node| {
        ctx.is_spv(node, Op::Capability) && ctx.operand(node, 0).as_i32() == Some(capability)
    })
}

fn add_capability(ctx: &mut Context, capability: i32) {
    if has_capability(ctx, capability) {
        return;
    }
    let region = ctx.section(spv::Section::Capabilities);
    Builder::append(ctx, region).emit(
        Location::Unknown,
        Kind::Spv,
        Op::Capability as u32,
        vec![Operand::Int32(capability)],
    );
}

/// Wraps the structurized body into `void main()`, declares the entry point
/// with its full interface, and fills in the module boilerplate the semantic
/// module did not already provide.
fn finalize_module(ctx: &mut Context, env: &Environment, body: orbis_ir::Region) {
    let loc = Location::Unknown;

    add_capability(ctx, spv::CAPABILITY_SHADER);

    // Wide types demand their capabilities; everything interned lives in the
    // globals section.
    let mut needs_int64 = false;
    let mut needs_float64 = false;
    if let Some(globals) = ctx.section_if_present(spv::Section::Globals) {
        for node in ctx.children_vec(globals) {
            match ctx.spv_op(node) {
                Some(Op::TypeInt) if ctx.operand(node, 0).as_i32() == Some(64) => {
                    needs_int64 = true;
                }
                Some(Op::TypeFloat) if ctx.operand(node, 0).as_i32() == Some(64) => {
                    needs_float64 = true;
                }
                _ => {}
            }
        }
    }
    if needs_int64 {
        add_capability(ctx, spv::CAPABILITY_INT64);
    }
    if needs_float64 {
        add_capability(ctx, spv::CAPABILITY_FLOAT64);
    }

    let memory_model_missing = ctx
        .section_if_present(spv::Section::MemoryModel)
        .map(|region| ctx.region_first(region).is_none())
        .unwrap_or(true);
    if memory_model_missing {
        let region = ctx.section(spv::Section::MemoryModel);
        Builder::append(ctx, region).emit(
            loc,
            Kind::Spv,
            Op::MemoryModel as u32,
            vec![
                Operand::Int32(spv::ADDRESSING_MODEL_LOGICAL),
                Operand::Int32(spv::MEMORY_MODEL_GLSL450),
            ],
        );
    }

    let void_type = ctx.type_void();
    let fn_type = ctx.type_function(void_type, &[]);

    let functions = ctx.section(spv::Section::Functions);
    let main = Builder::append(ctx, functions).emit_value(
        loc,
        Kind::Spv,
        Op::Function as u32,
        vec![
            void_type.into(),
            Operand::Int32(spv::FUNCTION_CONTROL_NONE),
            fn_type.into(),
        ],
    );
    ctx.splice_all(body, functions);
    Builder::append(ctx, functions).emit(loc, Kind::Spv, Op::FunctionEnd as u32, vec![]);

    // SPIR-V 1.4 entry points list every global the call tree can touch.
    let interface: Vec<Node> = ctx
        .section_if_present(spv::Section::Globals)
        .map(|region| ctx.children_vec(region))
        .unwrap_or_default()
        .into_iter()
        .filter(|&node| ctx.is_spv(node, Op::Variable))
        .collect();

    let entry_points = ctx.section(spv::Section::EntryPoints);
    let mut operands = vec![
        Operand::Int32(env.stage.execution_model() as i32),
        main.into(),
        "main".into(),
    ];
    operands.extend(interface.into_iter().map(Operand::Value));
    Builder::append(ctx, entry_points).emit(loc, Kind::Spv, Op::EntryPoint as u32, operands);

    match env.stage {
        ShaderStage::Fragment => {
            let region = ctx.section(spv::Section::ExecutionModes);
            Builder::append(ctx, region).emit(
                loc,
                Kind::Spv,
                Op::ExecutionMode as u32,
                vec![
                    main.into(),
                    Operand::Int32(spv::EXECUTION_MODE_ORIGIN_UPPER_LEFT),
                ],
            );
        }
        ShaderStage::Compute => {
            let region = ctx.section(spv::Section::ExecutionModes);
            Builder::append(ctx, region).emit(
                loc,
                Kind::Spv,
                Op::ExecutionMode as u32,
                vec![
                    main.into(),
                    Operand::Int32(spv::EXECUTION_MODE_LOCAL_SIZE),
                    Operand::Int32(crate::registers::WAVEFRONT_LANES as i32),
                    Operand::Int32(1),
                    Operand::Int32(1),
                ],
            );
        }
        ShaderStage::Vertex => {}
    }
}
