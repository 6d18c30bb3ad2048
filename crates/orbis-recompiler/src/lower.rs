//! Pseudo-op lowering.
//!
//! The lifter leaves `amdgpu` pseudo-ops in the body: user-SGPR seeds,
//! trailing-literal reads, float modifier wrappers, and descriptor packs.
//! This pass rewrites every one of them into plain SPIR-V so the serializer
//! sees a single dialect. Placeholder branches surviving to this point are
//! unresolved indirect branches and fail the compilation.

use crate::{Environment, RecompileError};
use orbis_ir::spv::Op;
use orbis_ir::{amdgpu, Builder, Context, Kind, Location, Node, Operand, Region};

fn typed_word_constant(ctx: &mut Context, type_node: Node, word: u32) -> Node {
    let f32_type = ctx.type_float(32);
    let u64_type = ctx.type_uint64();
    let s64_type = ctx.type_int(64, true);
    let s32_type = ctx.type_sint32();
    let bool_type = ctx.type_bool();

    if type_node == f32_type {
        ctx.const_f32(f32::from_bits(word))
    } else if type_node == u64_type {
        ctx.const_u64(u64::from(word))
    } else if type_node == s64_type {
        ctx.constant(s64_type, Operand::Int64(word as i32 as i64))
    } else if type_node == s32_type {
        ctx.const_i32(word as i32)
    } else if type_node == bool_type {
        ctx.const_bool(word != 0)
    } else {
        ctx.const_u32(word)
    }
}

fn float_constant(ctx: &mut Context, type_node: Node, value: f64) -> Node {
    let f64_type = ctx.type_float(64);
    if type_node == f64_type {
        ctx.constant(f64_type, Operand::Float64(value))
    } else {
        ctx.const_f32(value as f32)
    }
}

fn float_width(ctx: &Context, type_node: Node) -> Option<u32> {
    if ctx.spv_op(type_node) == Some(Op::TypeFloat) {
        ctx.operand(type_node, 0).as_i32().map(|width| width as u32)
    } else {
        None
    }
}

fn lower_neg_abs(ctx: &mut Context, node: Node) -> Node {
    let type_node = ctx.value_type(node).expect("pseudo has a type");
    let neg = ctx.operand(node, 1).as_bool().unwrap_or(false);
    let abs = ctx.operand(node, 2).as_bool().unwrap_or(false);
    let mut value = ctx.operand_value(node, 3).expect("pseudo wraps a value");
    let loc = ctx.loc(node);

    let Some(width) = float_width(ctx, type_node) else {
        tracing::warn!("neg/abs modifier on a non-float operand");
        return value;
    };

    if abs {
        // Clear the sign bit through the integer view.
        let (int_type, mask) = if width == 64 {
            let int_type = ctx.type_uint64();
            let mask = ctx.const_u64(0x7FFF_FFFF_FFFF_FFFF);
            (int_type, mask)
        } else {
            let int_type = ctx.type_uint32();
            let mask = ctx.const_u32(0x7FFF_FFFF);
            (int_type, mask)
        };
        let mut builder = Builder::before(ctx, node);
        let bits = builder.bitcast(loc, int_type, value);
        let masked = builder.binary(loc, Op::BitwiseAnd, int_type, bits, mask);
        value = builder.bitcast(loc, type_node, masked);
    }
    if neg {
        value = Builder::before(ctx, node).f_negate(loc, type_node, value);
    }
    value
}

fn lower_omod(ctx: &mut Context, node: Node) -> Node {
    let type_node = ctx.value_type(node).expect("pseudo has a type");
    let clamp = ctx.operand(node, 1).as_bool().unwrap_or(false);
    let omod = ctx.operand(node, 2).as_i32().unwrap_or(0);
    let mut value = ctx.operand_value(node, 3).expect("pseudo wraps a value");
    let loc = ctx.loc(node);

    if float_width(ctx, type_node).is_none() {
        tracing::warn!("output modifier on a non-float result");
        return value;
    }

    let scale = match omod {
        1 => Some(2.0),
        2 => Some(4.0),
        3 => Some(0.5),
        _ => None,
    };
    if let Some(scale) = scale {
        let factor = float_constant(ctx, type_node, scale);
        value = Builder::before(ctx, node).binary(loc, Op::FMul, type_node, value, factor);
    }

    if clamp {
        let bool_type = ctx.type_bool();
        let zero = float_constant(ctx, type_node, 0.0);
        let one = float_constant(ctx, type_node, 1.0);
        let mut builder = Builder::before(ctx, node);
        let below = builder.binary(loc, Op::FOrdLessThan, bool_type, value, zero);
        let floored = builder.select(loc, type_node, below, zero, value);
        let above = builder.binary(loc, Op::FOrdGreaterThan, bool_type, floored, one);
        value = builder.select(loc, type_node, above, one, floored);
    }
    value
}

fn lower_pack(ctx: &mut Context, node: Node, words_start: usize, words_end: usize) -> Node {
    let type_node = ctx.value_type(node).expect("pseudo has a type");
    let loc = ctx.loc(node);
    let words: Vec<Node> = (words_start..words_end)
        .filter_map(|index| ctx.operand_value(node, index))
        .collect();
    Builder::before(ctx, node).composite_construct(loc, type_node, &words)
}

fn lower_pointer(ctx: &mut Context, node: Node) -> Node {
    let type_node = ctx.value_type(node).expect("pseudo has a type");
    let base = ctx.operand_value(node, 2).expect("pointer base");
    let offset = ctx.operand_value(node, 3).expect("pointer offset");
    let loc = ctx.loc(node);
    let u64_type = ctx.type_uint64();

    let mut builder = Builder::before(ctx, node);
    let wide_offset = builder.s_convert(loc, u64_type, offset);
    let sum = builder.i_add(loc, u64_type, base, wide_offset);
    if type_node == u64_type {
        sum
    } else {
        Builder::before(ctx, node).bitcast(loc, type_node, sum)
    }
}

/// Rewrites every pseudo-op in `body` into plain SPIR-V, reading literals
/// through `read_word` and seeding user SGPRs from the environment.
pub(crate) fn lower_pseudo_ops<R: FnMut(u64) -> u32>(
    ctx: &mut Context,
    body: Region,
    env: &Environment,
    read_word: &mut R,
    required_user_sgprs: &mut u32,
) -> Result<(), RecompileError> {
    for node in ctx.children_vec(body) {
        if ctx.kind(node) != Kind::AmdGpu {
            continue;
        }
        let op = ctx.op(node);

        let replacement = match op {
            amdgpu::USER_SGPR => {
                let index = ctx.operand(node, 1).as_i32().unwrap_or(0) as usize;
                let value = env.user_sgprs.get(index).copied().unwrap_or(0);
                if index < env.user_sgprs.len() {
                    *required_user_sgprs |= 1 << index;
                }
                let type_node = ctx.value_type(node).expect("pseudo has a type");
                typed_word_constant(ctx, type_node, value)
            }
            amdgpu::IMM => {
                let address = ctx.operand(node, 1).as_i64().unwrap_or(0) as u64;
                let word = read_word(address);
                let type_node = ctx.value_type(node).expect("pseudo has a type");
                typed_word_constant(ctx, type_node, word)
            }
            amdgpu::NEG_ABS => lower_neg_abs(ctx, node),
            amdgpu::OMOD => lower_omod(ctx, node),
            amdgpu::VBUFFER | amdgpu::TBUFFER => {
                let count = ctx.operands(node).len();
                lower_pack(ctx, node, 2, count)
            }
            amdgpu::SAMPLER => {
                // Final operand is the unorm flag, not a word.
                let count = ctx.operands(node).len();
                lower_pack(ctx, node, 1, count - 1)
            }
            amdgpu::POINTER => lower_pointer(ctx, node),
            amdgpu::BRANCH => {
                let address = match ctx.loc(node) {
                    Location::Memory { base, .. } => base,
                    Location::Unknown => 0,
                };
                return Err(RecompileError::UnresolvedBranch { address });
            }
            _ => panic!("unlowered pseudo-op {}", ctx.display(node)),
        };

        ctx.replace_all_uses_with(node, replacement);
        ctx.remove(node);
    }
    Ok(())
}
