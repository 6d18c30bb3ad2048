//! Partial evaluator.
//!
//! A recursive-descent evaluator over IR values, caching per node. It folds
//! constants through the supported SPIR-V ops, resolves loads through the
//! MemorySSA reaching-definition query, and looks through semantic-function
//! calls by evaluating the callee's return expression with the call-site
//! argument stores bound to the parameters. Unknown inputs yield `None`; the
//! evaluator never fabricates a result.

use crate::registers::RegId;
use crate::semantics::SemanticModule;
use orbis_ir::analysis::{reaching_def, root_variable, Cfg, MemoryModel};
use orbis_ir::spv::Op;
use orbis_ir::{Context, Kind, Node, Operand};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Composite(Vec<ConstValue>),
}

use ConstValue::*;

impl ConstValue {
    /// Zero-extended scalar view, for addresses and indices.
    pub fn zext(&self) -> Option<u64> {
        Some(match *self {
            Bool(value) => u64::from(value),
            U32(value) => u64::from(value),
            I32(value) => value as u32 as u64,
            U64(value) => value,
            I64(value) => value as u64,
            F32(_) | F64(_) | Composite(_) => return None,
        })
    }

    fn bits(&self) -> Option<(u64, u32)> {
        Some(match *self {
            Bool(value) => (u64::from(value), 1),
            U32(value) => (u64::from(value), 32),
            I32(value) => (value as u32 as u64, 32),
            U64(value) => (value, 64),
            I64(value) => (value as u64, 64),
            F32(value) => (u64::from(value.to_bits()), 32),
            F64(value) => (value.to_bits(), 64),
            Composite(_) => return None,
        })
    }
}

macro_rules! int_binop {
    ($lhs:expr, $rhs:expr, $method:ident) => {
        match ($lhs, $rhs) {
            (U32(a), U32(b)) => Some(U32(a.$method(b))),
            (I32(a), I32(b)) => Some(I32(a.$method(b))),
            (U64(a), U64(b)) => Some(U64(a.$method(b))),
            (I64(a), I64(b)) => Some(I64(a.$method(b))),
            _ => None,
        }
    };
}

macro_rules! cmp_binop {
    ($lhs:expr, $rhs:expr, $op:tt) => {
        match ($lhs, $rhs) {
            (U32(a), U32(b)) => Some(Bool(a $op b)),
            (I32(a), I32(b)) => Some(Bool(a $op b)),
            (U64(a), U64(b)) => Some(Bool(a $op b)),
            (I64(a), I64(b)) => Some(Bool(a $op b)),
            _ => None,
        }
    };
}

macro_rules! float_binop {
    ($lhs:expr, $rhs:expr, $op:tt) => {
        match ($lhs, $rhs) {
            (F32(a), F32(b)) => Some(F32(a $op b)),
            (F64(a), F64(b)) => Some(F64(a $op b)),
            _ => None,
        }
    };
}

macro_rules! bit_binop {
    ($lhs:expr, $rhs:expr, $op:tt) => {
        match ($lhs, $rhs) {
            (U32(a), U32(b)) => Some(U32(a $op b)),
            (I32(a), I32(b)) => Some(I32(a $op b)),
            (U64(a), U64(b)) => Some(U64(a $op b)),
            (I64(a), I64(b)) => Some(I64(a $op b)),
            (Bool(a), Bool(b)) => Some(Bool(a $op b)),
            _ => None,
        }
    };
}

/// Clobber model over the register file: a call defines a register variable
/// when the callee's discovered accesses include a write to it.
pub struct RegisterClobbers<'a> {
    pub semantics: &'a SemanticModule,
}

impl MemoryModel for RegisterClobbers<'_> {
    fn clobbers(&self, ctx: &Context, inst: Node, var: Node) -> bool {
        if ctx.kind(inst) != Kind::Spv {
            return false;
        }
        if !ctx.is_spv(inst, Op::FunctionCall) {
            return false;
        }
        let Some(callee) = ctx.operand_value(inst, 1) else {
            return false;
        };
        let Some(reg) = self.register_of(var) else {
            return false;
        };
        self.semantics
            .by_function(callee)
            .is_some_and(|sem| sem.register_access.get(&reg).is_some_and(|a| a.writes()))
    }
}

impl RegisterClobbers<'_> {
    fn register_of(&self, var: Node) -> Option<RegId> {
        self.semantics
            .registers
            .iter()
            .find_map(|(&reg, &node)| (node == var).then_some(reg))
    }
}

struct CallEnv<'a> {
    call: Node,
    bindings: &'a HashMap<Node, Node>,
}

pub struct Evaluator<'a, R: FnMut(u64) -> u32> {
    pub ctx: &'a Context,
    pub semantics: &'a SemanticModule,
    pub cfg: &'a Cfg,
    pub user_sgprs: &'a [u32],
    pub read_word: Option<&'a mut R>,
    pub used_user_sgprs: u32,
    cache: HashMap<Node, Option<ConstValue>>,
}

impl<'a, R: FnMut(u64) -> u32> Evaluator<'a, R> {
    pub fn new(
        ctx: &'a Context,
        semantics: &'a SemanticModule,
        cfg: &'a Cfg,
        user_sgprs: &'a [u32],
        read_word: Option<&'a mut R>,
    ) -> Evaluator<'a, R> {
        Evaluator {
            ctx,
            semantics,
            cfg,
            user_sgprs,
            read_word,
            used_user_sgprs: 0,
            cache: HashMap::new(),
        }
    }

    pub fn eval(&mut self, node: Node) -> Option<ConstValue> {
        self.eval_node(node, None)
    }

    fn eval_operand(
        &mut self,
        inst: Node,
        index: usize,
        env: Option<&CallEnv<'_>>,
    ) -> Option<ConstValue> {
        match self.ctx.operands(inst).get(index)?.clone() {
            Operand::Value(value) => self.eval_node(value, env),
            Operand::Int32(value) => Some(I32(value)),
            Operand::Int64(value) => Some(I64(value)),
            Operand::Bool(value) => Some(Bool(value)),
            Operand::Float32(value) => Some(F32(value)),
            Operand::Float64(value) => Some(F64(value)),
            Operand::String(_) => None,
        }
    }

    /// Literal constant interpreted through its result type.
    fn constant_literal(&self, node: Node) -> Option<ConstValue> {
        let type_node = self.ctx.value_type(node)?;
        let literal = self.ctx.operand(node, 1).clone();
        Some(match self.ctx.spv_op(type_node)? {
            Op::TypeInt => {
                let width = self.ctx.operand(type_node, 0).as_i32()?;
                let signed = self.ctx.operand(type_node, 1).as_i32()? != 0;
                match (width, signed, literal) {
                    (32, false, Operand::Int32(value)) => U32(value as u32),
                    (32, true, Operand::Int32(value)) => I32(value),
                    (64, false, Operand::Int64(value)) => U64(value as u64),
                    (64, true, Operand::Int64(value)) => I64(value),
                    (width, signed, Operand::Int32(value)) if width < 32 => {
                        let mask = (1u32 << width) - 1;
                        if signed {
                            I32(((value as u32 & mask) as i32) << (32 - width) >> (32 - width))
                        } else {
                            U32(value as u32 & mask)
                        }
                    }
                    _ => return None,
                }
            }
            Op::TypeFloat => match literal {
                Operand::Float32(value) => F32(value),
                Operand::Float64(value) => F64(value),
                _ => return None,
            },
            _ => return None,
        })
    }

    fn bitcast_to(&self, value: &ConstValue, type_node: Node) -> Option<ConstValue> {
        // Word-vector views of wide scalars (the register split/join
        // pattern): scalar -> uvec2 and back.
        if self.ctx.spv_op(type_node) == Some(Op::TypeVector) {
            let count = self.ctx.operand(type_node, 1).as_i32()? as u32;
            let element = self.ctx.operand_value(type_node, 0)?;
            if self.ctx.spv_op(element) != Some(Op::TypeInt)
                || self.ctx.operand(element, 0).as_i32() != Some(32)
            {
                return None;
            }
            let (bits, width) = value.bits()?;
            if width != 32 * count {
                return None;
            }
            return Some(Composite(
                (0..count).map(|i| U32((bits >> (32 * i)) as u32)).collect(),
            ));
        }
        if let Composite(words) = value {
            let mut bits = 0u64;
            let mut width = 0u32;
            for word in words {
                let (value_bits, value_width) = word.bits()?;
                if value_width != 32 || width >= 64 {
                    return None;
                }
                bits |= value_bits << width;
                width += 32;
            }
            return self.bitcast_to(&U64(bits), type_node).or_else(|| {
                if width == 32 {
                    self.bitcast_to(&U32(bits as u32), type_node)
                } else {
                    None
                }
            });
        }

        let (bits, width) = value.bits()?;
        Some(match self.ctx.spv_op(type_node)? {
            Op::TypeInt => {
                let target = self.ctx.operand(type_node, 0).as_i32()? as u32;
                let signed = self.ctx.operand(type_node, 1).as_i32()? != 0;
                if target != width {
                    return None;
                }
                match (target, signed) {
                    (32, false) => U32(bits as u32),
                    (32, true) => I32(bits as u32 as i32),
                    (64, false) => U64(bits),
                    (64, true) => I64(bits as i64),
                    _ => return None,
                }
            }
            Op::TypeFloat => {
                let target = self.ctx.operand(type_node, 0).as_i32()? as u32;
                if target != width {
                    return None;
                }
                match target {
                    32 => F32(f32::from_bits(bits as u32)),
                    64 => F64(f64::from_bits(bits)),
                    _ => return None,
                }
            }
            _ => return None,
        })
    }

    fn int_convert(&self, value: &ConstValue, type_node: Node, signed: bool) -> Option<ConstValue> {
        let target = match self.ctx.spv_op(type_node)? {
            Op::TypeInt => self.ctx.operand(type_node, 0).as_i32()? as u32,
            _ => return None,
        };
        let target_signed = self.ctx.operand(type_node, 1).as_i32()? != 0;
        let extended: u64 = if signed {
            match *value {
                I32(v) => v as i64 as u64,
                U32(v) => v as i32 as i64 as u64,
                I64(v) => v as u64,
                U64(v) => v,
                _ => return None,
            }
        } else {
            value.zext()?
        };
        Some(match (target, target_signed) {
            (32, false) => U32(extended as u32),
            (32, true) => I32(extended as u32 as i32),
            (64, false) => U64(extended),
            (64, true) => I64(extended as i64),
            _ => return None,
        })
    }

    fn eval_node(&mut self, node: Node, env: Option<&CallEnv<'_>>) -> Option<ConstValue> {
        if env.is_none() {
            if let Some(cached) = self.cache.get(&node) {
                return cached.clone();
            }
        }
        let result = self.eval_uncached(node, env);
        if env.is_none() {
            self.cache.insert(node, result.clone());
        }
        result
    }

    fn eval_uncached(&mut self, node: Node, env: Option<&CallEnv<'_>>) -> Option<ConstValue> {
        let (kind, raw_op) = self.ctx.op_of(node);

        if kind == Kind::AmdGpu {
            return self.eval_pseudo(node, raw_op, env);
        }
        if kind != Kind::Spv {
            return None;
        }
        let op = Op::from_u32(raw_op)?;

        match op {
            Op::Constant => self.constant_literal(node),
            Op::ConstantTrue => Some(Bool(true)),
            Op::ConstantFalse => Some(Bool(false)),
            Op::Bitcast => {
                let value = self.eval_operand(node, 1, env)?;
                self.bitcast_to(&value, self.ctx.value_type(node)?)
            }
            Op::UConvert | Op::SConvert => {
                let value = self.eval_operand(node, 1, env)?;
                self.int_convert(&value, self.ctx.value_type(node)?, op == Op::SConvert)
            }
            Op::Select => {
                let condition = self.eval_operand(node, 1, env)?;
                match condition {
                    Bool(true) => self.eval_operand(node, 2, env),
                    Bool(false) => self.eval_operand(node, 3, env),
                    _ => None,
                }
            }
            Op::Load => self.eval_load(node, env),
            Op::FunctionCall => self.eval_call(node, env),
            Op::CompositeConstruct => {
                let mut constituents = Vec::new();
                for index in 1..self.ctx.operands(node).len() {
                    constituents.push(self.eval_operand(node, index, env)?);
                }
                Some(Composite(constituents))
            }
            Op::CompositeExtract => {
                let composite = self.eval_operand(node, 1, env)?;
                let operands = self.ctx.operands(node);
                if operands.len() != 3 {
                    return None;
                }
                let index = operands[2].as_i32()? as usize;
                match composite {
                    Composite(values) => values.get(index).cloned(),
                    _ => None,
                }
            }
            Op::LogicalNot => match self.eval_operand(node, 1, env)? {
                Bool(value) => Some(Bool(!value)),
                _ => None,
            },
            Op::Not => match self.eval_operand(node, 1, env)? {
                U32(value) => Some(U32(!value)),
                I32(value) => Some(I32(!value)),
                U64(value) => Some(U64(!value)),
                I64(value) => Some(I64(!value)),
                _ => None,
            },
            Op::SNegate => match self.eval_operand(node, 1, env)? {
                I32(value) => Some(I32(value.wrapping_neg())),
                U32(value) => Some(U32(value.wrapping_neg())),
                I64(value) => Some(I64(value.wrapping_neg())),
                U64(value) => Some(U64(value.wrapping_neg())),
                _ => None,
            },
            Op::FNegate => match self.eval_operand(node, 1, env)? {
                F32(value) => Some(F32(-value)),
                F64(value) => Some(F64(-value)),
                _ => None,
            },
            Op::IsNan => match self.eval_operand(node, 1, env)? {
                F32(value) => Some(Bool(value.is_nan())),
                F64(value) => Some(Bool(value.is_nan())),
                _ => None,
            },
            _ => {
                let lhs = self.eval_operand(node, 1, env)?;
                let rhs = self.eval_operand(node, 2, env)?;
                binary(op, &lhs, &rhs)
            }
        }
    }

    fn eval_pseudo(
        &mut self,
        node: Node,
        op: u32,
        env: Option<&CallEnv<'_>>,
    ) -> Option<ConstValue> {
        match op {
            orbis_ir::amdgpu::USER_SGPR => {
                let index = self.eval_operand(node, 1, env)?.zext()? as usize;
                let &value = self.user_sgprs.get(index)?;
                self.used_user_sgprs |= 1 << index;
                Some(U32(value))
            }
            orbis_ir::amdgpu::IMM => {
                let address = self.eval_operand(node, 1, env)?.zext()?;
                let read_word = self.read_word.as_mut()?;
                Some(U32(read_word(address)))
            }
            _ => None,
        }
    }

    fn eval_load(&mut self, load: Node, env: Option<&CallEnv<'_>>) -> Option<ConstValue> {
        let pointer = self.ctx.operand_value(load, 1)?;
        let root = root_variable(self.ctx, pointer);

        if let Some(env) = env {
            // Inside a callee: parameter loads bind to the call-site
            // argument variables; everything else resolves at the call.
            if let Some(&arg_var) = env.bindings.get(&root) {
                let model = RegisterClobbers {
                    semantics: self.semantics,
                };
                let def = reaching_def(self.ctx, self.cfg, &model, env.call, arg_var)?;
                return self.eval_def(def, arg_var);
            }
            let model = RegisterClobbers {
                semantics: self.semantics,
            };
            let def = reaching_def(self.ctx, self.cfg, &model, env.call, pointer)?;
            return self.eval_def(def, pointer);
        }

        let model = RegisterClobbers {
            semantics: self.semantics,
        };
        let def = reaching_def(self.ctx, self.cfg, &model, load, pointer)?;
        self.eval_def(def, pointer)
    }

    fn eval_def(&mut self, def: Node, pointer: Node) -> Option<ConstValue> {
        if self.ctx.is_spv(def, Op::Store) {
            let value = self.ctx.operand_value(def, 1)?;
            return self.eval_node(value, None);
        }
        if self.ctx.is_spv(def, Op::FunctionCall) {
            // The call writes the variable inside its body; evaluate that
            // store under the call's bindings.
            return self.eval_global_store_in_call(def, pointer);
        }
        None
    }

    fn call_env_bindings(&self, call: Node) -> Option<(Node, HashMap<Node, Node>)> {
        let callee = self.ctx.operand_value(call, 1)?;
        let sem = self.semantics.by_function(callee)?;
        let args: Vec<Node> = (2..self.ctx.operands(call).len())
            .filter_map(|index| self.ctx.operand_value(call, index))
            .collect();
        if args.len() != sem.param_nodes.len() {
            return None;
        }
        let bindings = sem
            .param_nodes
            .iter()
            .copied()
            .zip(args)
            .collect::<HashMap<_, _>>();
        Some((callee, bindings))
    }

    fn eval_call(&mut self, call: Node, _env: Option<&CallEnv<'_>>) -> Option<ConstValue> {
        let (callee, bindings) = self.call_env_bindings(call)?;
        let sem = self.semantics.by_function(callee)?;

        let return_value = sem
            .body
            .iter()
            .find(|&&inst| self.ctx.is_spv(inst, Op::ReturnValue))
            .and_then(|&inst| self.ctx.operand_value(inst, 0))?;

        let env = CallEnv {
            call,
            bindings: &bindings,
        };
        self.eval_node(return_value, Some(&env))
    }

    fn eval_global_store_in_call(&mut self, call: Node, pointer: Node) -> Option<ConstValue> {
        let (callee, bindings) = self.call_env_bindings(call)?;
        let sem = self.semantics.by_function(callee)?;
        let root = root_variable(self.ctx, pointer);

        // Last store in the callee whose destination is that variable.
        let store = sem
            .body
            .iter()
            .rev()
            .find(|&&inst| {
                self.ctx.is_spv(inst, Op::Store)
                    && self
                        .ctx
                        .operand_value(inst, 0)
                        .is_some_and(|target| root_variable(self.ctx, target) == root)
            })
            .copied()?;

        // Only direct (unindexed) register stores are looked through; an
        // indexed store inside the callee would need full pointer matching
        // across the call boundary.
        let target = self.ctx.operand_value(store, 0)?;
        if target != pointer && !(target == root && pointer == root) {
            return None;
        }

        let value = self.ctx.operand_value(store, 1)?;
        let env = CallEnv {
            call,
            bindings: &bindings,
        };
        self.eval_node(value, Some(&env))
    }
}

fn binary(op: Op, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
    let lhs = lhs.clone();
    let rhs = rhs.clone();
    match op {
        Op::IAdd => int_binop!(lhs, rhs, wrapping_add),
        Op::ISub => int_binop!(lhs, rhs, wrapping_sub),
        Op::IMul => int_binop!(lhs, rhs, wrapping_mul),
        Op::UDiv | Op::SDiv => match (lhs, rhs) {
            (_, U32(0)) | (_, I32(0)) | (_, U64(0)) | (_, I64(0)) => None,
            (U32(a), U32(b)) => Some(U32(a / b)),
            (I32(a), I32(b)) => Some(I32(a.wrapping_div(b))),
            (U64(a), U64(b)) => Some(U64(a / b)),
            (I64(a), I64(b)) => Some(I64(a.wrapping_div(b))),
            _ => None,
        },
        Op::UMod | Op::SMod | Op::SRem => match (lhs, rhs) {
            (_, U32(0)) | (_, I32(0)) | (_, U64(0)) | (_, I64(0)) => None,
            (U32(a), U32(b)) => Some(U32(a % b)),
            (I32(a), I32(b)) => Some(I32(a.wrapping_rem(b))),
            (U64(a), U64(b)) => Some(U64(a % b)),
            (I64(a), I64(b)) => Some(I64(a.wrapping_rem(b))),
            _ => None,
        },
        Op::FAdd => float_binop!(lhs, rhs, +),
        Op::FSub => float_binop!(lhs, rhs, -),
        Op::FMul => float_binop!(lhs, rhs, *),
        Op::FDiv => float_binop!(lhs, rhs, /),
        Op::IEqual | Op::LogicalEqual => match (lhs, rhs) {
            (Bool(a), Bool(b)) => Some(Bool(a == b)),
            (lhs, rhs) => cmp_binop!(lhs, rhs, ==),
        },
        Op::INotEqual | Op::LogicalNotEqual => match (lhs, rhs) {
            (Bool(a), Bool(b)) => Some(Bool(a != b)),
            (lhs, rhs) => cmp_binop!(lhs, rhs, !=),
        },
        Op::UGreaterThan | Op::SGreaterThan => cmp_binop!(lhs, rhs, >),
        Op::UGreaterThanEqual | Op::SGreaterThanEqual => cmp_binop!(lhs, rhs, >=),
        Op::ULessThan | Op::SLessThan => cmp_binop!(lhs, rhs, <),
        Op::ULessThanEqual | Op::SLessThanEqual => cmp_binop!(lhs, rhs, <=),
        Op::FOrdEqual => float_cmp(lhs, rhs, |a, b| a == b, false),
        Op::FUnordEqual => float_cmp(lhs, rhs, |a, b| a == b, true),
        Op::FOrdNotEqual => float_cmp(lhs, rhs, |a, b| a != b, false),
        Op::FUnordNotEqual => float_cmp(lhs, rhs, |a, b| a != b, true),
        Op::FOrdLessThan => float_cmp(lhs, rhs, |a, b| a < b, false),
        Op::FUnordLessThan => float_cmp(lhs, rhs, |a, b| a < b, true),
        Op::FOrdGreaterThan => float_cmp(lhs, rhs, |a, b| a > b, false),
        Op::FUnordGreaterThan => float_cmp(lhs, rhs, |a, b| a > b, true),
        Op::FOrdLessThanEqual => float_cmp(lhs, rhs, |a, b| a <= b, false),
        Op::FUnordLessThanEqual => float_cmp(lhs, rhs, |a, b| a <= b, true),
        Op::FOrdGreaterThanEqual => float_cmp(lhs, rhs, |a, b| a >= b, false),
        Op::FUnordGreaterThanEqual => float_cmp(lhs, rhs, |a, b| a >= b, true),
        Op::LogicalAnd => match (lhs, rhs) {
            (Bool(a), Bool(b)) => Some(Bool(a && b)),
            _ => None,
        },
        Op::LogicalOr => match (lhs, rhs) {
            (Bool(a), Bool(b)) => Some(Bool(a || b)),
            _ => None,
        },
        Op::ShiftLeftLogical => shift(lhs, rhs, |bits, amount, width| {
            if amount >= u64::from(width) {
                0
            } else {
                bits << amount
            }
        }),
        Op::ShiftRightLogical => shift(lhs, rhs, |bits, amount, width| {
            if amount >= u64::from(width) {
                0
            } else {
                bits >> amount
            }
        }),
        Op::ShiftRightArithmetic => shift(lhs, rhs, |bits, amount, width| {
            let amount = amount.min(u64::from(width) - 1);
            let shifted = ((bits as i64) << (64 - width)) >> (64 - width) >> amount;
            shifted as u64
        }),
        Op::BitwiseAnd => bit_binop!(lhs, rhs, &),
        Op::BitwiseOr => bit_binop!(lhs, rhs, |),
        Op::BitwiseXor => bit_binop!(lhs, rhs, ^),
        _ => None,
    }
}

fn float_cmp(
    lhs: ConstValue,
    rhs: ConstValue,
    compare: fn(f64, f64) -> bool,
    unordered: bool,
) -> Option<ConstValue> {
    let (a, b) = match (lhs, rhs) {
        (F32(a), F32(b)) => (f64::from(a), f64::from(b)),
        (F64(a), F64(b)) => (a, b),
        _ => return None,
    };
    if a.is_nan() || b.is_nan() {
        return Some(Bool(unordered));
    }
    Some(Bool(compare(a, b)))
}

fn shift(
    lhs: ConstValue,
    rhs: ConstValue,
    apply: fn(u64, u64, u32) -> u64,
) -> Option<ConstValue> {
    let amount = rhs.zext()?;
    Some(match lhs {
        U32(value) => U32(apply(u64::from(value), amount, 32) as u32),
        I32(value) => I32(apply(value as u32 as u64, amount, 32) as u32 as i32),
        U64(value) => U64(apply(value, amount, 64)),
        I64(value) => I64(apply(value as u64, amount, 64) as i64),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_ir::analysis::Cfg;
    use orbis_ir::spv::Op;
    use orbis_ir::{Builder, Context, Location};

    fn empty_semantics(ctx: &mut Context) -> SemanticModule {
        let empty = orbis_ir::spv::serialize(&Context::new(), 0);
        SemanticModule::load(ctx, &empty).expect("empty module loads")
    }

    fn test_block(ctx: &mut Context) -> orbis_ir::Region {
        let region = ctx.create_region();
        Builder::append(ctx, region).label(Location::Unknown);
        region
    }

    fn finish_block(ctx: &mut Context, region: orbis_ir::Region) {
        Builder::append(ctx, region).ret(Location::Unknown);
    }

    fn eval_one(ctx: &Context, semantics: &SemanticModule, region: orbis_ir::Region, node: Node) -> Option<ConstValue> {
        let cfg = Cfg::build(ctx, region);
        let mut evaluator: Evaluator<'_, fn(u64) -> u32> =
            Evaluator::new(ctx, semantics, &cfg, &[], None);
        evaluator.eval(node)
    }

    #[test]
    fn folds_integer_arithmetic_chains() {
        let mut ctx = Context::new();
        let semantics = empty_semantics(&mut ctx);
        let region = test_block(&mut ctx);
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();

        let two = ctx.const_u32(2);
        let three = ctx.const_u32(3);
        let mut builder = Builder::append(&mut ctx, region);
        let sum = builder.i_add(loc, u32_type, two, three);
        let shifted = builder.binary(loc, Op::ShiftLeftLogical, u32_type, sum, two);
        let masked = builder.binary(loc, Op::BitwiseAnd, u32_type, shifted, three);
        finish_block(&mut ctx, region);

        assert_eq!(
            eval_one(&ctx, &semantics, region, sum),
            Some(ConstValue::U32(5))
        );
        assert_eq!(
            eval_one(&ctx, &semantics, region, shifted),
            Some(ConstValue::U32(20))
        );
        assert_eq!(
            eval_one(&ctx, &semantics, region, masked),
            Some(ConstValue::U32(0))
        );
    }

    #[test]
    fn folds_word_splits_and_joins() {
        let mut ctx = Context::new();
        let semantics = empty_semantics(&mut ctx);
        let region = test_block(&mut ctx);
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();
        let u64_type = ctx.type_uint64();
        let pair = ctx.type_vector(u32_type, 2);

        let wide = ctx.const_u64(0x1122_3344_5566_7788);
        let mut builder = Builder::append(&mut ctx, region);
        let split = builder.bitcast(loc, pair, wide);
        let lo = builder.composite_extract(loc, u32_type, split, &[0]);
        let hi = builder.composite_extract(loc, u32_type, split, &[1]);
        let rejoined = builder.composite_construct(loc, pair, &[lo, hi]);
        let joined = builder.bitcast(loc, u64_type, rejoined);
        finish_block(&mut ctx, region);

        assert_eq!(
            eval_one(&ctx, &semantics, region, lo),
            Some(ConstValue::U32(0x5566_7788))
        );
        assert_eq!(
            eval_one(&ctx, &semantics, region, hi),
            Some(ConstValue::U32(0x1122_3344))
        );
        assert_eq!(
            eval_one(&ctx, &semantics, region, joined),
            Some(ConstValue::U64(0x1122_3344_5566_7788))
        );
    }

    #[test]
    fn never_fabricates_results() {
        let mut ctx = Context::new();
        let semantics = empty_semantics(&mut ctx);
        let region = test_block(&mut ctx);
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();

        let one = ctx.const_u32(1);
        let mut builder = Builder::append(&mut ctx, region);
        let unknown = builder.undef(loc, u32_type);
        let tainted = builder.i_add(loc, u32_type, unknown, one);
        finish_block(&mut ctx, region);

        assert_eq!(eval_one(&ctx, &semantics, region, tainted), None);
    }

    #[test]
    fn resolves_loads_through_reaching_stores() {
        let mut ctx = Context::new();
        let semantics = empty_semantics(&mut ctx);
        let region = test_block(&mut ctx);
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();
        let pointer = ctx.type_pointer(orbis_ir::spv::StorageClass::Private, u32_type);

        let globals = ctx.section(orbis_ir::spv::Section::Globals);
        let variable = Builder::append(&mut ctx, globals).variable(
            loc,
            pointer,
            orbis_ir::spv::StorageClass::Private,
        );

        let nine = ctx.const_u32(9);
        let mut builder = Builder::append(&mut ctx, region);
        builder.store(loc, variable, nine);
        let load = builder.load(loc, u32_type, variable);
        finish_block(&mut ctx, region);

        assert_eq!(
            eval_one(&ctx, &semantics, region, load),
            Some(ConstValue::U32(9))
        );
    }
}
