//! Semantic module loader.
//!
//! The semantic module is a pre-compiled SPIR-V module whose exported
//! functions carry GCN mnemonics (`add_u32`, or family-qualified
//! `vop3_add_f32`; a trailing parenthesized mangled signature is ignored).
//! Loading deserializes the module straight into the compilation context —
//! its types and constants merge through the interner — then records, per
//! matched opcode, the function, its parameter access bits, and the register
//! files it touches.

use crate::registers::{shape_matches, RegId};
use orbis_gcn::{Access, Family};
use orbis_ir::analysis::root_variable;
use orbis_ir::spv::{self, Op, StorageClass};
use orbis_ir::{Context, Kind, Node};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("semantic module does not deserialize: {0}")]
    Module(#[from] spv::DeserializeError),
    #[error("register variable '{name}' has an incompatible layout")]
    RegisterLayout { name: String },
    #[error("no semantic for {name}")]
    MissingMnemonic { name: String },
    #[error("semantic for {name} expects {expected} arguments, instruction has {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("void semantic for {name} cannot produce the destination operand")]
    VoidProducer { name: String },
}

#[derive(Debug)]
pub struct SemanticParam {
    /// The parameter's pointee type (parameters are `Function`-storage
    /// pointers).
    pub pointee: Node,
    pub access: Access,
}

#[derive(Debug)]
pub struct SemanticFunction {
    pub function: Node,
    pub return_type: Node,
    pub params: Vec<SemanticParam>,
    pub register_access: HashMap<RegId, Access>,
    pub buffer_access: Access,
    /// `OpFunctionParameter` nodes, in order; the evaluator binds these to
    /// call-site argument variables.
    pub(crate) param_nodes: Vec<Node>,
    /// Body instructions in order, between the parameters and
    /// `OpFunctionEnd`.
    pub(crate) body: Vec<Node>,
}

#[derive(Debug)]
pub struct SemanticModule {
    functions: Vec<SemanticFunction>,
    by_op: HashMap<(Kind, u32), usize>,
    /// Register variables the module declares, adopted as the canonical
    /// register file.
    pub registers: HashMap<RegId, Node>,
}

/// Every `(kind, op)` the dialect tables can name, keyed by short mnemonic
/// and by the family-qualified wide name.
fn name_tables() -> (
    HashMap<String, Vec<(Kind, u32)>>,
    HashMap<String, (Kind, u32)>,
) {
    let mut short: HashMap<String, Vec<(Kind, u32)>> = HashMap::new();
    let mut wide: HashMap<String, (Kind, u32)> = HashMap::new();

    for family in Family::ALL {
        for (op, mnemonic) in family.mnemonics() {
            let id = (Kind::Gcn(family), op);
            short.entry(mnemonic.clone()).or_default().push(id);
            wide.insert(format!("{}_{}", family.name(), mnemonic), id);
        }
    }
    for &(op, mnemonic) in orbis_ir::amdgpu::NAMES {
        let id = (Kind::AmdGpu, op);
        short.entry(mnemonic.to_owned()).or_default().push(id);
        wide.insert(format!("amdgpu_{mnemonic}"), id);
    }

    (short, wide)
}

fn strip_signature(name: &str) -> &str {
    match name.find('(') {
        Some(position) => &name[..position],
        None => name,
    }
}

struct FunctionSpan {
    function: Node,
    params: Vec<Node>,
    body: Vec<Node>,
}

fn function_spans(ctx: &Context) -> Vec<FunctionSpan> {
    let Some(functions) = ctx.section_if_present(spv::Section::Functions) else {
        return Vec::new();
    };

    let mut spans = Vec::new();
    let mut current: Option<FunctionSpan> = None;

    for node in ctx.children_vec(functions) {
        match ctx.spv_op(node) {
            Some(Op::Function) => {
                current = Some(FunctionSpan {
                    function: node,
                    params: Vec::new(),
                    body: Vec::new(),
                });
            }
            Some(Op::FunctionParameter) => {
                if let Some(span) = current.as_mut() {
                    span.params.push(node);
                }
            }
            Some(Op::FunctionEnd) => {
                if let Some(span) = current.take() {
                    spans.push(span);
                }
            }
            _ => {
                if let Some(span) = current.as_mut() {
                    span.body.push(node);
                }
            }
        }
    }
    spans
}

impl SemanticModule {
    pub fn load(ctx: &mut Context, words: &[u32]) -> Result<SemanticModule, SemanticError> {
        spv::deserialize(ctx, words)?;

        // Debug names drive both register discovery and mnemonic matching.
        let mut names: HashMap<Node, String> = HashMap::new();
        if let Some(debugs) = ctx.section_if_present(spv::Section::Debugs) {
            for node in ctx.children_vec(debugs) {
                if !ctx.is_spv(node, Op::Name) {
                    continue;
                }
                let (Some(target), Some(name)) = (
                    ctx.operand_value(node, 0),
                    ctx.operand(node, 1).as_str().map(str::to_owned),
                ) else {
                    continue;
                };
                names.insert(target, name);
            }
        }

        let mut registers = HashMap::new();
        for (&node, name) in &names {
            if !ctx.is_spv(node, Op::Variable) {
                continue;
            }
            let storage = ctx.operand(node, 1).as_i32().and_then(StorageClass::from_i32);
            if storage == Some(StorageClass::Function) {
                continue;
            }
            let Some(reg) = RegId::from_name(name) else {
                continue;
            };
            let pointee = ctx
                .value_type(node)
                .and_then(|pointer| ctx.pointee_type(pointer));
            let compatible = pointee.is_some_and(|pointee| shape_matches(ctx, reg, pointee));
            if !compatible {
                return Err(SemanticError::RegisterLayout { name: name.clone() });
            }
            // Copy the debug name to the side table for diagnostics.
            ctx.set_name(node, reg.name());
            registers.insert(reg, node);
        }

        let register_of = |node: Node| -> Option<RegId> {
            registers
                .iter()
                .find_map(|(&reg, &variable)| (variable == node).then_some(reg))
        };

        let mut functions = Vec::new();
        let mut by_op = HashMap::new();
        let (short_names, wide_names) = name_tables();

        for span in function_spans(ctx) {
            let return_type = ctx
                .value_type(span.function)
                .expect("function carries a return type");

            let mut params: Vec<SemanticParam> = span
                .params
                .iter()
                .map(|&param| {
                    let pointee = ctx
                        .value_type(param)
                        .and_then(|pointer| ctx.pointee_type(pointer))
                        .unwrap_or(return_type);
                    SemanticParam {
                        pointee,
                        access: Access::empty(),
                    }
                })
                .collect();

            let mut register_access: HashMap<RegId, Access> = HashMap::new();
            let mut buffer_access = Access::empty();

            let mut record = |ctx: &Context, pointer: Node, access: Access| {
                let root = root_variable(ctx, pointer);
                if let Some(position) = span.params.iter().position(|&param| param == root) {
                    let entry = &mut params[position].access;
                    *entry |= access;
                    return;
                }
                if !ctx.is_spv(root, Op::Variable) {
                    return;
                }
                match ctx.operand(root, 1).as_i32().and_then(StorageClass::from_i32) {
                    Some(StorageClass::StorageBuffer) => buffer_access |= access,
                    Some(StorageClass::Function) => {}
                    _ => {
                        if let Some(reg) = register_of(root) {
                            *register_access.entry(reg).or_insert(Access::empty()) |= access;
                        }
                    }
                }
            };

            for &inst in &span.body {
                match ctx.spv_op(inst) {
                    Some(Op::Load) => {
                        if let Some(pointer) = ctx.operand_value(inst, 1) {
                            record(ctx, pointer, Access::R);
                        }
                    }
                    Some(Op::Store) => {
                        if let Some(pointer) = ctx.operand_value(inst, 0) {
                            record(ctx, pointer, Access::W);
                        }
                    }
                    _ => {}
                }
            }

            let index = functions.len();
            functions.push(SemanticFunction {
                function: span.function,
                return_type,
                params,
                register_access,
                buffer_access,
                param_nodes: span.params.clone(),
                body: span.body.clone(),
            });

            let Some(raw_name) = names.get(&span.function) else {
                continue;
            };
            let name = strip_signature(raw_name);

            if let Some(&id) = wide_names.get(name) {
                // Wide (family-qualified) matches override short ones.
                by_op.insert(id, index);
            } else if let Some(ids) = short_names.get(name) {
                for &id in ids {
                    by_op.entry(id).or_insert(index);
                }
            } else {
                tracing::debug!(name, "semantic function matches no mnemonic");
            }
        }

        Ok(SemanticModule {
            functions,
            by_op,
            registers,
        })
    }

    pub fn find(&self, kind: Kind, op: u32) -> Option<&SemanticFunction> {
        self.by_op.get(&(kind, op)).map(|&index| &self.functions[index])
    }

    /// Lookup by the `OpFunction` value itself (used when walking calls).
    pub fn by_function(&self, function: Node) -> Option<&SemanticFunction> {
        self.functions.iter().find(|sem| sem.function == function)
    }
}
