//! Reaching-definition chains for pointer loads.
//!
//! This is the narrow MemorySSA the partial evaluator needs: for a load (or
//! an arbitrary program point), find the unique instruction that last defined
//! the pointed-to memory, or give up. Aliasing is resolved structurally:
//! access chains over the same base with all-constant indices either match
//! exactly or are provably disjoint; a non-constant index is a may-alias and
//! kills the walk. A call that writes the underlying variable counts as the
//! reaching definition (the consumer decides what to do with it).

use crate::analysis::Cfg;
use crate::context::Context;
use crate::dialect::Kind;
use crate::node::Node;
use crate::spv::Op;
use std::collections::{HashMap, HashSet};

/// Clobber oracle: whether `inst` may write through `var` without an
/// explicit `OpStore` (semantic calls writing register files).
pub trait MemoryModel {
    fn clobbers(&self, ctx: &Context, inst: Node, var: Node) -> bool;
}

/// Model with no hidden writers; only `OpStore` defines memory.
pub struct StoresOnly;

impl MemoryModel for StoresOnly {
    fn clobbers(&self, _ctx: &Context, _inst: Node, _var: Node) -> bool {
        false
    }
}

pub struct MemorySsa {
    defs: HashMap<Node, Option<Node>>,
}

/// The variable a pointer chain bottoms out in.
pub fn root_variable(ctx: &Context, mut pointer: Node) -> Node {
    while ctx.is_spv(pointer, Op::AccessChain) {
        match ctx.operand_value(pointer, 1) {
            Some(base) => pointer = base,
            None => break,
        }
    }
    pointer
}

fn constant_index(ctx: &Context, index: Node) -> Option<i64> {
    match ctx.spv_op(index)? {
        Op::Constant => match ctx.operand(index, 1) {
            crate::node::Operand::Int32(value) => Some(i64::from(*value)),
            crate::node::Operand::Int64(value) => Some(*value),
            _ => None,
        },
        _ => None,
    }
}

enum Alias {
    Same,
    Disjoint,
    May,
}

/// Structural aliasing of two pointers over the same root.
fn alias(ctx: &Context, a: Node, b: Node) -> Alias {
    if a == b {
        return Alias::Same;
    }
    if !ctx.is_spv(a, Op::AccessChain) || !ctx.is_spv(b, Op::AccessChain) {
        return Alias::May;
    }
    let a_ops = ctx.operands(a);
    let b_ops = ctx.operands(b);
    if a_ops.len() != b_ops.len() || ctx.operand_value(a, 1) != ctx.operand_value(b, 1) {
        return Alias::May;
    }

    let mut all_equal = true;
    for index in 2..a_ops.len() {
        let (Some(a_index), Some(b_index)) = (
            ctx.operand_value(a, index),
            ctx.operand_value(b, index),
        ) else {
            return Alias::May;
        };
        if a_index == b_index {
            continue;
        }
        match (constant_index(ctx, a_index), constant_index(ctx, b_index)) {
            (Some(a_value), Some(b_value)) if a_value != b_value => all_equal = false,
            (Some(_), Some(_)) => {}
            _ => return Alias::May,
        }
    }

    if all_equal {
        Alias::Same
    } else {
        Alias::Disjoint
    }
}

enum Step {
    Def(Node),
    Killed,
    Continue,
}

fn classify(
    ctx: &Context,
    model: &dyn MemoryModel,
    inst: Node,
    pointer: Node,
    root: Node,
) -> Step {
    if ctx.is_spv(inst, Op::Store) {
        let target = ctx.operand_value(inst, 0).expect("store has a pointer");
        if root_variable(ctx, target) != root {
            return Step::Continue;
        }
        return match alias(ctx, target, pointer) {
            Alias::Same => Step::Def(inst),
            Alias::Disjoint => Step::Continue,
            Alias::May => Step::Killed,
        };
    }

    if ctx.is_spv(inst, Op::FunctionCall) || ctx.kind(inst) != Kind::Spv {
        if model.clobbers(ctx, inst, root) {
            // The call is the definition; the consumer may look inside it.
            return Step::Def(inst);
        }
    }

    Step::Continue
}

impl MemorySsa {
    /// Computes the reaching definition of every load in `cfg`.
    pub fn build(ctx: &Context, cfg: &Cfg, model: &dyn MemoryModel) -> MemorySsa {
        let mut defs = HashMap::new();

        for &label in cfg.preorder() {
            let Some(block) = cfg.node(label) else {
                continue;
            };
            if block.terminator.is_none() {
                continue;
            }

            let mut cursor = ctx.next(label);
            while let Some(inst) = cursor {
                if ctx.spv_op(inst).is_some_and(Op::is_terminator) {
                    break;
                }
                if ctx.is_spv(inst, Op::Load) {
                    let pointer = ctx.operand_value(inst, 1).expect("load has a pointer");
                    let def = reaching_def(ctx, cfg, model, inst, pointer);
                    defs.insert(inst, def);
                }
                cursor = ctx.next(inst);
            }
        }

        MemorySsa { defs }
    }

    /// The unique instruction that defines the memory `load` observes: an
    /// `OpStore`, or a call that writes the underlying variable.
    pub fn def_for_load(&self, load: Node) -> Option<Node> {
        self.defs.get(&load).copied().flatten()
    }
}

/// On-demand reaching-definition query: the last instruction before `from`
/// (exclusive) that defines `pointer`, walking predecessors while the answer
/// stays unique.
pub fn reaching_def(
    ctx: &Context,
    cfg: &Cfg,
    model: &dyn MemoryModel,
    from: Node,
    pointer: Node,
) -> Option<Node> {
    let root = root_variable(ctx, pointer);

    let mut cursor = ctx.prev(from);
    loop {
        let Some(inst) = cursor else {
            return None;
        };
        if ctx.is_spv(inst, Op::Label) {
            let mut visited = HashSet::new();
            return reach_from_preds(ctx, cfg, model, inst, pointer, root, &mut visited);
        }
        match classify(ctx, model, inst, pointer, root) {
            Step::Def(def) => return Some(def),
            Step::Killed => return None,
            Step::Continue => cursor = ctx.prev(inst),
        }
    }
}

fn reach_block_end(
    ctx: &Context,
    cfg: &Cfg,
    model: &dyn MemoryModel,
    label: Node,
    pointer: Node,
    root: Node,
    visited: &mut HashSet<Node>,
) -> Option<Node> {
    let block = cfg.node(label)?;
    let terminator = block.terminator?;

    let mut cursor = ctx.prev(terminator);
    loop {
        let Some(inst) = cursor else {
            return None;
        };
        if inst == label {
            return reach_from_preds(ctx, cfg, model, label, pointer, root, visited);
        }
        match classify(ctx, model, inst, pointer, root) {
            Step::Def(def) => return Some(def),
            Step::Killed => return None,
            Step::Continue => cursor = ctx.prev(inst),
        }
    }
}

fn reach_from_preds(
    ctx: &Context,
    cfg: &Cfg,
    model: &dyn MemoryModel,
    label: Node,
    pointer: Node,
    root: Node,
    visited: &mut HashSet<Node>,
) -> Option<Node> {
    if !visited.insert(label) {
        // Looping path: no unique definition.
        return None;
    }
    let block = cfg.node(label)?;
    if block.preds.is_empty() {
        return None;
    }

    let mut result: Option<Node> = None;
    for &pred in &block.preds {
        let def = reach_block_end(ctx, cfg, model, pred, pointer, root, visited)?;
        match result {
            None => result = Some(def),
            Some(existing) if existing == def => {}
            Some(_) => return None,
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::node::Location;
    use crate::spv::StorageClass;

    fn block(ctx: &mut Context) -> (crate::node::Region, Node) {
        let region = ctx.create_region();
        let label = Builder::append(ctx, region).label(Location::Unknown);
        (region, label)
    }

    #[test]
    fn load_sees_the_last_store_through_matching_chains() {
        let mut ctx = Context::new();
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();
        let array = ctx.type_array(u32_type, 4);
        let var_pointer = ctx.type_pointer(StorageClass::Private, array);
        let elem_pointer = ctx.type_pointer(StorageClass::Private, u32_type);

        let globals = ctx.section(crate::spv::Section::Globals);
        let variable = Builder::append(&mut ctx, globals).variable(loc, var_pointer, StorageClass::Private);

        let (region, _label) = block(&mut ctx);
        let zero = ctx.const_u32(0);
        let one = ctx.const_u32(1);
        let seven = ctx.const_u32(7);
        let nine = ctx.const_u32(9);

        let mut builder = Builder::append(&mut ctx, region);
        let chain0 = builder.access_chain(loc, elem_pointer, variable, &[zero]);
        let store0 = builder.store(loc, chain0, seven);
        let chain1 = builder.access_chain(loc, elem_pointer, variable, &[one]);
        builder.store(loc, chain1, nine);
        let chain0_again = builder.access_chain(loc, elem_pointer, variable, &[zero]);
        let load = builder.load(loc, u32_type, chain0_again);
        builder.ret(loc);

        let cfg = Cfg::build(&ctx, region);
        let ssa = MemorySsa::build(&ctx, &cfg, &StoresOnly);
        // The intervening store to index 1 is provably disjoint.
        assert_eq!(ssa.def_for_load(load), Some(store0));
    }

    #[test]
    fn non_constant_index_kills_the_walk() {
        let mut ctx = Context::new();
        let loc = Location::Unknown;
        let u32_type = ctx.type_uint32();
        let array = ctx.type_array(u32_type, 4);
        let var_pointer = ctx.type_pointer(StorageClass::Private, array);
        let elem_pointer = ctx.type_pointer(StorageClass::Private, u32_type);

        let globals = ctx.section(crate::spv::Section::Globals);
        let variable = Builder::append(&mut ctx, globals).variable(loc, var_pointer, StorageClass::Private);

        let (region, _label) = block(&mut ctx);
        let zero = ctx.const_u32(0);
        let seven = ctx.const_u32(7);

        let mut builder = Builder::append(&mut ctx, region);
        let chain0 = builder.access_chain(loc, elem_pointer, variable, &[zero]);
        builder.store(loc, chain0, seven);
        // A store through an unknown index may alias anything.
        let dynamic = builder.undef(loc, u32_type);
        let chain_dyn = builder.access_chain(loc, elem_pointer, variable, &[dynamic]);
        builder.store(loc, chain_dyn, seven);
        let chain0_again = builder.access_chain(loc, elem_pointer, variable, &[zero]);
        let load = builder.load(loc, u32_type, chain0_again);
        builder.ret(loc);

        let cfg = Cfg::build(&ctx, region);
        let ssa = MemorySsa::build(&ctx, &cfg, &StoresOnly);
        assert_eq!(ssa.def_for_load(load), None);
    }
}
