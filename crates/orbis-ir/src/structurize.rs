//! Control-flow structurizer.
//!
//! Rewrites an arbitrary (possibly irreducible) CFG into the nested
//! selection/loop construct discipline SPIR-V requires: every multi-successor
//! block gets an `OpSelectionMerge` or `OpLoopMerge`, merge blocks
//! post-dominate their construct, and loop continues collapse to a single
//! back-edge path. Repairs are applied one at a time; every structural edit
//! invalidates analyses and restarts discovery, so each fixpoint round sees a
//! consistent CFG.

use crate::analysis::{branch_targets, terminator_of, Cfg, DomTree};
use crate::builder::Builder;
use crate::clone::{clone_node, CloneMap, ShallowOperands};
use crate::context::Context;
use crate::node::{Node, Operand, Region};
use crate::spv::Op;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StructurizeError {
    #[error("structurizer gave up after {rounds} rounds")]
    GaveUp { rounds: usize },
}

const MAX_ROUNDS: usize = 4096;

#[derive(Clone)]
struct Construct {
    parent: Option<usize>,
    header: Node,
    merge: Node,
    loop_continue: Option<Node>,
    loop_body: Option<Node>,
}

/// Structurizes `region` until a fixpoint. `exit_label` is the function's
/// epilogue block, which acts as the root construct's merge.
pub fn structurize(
    ctx: &mut Context,
    region: Region,
    exit_label: Node,
) -> Result<(), StructurizeError> {
    for _ in 0..MAX_ROUNDS {
        if !round(ctx, region, exit_label)? {
            normalize_bare_conditionals(ctx, region);
            return Ok(());
        }
    }
    Err(StructurizeError::GaveUp { rounds: MAX_ROUNDS })
}

/// Gives the remaining multi-successor blocks a selection construct.
///
/// After the fixpoint, a conditional whose targets are both landmarks of the
/// enclosing constructs (break/continue edges) carries no merge declaration
/// yet. Wrap each outgoing edge in a trampoline and declare a fresh,
/// unreachable merge block, so every multi-successor block heads a construct
/// of its own.
fn normalize_bare_conditionals(ctx: &mut Context, region: Region) {
    for label in ctx.children_vec(region) {
        if !ctx.is_spv(label, Op::Label) {
            continue;
        }
        let Some(terminator) = terminator_of(ctx, label) else {
            continue;
        };
        if !ctx.spv_op(terminator).is_some_and(Op::is_branch) {
            continue;
        }
        if ctx.spv_op(terminator) == Some(Op::Branch) {
            continue;
        }
        if ctx.prev(terminator).is_some_and(|prev| {
            matches!(
                ctx.spv_op(prev),
                Some(Op::SelectionMerge) | Some(Op::LoopMerge)
            )
        }) {
            continue;
        }

        let loc = ctx.loc(terminator);
        let targets = branch_targets(ctx, terminator);

        for target in targets {
            let mut tail = Builder::append(ctx, region);
            let trampoline = tail.label(loc);
            tail.branch(loc, target);

            // Retarget one edge at a time so duplicate targets each get
            // their own trampoline.
            for index in 0..ctx.operands(terminator).len() {
                if ctx.operand_value(terminator, index) == Some(target) {
                    ctx.replace_operand(terminator, index, Operand::Value(trampoline));
                    break;
                }
            }
            for phi in block_phis(ctx, target) {
                for index in (2..ctx.operands(phi).len()).step_by(2) {
                    if ctx.operand_value(phi, index) == Some(label) {
                        ctx.replace_operand(phi, index, Operand::Value(trampoline));
                    }
                }
            }
        }

        let mut tail = Builder::append(ctx, region);
        let merge = tail.label(loc);
        tail.unreachable(loc);
        Builder::before(ctx, terminator).selection_merge(loc, merge);
    }
    ctx.invalidate_analyses();
}

fn entry_label(ctx: &Context, region: Region) -> Node {
    ctx.children_vec(region)
        .into_iter()
        .find(|&node| ctx.is_spv(node, Op::Label))
        .expect("region has an entry label")
}

fn construct_cfg(ctx: &Context, header: Node, merge: Node) -> Cfg {
    Cfg::build_bounded(ctx, header, &HashSet::from([merge]))
}

/// Swaps `old_target` for `new_target` in a terminator (and in the merge
/// instruction preceding it, so merge declarations track their labels).
fn replace_terminator_target(
    ctx: &mut Context,
    terminator: Node,
    old_target: Node,
    new_target: Node,
) -> bool {
    let mut changed = false;
    for index in 0..ctx.operands(terminator).len() {
        if ctx.operand_value(terminator, index) == Some(old_target) {
            ctx.replace_operand(terminator, index, Operand::Value(new_target));
            changed = true;
        }
    }
    if !changed {
        return false;
    }

    if let Some(merge_inst) = ctx.prev(terminator) {
        if matches!(
            ctx.spv_op(merge_inst),
            Some(Op::SelectionMerge) | Some(Op::LoopMerge)
        ) {
            for index in 0..ctx.operands(merge_inst).len() {
                if ctx.operand_value(merge_inst, index) == Some(old_target) {
                    ctx.replace_operand(merge_inst, index, Operand::Value(new_target));
                }
            }
        }
    }
    true
}

/// Phi instructions at the head of the block starting at `label`.
fn block_phis(ctx: &Context, label: Node) -> Vec<Node> {
    let mut phis = Vec::new();
    let mut cursor = ctx.next(label);
    while let Some(node) = cursor {
        if !ctx.is_spv(node, Op::Phi) {
            break;
        }
        phis.push(node);
        cursor = ctx.next(node);
    }
    phis
}

/// Instructions of the block at `label`, terminator excluded.
fn block_without_terminator(ctx: &Context, label: Node) -> Vec<Node> {
    let mut result = vec![label];
    let mut cursor = ctx.next(label);
    while let Some(node) = cursor {
        if ctx.spv_op(node).is_some_and(Op::is_terminator) {
            break;
        }
        result.push(node);
        cursor = ctx.next(node);
    }
    result
}

/// Inserts a block between `preds` and `to`: the trampoline branches straight
/// to `to`, every pred is rewired onto it, and `to`'s phis are split so each
/// block still lists exactly its own predecessors.
fn create_trampoline(ctx: &mut Context, preds: &[Node], to: Node, to_pred_count: usize) -> (Node, Node) {
    assert!(!preds.is_empty(), "trampoline needs at least one edge");
    let loc = ctx.loc(to);

    let mut builder = Builder::before(ctx, to);
    let trampoline = builder.label(loc);
    let terminator = builder.branch(loc, to);

    if preds.len() == to_pred_count {
        // Every predecessor moves: the phis themselves move wholesale.
        for phi in block_phis(ctx, to) {
            ctx.unlink(phi);
            ctx.insert_after(trampoline, phi);
        }
    } else if preds.len() == 1 {
        let pred = preds[0];
        for phi in block_phis(ctx, to) {
            for index in (2..ctx.operands(phi).len()).step_by(2) {
                if ctx.operand_value(phi, index) == Some(pred) {
                    ctx.replace_operand(phi, index, Operand::Value(trampoline));
                }
            }
        }
    } else {
        // A strict subset of >1 predecessors: fold their incomings into a
        // fresh phi inside the trampoline.
        for phi in block_phis(ctx, to) {
            let phi_type = ctx.value_type(phi).expect("phi has a type");
            let phi_loc = ctx.loc(phi);
            let new_phi = Builder::after(ctx, trampoline).phi(phi_loc, phi_type);

            let mut index = 1;
            while index < ctx.operands(phi).len() {
                let incoming_label = ctx.operand_value(phi, index + 1);
                let from_moved = incoming_label.is_some_and(|label| preds.contains(&label));
                if from_moved {
                    let value = ctx.erase_operand(phi, index);
                    let label = ctx.erase_operand(phi, index);
                    ctx.add_operand(new_phi, value);
                    ctx.add_operand(new_phi, label);
                } else {
                    index += 2;
                }
            }

            ctx.add_operand(phi, Operand::Value(new_phi));
            ctx.add_operand(phi, Operand::Value(trampoline));
        }
    }

    for &pred in preds {
        let pred_terminator = terminator_of(ctx, pred).expect("predecessor has a terminator");
        replace_terminator_target(ctx, pred_terminator, to, trampoline);
    }

    (trampoline, terminator)
}

/// Funnels every invalid exit edge through a synthesized merge block that
/// selects the final destination with a phi + branch/switch.
fn create_merge_block(ctx: &mut Context, original_merge: Node, edges: &[(Node, Node)]) -> Node {
    assert!(!edges.is_empty(), "merge block needs at least one edge");
    let loc = ctx.loc(original_merge);
    let original_terminator =
        terminator_of(ctx, original_merge).expect("merge block has a terminator");

    let mut builder = Builder::after(ctx, original_terminator);
    let merge_label = builder.label(loc);
    let region = ctx.parent(merge_label).expect("label is linked");

    if let [(from, to)] = edges {
        Builder::after(ctx, merge_label).branch(loc, *to);
        let from_terminator = terminator_of(ctx, *from).expect("exit block has a terminator");
        replace_terminator_target(ctx, from_terminator, *to, merge_label);
        return merge_label;
    }

    if let [(first_from, first_to), (second_from, second_to)] = edges {
        let type_bool = ctx.type_bool();
        let mut builder = Builder::after(ctx, merge_label);
        let selector = builder.phi(loc, type_bool);
        builder.branch_conditional(loc, selector, *second_to, *first_to);

        for (index, &(from, to)) in [(*first_from, *first_to), (*second_from, *second_to)]
            .iter()
            .enumerate()
        {
            let mut tail = Builder::append(ctx, region);
            let trampoline = tail.label(loc);
            tail.branch(loc, merge_label);

            let flag = ctx.const_bool(index > 0);
            ctx.add_operand(selector, Operand::Value(flag));
            ctx.add_operand(selector, Operand::Value(trampoline));

            let from_terminator = terminator_of(ctx, from).expect("exit block has a terminator");
            replace_terminator_target(ctx, from_terminator, to, trampoline);
        }
        return merge_label;
    }

    let type_u32 = ctx.type_uint32();
    let mut builder = Builder::after(ctx, merge_label);
    let selector = builder.phi(loc, type_u32);
    let switch = builder.switch(loc, selector, edges[0].1);

    for (index, &(from, to)) in edges.iter().enumerate() {
        let mut tail = Builder::append(ctx, region);
        let trampoline = tail.label(loc);
        tail.branch(loc, merge_label);

        // Switch cases are literals; the phi carries the matching constant.
        let case = ctx.const_u32(index as u32);
        if index != 0 {
            ctx.add_operand(switch, Operand::Int32(index as i32));
            ctx.add_operand(switch, Operand::Value(to));
        }
        ctx.add_operand(selector, Operand::Value(case));
        ctx.add_operand(selector, Operand::Value(trampoline));

        let from_terminator = terminator_of(ctx, from).expect("exit block has a terminator");
        replace_terminator_target(ctx, from_terminator, to, trampoline);
    }
    merge_label
}

/// Duplicates the sub-CFG from `start` up to `stops`, rewiring
/// `rerouted_preds` (minus back edges) onto the clone. Used when an external
/// edge enters a construct somewhere other than its header.
fn clone_block_range(
    ctx: &mut Context,
    start: Node,
    stops: &HashSet<Node>,
    rerouted_preds: &[Node],
    back_edge_preds: &HashSet<Node>,
) {
    let mut cloner = ShallowOperands::new();
    let mut visited: HashSet<Node> = HashSet::from([start]);
    let mut worklist = vec![start];
    let mut cloned_blocks: Vec<Node> = Vec::new();

    while let Some(label) = worklist.pop() {
        let Some(terminator) = terminator_of(ctx, label) else {
            continue;
        };
        let region = ctx.parent(label).expect("block label is linked");
        cloned_blocks.push(label);

        for inst in block_without_terminator(ctx, label) {
            let cloned = clone_node(ctx, inst, &mut cloner);
            if ctx.parent(cloned).is_none() {
                ctx.append(region, cloned);
            }
            if ctx.is_spv(inst, Op::Label) {
                if let Some(name) = ctx.name(inst) {
                    let cloned_name = format!("clone_{name}");
                    ctx.set_name(cloned, cloned_name);
                }
            }
        }

        let cloned_terminator = clone_node(ctx, terminator, &mut cloner);
        ctx.append(region, cloned_terminator);

        // Branch targets that stay inside the cloned range need cloned
        // labels; targets at the boundary keep pointing at the originals.
        for fixup in [Some(cloned_terminator), ctx.prev(cloned_terminator)] {
            let Some(inst) = fixup else { continue };
            let is_merge = matches!(
                ctx.spv_op(inst),
                Some(Op::SelectionMerge) | Some(Op::LoopMerge)
            );
            if inst != cloned_terminator && !is_merge {
                continue;
            }
            for index in 0..ctx.operands(inst).len() {
                let Some(target) = ctx.operand_value(inst, index) else {
                    continue;
                };
                if !ctx.is_spv(target, Op::Label) || stops.contains(&target) {
                    continue;
                }
                let cloned_target = clone_node(ctx, target, &mut cloner);
                ctx.replace_operand(inst, index, Operand::Value(cloned_target));
            }
        }

        for target in branch_targets(ctx, terminator) {
            if stops.contains(&target) {
                continue;
            }
            if visited.insert(target) {
                worklist.push(target);
            }
        }
    }

    // Phi repair. The cloned entry keeps only the rerouted predecessors;
    // interior clones remap their incoming labels/values onto the clones.
    for original_label in cloned_blocks {
        if original_label == start {
            for phi in block_phis(ctx, original_label) {
                let cloned_phi = cloner.get(phi);
                let phi_type = ctx.value_type(phi).expect("phi has a type");
                let phi_loc = ctx.loc(phi);
                let new_phi = Builder::before(ctx, cloned_phi).phi(phi_loc, phi_type);
                ctx.replace_all_uses_with(cloned_phi, new_phi);
                ctx.remove(cloned_phi);

                let mut index = 1;
                while index < ctx.operands(phi).len() {
                    let incoming_label = ctx.operand_value(phi, index + 1);
                    let moves = incoming_label.is_some_and(|label| {
                        rerouted_preds.contains(&label) && !back_edge_preds.contains(&label)
                    });
                    if moves {
                        let value = ctx.erase_operand(phi, index);
                        let label = ctx.erase_operand(phi, index);
                        ctx.add_operand(new_phi, value);
                        ctx.add_operand(new_phi, label);
                    } else {
                        index += 2;
                    }
                }
            }
        } else {
            for phi in block_phis(ctx, original_label) {
                let cloned_phi = cloner.get(phi);
                for index in 1..ctx.operands(cloned_phi).len() {
                    if let Some(value) = ctx.operand_value(cloned_phi, index) {
                        let mapped = cloner.get(value);
                        if mapped != value {
                            ctx.replace_operand(cloned_phi, index, Operand::Value(mapped));
                        }
                    }
                }
            }
        }
    }

    let cloned_start = cloner.get(start);
    for &pred in rerouted_preds {
        if back_edge_preds.contains(&pred) {
            continue;
        }
        let pred_terminator = terminator_of(ctx, pred).expect("predecessor has a terminator");
        replace_terminator_target(ctx, pred_terminator, start, cloned_start);
    }
}

enum Outcome {
    /// A clean construct was identified.
    Construct(usize),
    /// The CFG was repaired; discovery must restart.
    Changed,
    /// Not a construct (single unconditional successor).
    None,
}

fn structurize_construct(
    ctx: &mut Context,
    constructs: &mut Vec<Construct>,
    parent: usize,
    entry: Node,
) -> Result<Outcome, StructurizeError> {
    let parent_header = constructs[parent].header;
    let parent_merge = constructs[parent].merge;
    let parent_continue = constructs[parent].loop_continue;

    let parent_cfg = construct_cfg(ctx, parent_header, parent_merge);
    let Some(entry_terminator) = terminator_of(ctx, entry) else {
        return Ok(Outcome::None);
    };

    // Candidate merge: the common post-dominator of the entry's successors
    // and, for loops, of every back-edge source and its predecessors.
    let query_cfg = construct_cfg(ctx, entry, parent_merge);
    let post_dom = DomTree::post_dominators(&query_cfg);
    // Back edges are judged in the parent construct's CFG: an edge is a back
    // edge only when the candidate header dominates its source from the
    // parent's entry. Rooting dominance at `entry` instead would make every
    // member of a cycle look like a header.
    let parent_dom = DomTree::dominators(&parent_cfg);

    let mut merge: Option<Node> = None;
    for succ in branch_targets(ctx, entry_terminator) {
        merge = Some(match merge {
            None => succ,
            Some(current) if current == succ => current,
            Some(current) => post_dom
                .nearest_common_dominator(current, succ)
                .unwrap_or(parent_merge),
        });
    }
    let mut merge = merge.unwrap_or(parent_merge);

    let back_edges: Vec<Node> = parent_cfg
        .node(entry)
        .map(|node| {
            node.preds
                .iter()
                .copied()
                .filter(|&pred| Some(pred) != parent_continue && parent_dom.dominates(entry, pred))
                .collect()
        })
        .unwrap_or_default();

    let mut is_loop = !back_edges.is_empty() && Some(entry) != parent_continue;

    'widen: for &back_edge in &back_edges {
        merge = post_dom
            .nearest_common_dominator(merge, back_edge)
            .unwrap_or(parent_merge);
        if merge == parent_merge {
            break;
        }
        if let Some(node) = query_cfg.node(back_edge) {
            for &pred in &node.preds {
                merge = post_dom
                    .nearest_common_dominator(merge, pred)
                    .unwrap_or(parent_merge);
                if merge == parent_merge {
                    break 'widen;
                }
            }
        }
    }

    if is_loop {
        let bounded = construct_cfg(ctx, entry, merge);
        is_loop = bounded
            .node(entry)
            .is_some_and(|node| !node.preds.is_empty());
    }

    // If the candidate merge still branches back into the construct it is
    // not a legal merge; move it toward the parent's merge.
    let parent_post_dom = DomTree::post_dominators(&parent_cfg);
    let mut guard = 0usize;
    while merge != parent_merge {
        guard += 1;
        if guard > MAX_ROUNDS {
            return Err(StructurizeError::GaveUp { rounds: guard });
        }
        let bounded = construct_cfg(ctx, entry, merge);
        let escapes = bounded
            .node(merge)
            .is_some_and(|node| !node.succs.is_empty());
        if !escapes {
            break;
        }
        let succs: Vec<Node> = parent_cfg
            .node(merge)
            .map(|node| node.succs.clone())
            .unwrap_or_default();
        for succ in succs {
            merge = parent_post_dom
                .nearest_common_dominator(succ, merge)
                .unwrap_or(parent_merge);
            if merge == parent_merge {
                break;
            }
        }
    }

    // Pick the latest legal merge: slide forward through straight-line
    // single-predecessor blocks.
    while merge != parent_merge {
        let Some(node) = parent_cfg.node(merge) else {
            break;
        };
        if node.succs.len() != 1 {
            break;
        }
        let next = node.succs[0];
        let Some(next_node) = parent_cfg.node(next) else {
            break;
        };
        if next_node.preds.len() != 1 {
            break;
        }
        if next == merge || next == parent_merge {
            break;
        }
        merge = next;
    }

    let result = constructs.len();
    constructs.push(Construct {
        parent: Some(parent),
        header: entry,
        merge,
        loop_continue: parent_continue,
        loop_body: None,
    });

    let result_cfg = construct_cfg(ctx, entry, merge);
    let mut invalid_merge = merge == parent_merge;
    // Deterministic iteration order keeps repeated runs byte-identical.
    let mut invalid_enter: BTreeMap<Node, Vec<Node>> = BTreeMap::new();
    let mut invalid_exit: Vec<(Node, Node)> = Vec::new();

    for &block in result_cfg.preorder() {
        if block == entry {
            continue;
        }
        let Some(parent_node) = parent_cfg.node(block) else {
            continue;
        };
        for &pred in &parent_node.preds {
            if result_cfg.contains(pred) {
                continue;
            }
            if block == merge {
                // Only this construct may branch to its merge block.
                invalid_merge = true;
                continue;
            }
            invalid_enter.entry(block).or_default().push(pred);
        }
        if block == merge {
            continue;
        }
        for &succ in &parent_node.succs {
            if !result_cfg.contains(succ) {
                invalid_exit.push((block, succ));
            }
        }
    }

    let entry_preds: Vec<Node> = result_cfg
        .node(entry)
        .map(|node| node.preds.clone())
        .unwrap_or_default();

    // A loop header may end in OpBranch or OpBranchConditional (the merge
    // declaration precedes either); anything else needs a plain-branch
    // trampoline in front.
    let is_invalid_header = is_loop
        && !matches!(
            ctx.spv_op(entry_terminator),
            Some(Op::Branch) | Some(Op::BranchConditional)
        );
    let mut is_invalid_continue = false;
    if is_loop {
        if entry_preds.len() != 1 {
            is_invalid_continue = true;
        } else {
            // The continue block may only branch back to the header.
            let continue_label = entry_preds[0];
            is_invalid_continue = parent_cfg
                .node(continue_label)
                .is_some_and(|node| node.succs.len() > 1);
        }
    } else if ctx.spv_op(entry_terminator) == Some(Op::Branch) {
        constructs.pop();
        return Ok(Outcome::None);
    }

    if is_loop {
        if !is_invalid_continue {
            constructs[result].loop_continue = Some(entry_preds[0]);
        }
        if !is_invalid_header {
            constructs[result].loop_body = result_cfg
                .node(entry)
                .and_then(|node| node.succs.first().copied());
        }
    }

    if is_loop && is_invalid_continue {
        let to_pred_count = parent_cfg
            .node(entry)
            .map(|node| node.preds.len())
            .unwrap_or(entry_preds.len());
        let (continue_label, _) = create_trampoline(ctx, &entry_preds, entry, to_pred_count);
        constructs[result].loop_continue = Some(continue_label);
        ctx.set_name(continue_label, "continue");
        tracing::trace!(header = ?entry, "inserted continue trampoline");
        ctx.invalidate_analyses();
        return Ok(Outcome::Changed);
    }

    if is_loop && is_invalid_header {
        let preds: Vec<Node> = parent_cfg
            .node(entry)
            .map(|node| node.preds.clone())
            .unwrap_or_default();
        let (new_header, _) = create_trampoline(ctx, &preds, entry, preds.len());
        constructs[result].header = new_header;
        ctx.invalidate_analyses();
        return Ok(Outcome::Changed);
    }

    if !invalid_enter.is_empty() {
        let dom = DomTree::dominators(&result_cfg);
        let mut stops: HashSet<Node> = HashSet::from([merge]);
        if is_loop {
            stops.insert(entry);
        }
        for (to, _external) in invalid_enter {
            let internal_preds: Vec<Node> = result_cfg
                .node(to)
                .map(|node| node.preds.clone())
                .unwrap_or_default();
            let back_edge_preds: HashSet<Node> = internal_preds
                .iter()
                .copied()
                .filter(|&pred| dom.dominates(to, pred))
                .collect();
            tracing::trace!(block = ?to, "cloning externally-entered block range");
            clone_block_range(ctx, to, &stops, &internal_preds, &back_edge_preds);
        }
        ctx.invalidate_analyses();
        return Ok(Outcome::Changed);
    }

    if !invalid_exit.is_empty() {
        let new_merge = create_merge_block(ctx, merge, &invalid_exit);
        constructs[result].merge = new_merge;
        ctx.invalidate_analyses();
        return Ok(Outcome::Changed);
    }

    if invalid_merge {
        let preds: Vec<Node> = result_cfg
            .node(merge)
            .map(|node| node.preds.clone())
            .unwrap_or_default();
        let to_pred_count = parent_cfg
            .node(merge)
            .map(|node| node.preds.len())
            .unwrap_or(preds.len());
        let (new_merge, _) = create_trampoline(ctx, &preds, merge, to_pred_count);
        constructs[result].merge = new_merge;
        ctx.invalidate_analyses();
        return Ok(Outcome::Changed);
    }

    Ok(Outcome::Construct(result))
}

struct WorkEntry {
    header: Node,
    successors: Vec<Node>,
}

fn push_work(
    ctx: &Context,
    worklist: &mut Vec<WorkEntry>,
    label: Node,
    continue_label: Option<Node>,
) {
    let successors = terminator_of(ctx, label)
        .map(|terminator| branch_targets(ctx, terminator))
        .unwrap_or_default()
        .into_iter()
        .filter(|&succ| Some(succ) != continue_label)
        .collect();
    worklist.push(WorkEntry {
        header: label,
        successors,
    });
}

/// One discovery round. Returns whether anything changed (repair applied or
/// merge instruction inserted); the caller iterates to a fixpoint.
fn round(ctx: &mut Context, region: Region, exit_label: Node) -> Result<bool, StructurizeError> {
    let entry = entry_label(ctx, region);

    let mut constructs: Vec<Construct> = vec![Construct {
        parent: None,
        header: entry,
        merge: exit_label,
        loop_continue: None,
        loop_body: None,
    }];
    let mut result_constructs: BTreeMap<Node, usize> = BTreeMap::from([(entry, 0)]);
    let mut current: Option<usize> = Some(0);

    let mut visited: HashSet<Node> = HashSet::new();
    let mut seen: HashSet<Node> = HashSet::new();
    let mut worklist: Vec<WorkEntry> = Vec::new();
    push_work(ctx, &mut worklist, entry, None);

    while let Some(entry_ref) = worklist.last_mut() {
        let Some(label) = entry_ref.successors.pop() else {
            let header = entry_ref.header;
            if let Some(cur) = current {
                if constructs[cur].header == header {
                    current = constructs[cur].parent;
                }
            }
            worklist.pop();
            continue;
        };

        let Some(cur) = current else { continue };
        if label == constructs[cur].merge {
            continue;
        }
        if !visited.insert(label) {
            continue;
        }

        let cfg = construct_cfg(ctx, constructs[cur].header, constructs[cur].merge);
        if !cfg.contains(label) {
            continue;
        }
        let Some(terminator) = terminator_of(ctx, label) else {
            continue;
        };

        let merge_inst = ctx.prev(terminator).filter(|&prev| {
            matches!(
                ctx.spv_op(prev),
                Some(Op::SelectionMerge) | Some(Op::LoopMerge)
            )
        });

        if let Some(merge_inst) = merge_inst {
            // Already-structured construct: descend into it.
            let merge = ctx
                .operand_value(merge_inst, 0)
                .expect("merge instruction names a merge block");
            let parent_continue = constructs[cur].loop_continue;
            let child = constructs.len();
            constructs.push(Construct {
                parent: Some(cur),
                header: label,
                merge,
                loop_continue: parent_continue,
                loop_body: None,
            });
            seen.insert(label);
            seen.insert(merge);
            if ctx.spv_op(merge_inst) == Some(Op::LoopMerge) {
                let continue_label = ctx
                    .operand_value(merge_inst, 1)
                    .expect("loop merge names a continue block");
                constructs[child].loop_continue = Some(continue_label);
                seen.insert(continue_label);
            }
            current = Some(child);
            push_work(ctx, &mut worklist, label, None);
            continue;
        }

        let mut requires_selection = ctx.spv_op(terminator).is_some_and(Op::is_branch);
        if requires_selection && ctx.spv_op(terminator) == Some(Op::BranchConditional) {
            let both_seen = [1, 2].iter().all(|&index| {
                ctx.operand_value(terminator, index)
                    .is_some_and(|target| seen.contains(&target))
            });
            if both_seen {
                requires_selection = false;
            }
        }

        if requires_selection {
            match structurize_construct(ctx, &mut constructs, cur, label)? {
                Outcome::Changed => return Ok(true),
                Outcome::Construct(child) => {
                    let header = constructs[child].header;
                    let merge = constructs[child].merge;
                    let continue_label = constructs[child].loop_continue;
                    seen.insert(header);
                    seen.insert(merge);
                    if let Some(continue_label) = continue_label {
                        seen.insert(continue_label);
                    }

                    let outer_cfg =
                        construct_cfg(ctx, constructs[cur].header, constructs[cur].merge);
                    if continue_label.is_none() {
                        if let Some(merge_node) = outer_cfg.node(merge) {
                            for &pred in &merge_node.preds {
                                push_work(ctx, &mut worklist, pred, None);
                            }
                        }
                    } else {
                        push_work(ctx, &mut worklist, merge, continue_label);
                    }
                    push_work(ctx, &mut worklist, header, None);

                    result_constructs.entry(header).or_insert(child);
                    current = Some(child);
                    continue;
                }
                Outcome::None => {}
            }
        }

        push_work(ctx, &mut worklist, label, None);
    }

    // Install the merge declarations for every construct discovered this
    // round.
    let cfg = construct_cfg(ctx, entry, exit_label);
    let dom = DomTree::dominators(&cfg);
    let mut changed = false;

    for (&header, &index) in &result_constructs {
        let construct = constructs[index].clone();
        let Some(terminator) = terminator_of(ctx, construct.header) else {
            continue;
        };

        if construct.loop_body.is_some() {
            let continue_label = construct
                .loop_continue
                .expect("loop construct has a continue");
            let terminator_loc = ctx.loc(terminator);
            Builder::before(ctx, terminator).loop_merge(
                terminator_loc,
                construct.merge,
                continue_label,
            );
            changed = true;
        } else {
            if ctx.spv_op(terminator) == Some(Op::Branch) {
                continue;
            }
            if ctx
                .prev(terminator)
                .is_some_and(|prev| ctx.spv_op(prev) == Some(Op::SelectionMerge))
            {
                continue;
            }
            if !dom.dominates(header, construct.merge) {
                continue;
            }
            let terminator_loc = ctx.loc(terminator);
            Builder::before(ctx, terminator).selection_merge(terminator_loc, construct.merge);
            changed = true;
        }
    }

    if changed {
        ctx.invalidate_analyses();
    }
    Ok(changed)
}
