//! Structurizer invariants over hand-built CFGs: diamonds, self-loops, and
//! an irreducible two-entry cycle.

use orbis_ir::analysis::{branch_targets, terminator_of, Cfg, DomTree};
use orbis_ir::spv::Op;
use orbis_ir::{structurize, Builder, Context, Location, Node, Region};
use std::collections::HashSet;

struct Body {
    region: Region,
    exit: Node,
}

fn new_body(ctx: &mut Context, block_count: usize) -> (Body, Vec<Node>) {
    let region = ctx.create_region();
    let loc = Location::Unknown;
    let mut labels = Vec::new();

    // Create all labels up front so terminators can reference them, then
    // leave the blocks open for the test to fill.
    for _ in 0..block_count {
        let label = ctx.create(loc, orbis_ir::Kind::Spv, Op::Label as u32, true, vec![]);
        labels.push(label);
    }
    let exit = {
        let mut builder = Builder::append(ctx, region);
        builder.label(loc)
    };
    // The exit block is appended last; tests append their blocks before it.
    let mut builder = Builder::after(ctx, exit);
    builder.ret(loc);

    (Body { region, exit }, labels)
}

fn open_block(ctx: &mut Context, body: &Body, label: Node) {
    ctx.insert_before(body.exit, label);
}

fn append_branch(ctx: &mut Context, after: Node, target: Node) {
    let node = ctx.create(
        Location::Unknown,
        orbis_ir::Kind::Spv,
        Op::Branch as u32,
        false,
        vec![target.into()],
    );
    ctx.insert_after(after, node);
}

fn append_cond(ctx: &mut Context, after: Node, if_true: Node, if_false: Node) {
    let condition = ctx.const_bool(true);
    let node = ctx.create(
        Location::Unknown,
        orbis_ir::Kind::Spv,
        Op::BranchConditional as u32,
        false,
        vec![condition.into(), if_true.into(), if_false.into()],
    );
    ctx.insert_after(after, node);
}

/// Structurizer soundness: every multi-successor block carries a merge
/// declaration, every merge label is distinct, and loop continues are sole
/// back-edge paths.
fn assert_structured(ctx: &Context, body: &Body) {
    let cfg = Cfg::build(ctx, body.region);
    let dom = DomTree::dominators(&cfg);
    let mut merge_labels: HashSet<Node> = HashSet::new();

    for &label in cfg.preorder() {
        let Some(terminator) = terminator_of(ctx, label) else {
            panic!("block without terminator after structurization");
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
                "multi-successor block lacks a merge declaration"
            );
        }

        if let Some(merge_inst) = merge_inst {
            let merge = ctx.operand_value(merge_inst, 0).expect("merge label");
            assert!(
                merge_labels.insert(merge),
                "merge block declared by two headers"
            );
            if cfg.contains(merge) {
                assert!(
                    dom.dominates(label, merge),
                    "header must dominate its merge"
                );
            }

            if ctx.spv_op(merge_inst) == Some(Op::LoopMerge) {
                let continue_label = ctx.operand_value(merge_inst, 1).expect("continue label");
                let continue_node = cfg.node(continue_label).expect("continue is reachable");
                assert_eq!(
                    continue_node.succs,
                    vec![label],
                    "continue must branch straight back to its header"
                );
            }
        }
    }
}

/// Entry-to-exit paths, as sequences of conditional picks, survive the
/// rewrite for acyclic graphs (cloning may rename blocks but not change
/// which exit decisions exist).
fn count_paths(ctx: &Context, from: Node, exit: Node, budget: usize) -> usize {
    if from == exit {
        return 1;
    }
    if budget == 0 {
        return 0;
    }
    let Some(terminator) = terminator_of(ctx, from) else {
        return 0;
    };
    branch_targets(ctx, terminator)
        .into_iter()
        .map(|succ| count_paths(ctx, succ, exit, budget - 1))
        .sum()
}

#[test]
fn straight_line_is_untouched() {
    let mut ctx = Context::new();
    let (body, labels) = new_body(&mut ctx, 2);
    let &[b0, b1] = &labels[..] else { unreachable!() };

    open_block(&mut ctx, &body, b0);
    append_branch(&mut ctx, b0, b1);
    open_block(&mut ctx, &body, b1);
    append_branch(&mut ctx, b1, body.exit);

    structurize(&mut ctx, body.region, body.exit).expect("structurize");
    assert_structured(&ctx, &body);
    assert_eq!(count_paths(&ctx, b0, body.exit, 16), 1);
}

#[test]
fn diamond_gets_a_selection_merge() {
    let mut ctx = Context::new();
    let (body, labels) = new_body(&mut ctx, 4);
    let &[b0, b1, b2, b3] = &labels[..] else { unreachable!() };

    open_block(&mut ctx, &body, b0);
    append_cond(&mut ctx, b0, b1, b2);
    open_block(&mut ctx, &body, b1);
    append_branch(&mut ctx, b1, b3);
    open_block(&mut ctx, &body, b2);
    append_branch(&mut ctx, b2, b3);
    open_block(&mut ctx, &body, b3);
    append_branch(&mut ctx, b3, body.exit);

    structurize(&mut ctx, body.region, body.exit).expect("structurize");
    assert_structured(&ctx, &body);

    // The conditional must now carry OpSelectionMerge %b3.
    let terminator = terminator_of(&ctx, b0).expect("terminator");
    let merge_inst = ctx.prev(terminator).expect("merge inst");
    assert_eq!(ctx.spv_op(merge_inst), Some(Op::SelectionMerge));
    assert_eq!(ctx.operand_value(merge_inst, 0), Some(b3));

    // Both arms still reach the exit independently.
    assert_eq!(count_paths(&ctx, b0, body.exit, 16), 2);
}

#[test]
fn self_loop_gets_header_continue_and_merge() {
    let mut ctx = Context::new();
    let (body, labels) = new_body(&mut ctx, 2);
    let &[b0, b1] = &labels[..] else { unreachable!() };

    open_block(&mut ctx, &body, b0);
    append_branch(&mut ctx, b0, b1);
    open_block(&mut ctx, &body, b1);
    append_cond(&mut ctx, b1, b1, body.exit);

    structurize(&mut ctx, body.region, body.exit).expect("structurize");
    assert_structured(&ctx, &body);

    // Find the loop header: exactly one block declares OpLoopMerge.
    let cfg = Cfg::build(&ctx, body.region);
    let mut loop_headers = Vec::new();
    for &label in cfg.preorder() {
        let terminator = terminator_of(&ctx, label).expect("terminator");
        if let Some(prev) = ctx.prev(terminator) {
            if ctx.spv_op(prev) == Some(Op::LoopMerge) {
                loop_headers.push((label, prev));
            }
        }
    }
    assert_eq!(loop_headers.len(), 1, "expected exactly one loop header");

    let (header, merge_inst) = loop_headers[0];
    let merge = ctx.operand_value(merge_inst, 0).expect("merge");
    let continue_label = ctx.operand_value(merge_inst, 1).expect("continue");
    assert_ne!(merge, header);
    assert_ne!(continue_label, header);
    assert_ne!(merge, continue_label);

    // The back edge now flows through the continue block alone.
    let header_node = cfg.node(header).expect("header reachable");
    assert!(header_node.preds.contains(&continue_label));
}

#[test]
fn irreducible_two_entry_cycle_is_made_reducible() {
    let mut ctx = Context::new();
    let (body, labels) = new_body(&mut ctx, 4);
    let &[e, a, b, c] = &labels[..] else { unreachable!() };

    // e -> (a, b); a -> (b, c); b -> (a, c); c -> exit.  A and B form a
    // two-entry cycle.
    open_block(&mut ctx, &body, e);
    append_cond(&mut ctx, e, a, b);
    open_block(&mut ctx, &body, a);
    append_cond(&mut ctx, a, b, c);
    open_block(&mut ctx, &body, b);
    append_cond(&mut ctx, b, a, c);
    open_block(&mut ctx, &body, c);
    append_branch(&mut ctx, c, body.exit);

    structurize(&mut ctx, body.region, body.exit).expect("structurize");
    assert_structured(&ctx, &body);

    // Reducibility: every retreating edge of a DFS from the entry must be a
    // true back edge, i.e. its target dominates its source.
    let cfg = Cfg::build(&ctx, body.region);
    let dom = DomTree::dominators(&cfg);
    assert_reducible(&cfg, &dom, e);
}

fn assert_reducible(cfg: &Cfg, dom: &DomTree, entry: Node) {
    let mut on_stack: HashSet<Node> = HashSet::new();
    let mut finished: HashSet<Node> = HashSet::new();
    let mut stack: Vec<(Node, usize)> = vec![(entry, 0)];
    on_stack.insert(entry);

    while let Some(&mut (label, ref mut index)) = stack.last_mut() {
        let succs = &cfg.node(label).expect("member").succs;
        if *index < succs.len() {
            let succ = succs[*index];
            *index += 1;
            if on_stack.contains(&succ) {
                assert!(
                    dom.dominates(succ, label),
                    "retreating edge {label:?} -> {succ:?} without dominance: irreducible"
                );
            } else if !finished.contains(&succ) {
                on_stack.insert(succ);
                stack.push((succ, 0));
            }
        } else {
            on_stack.remove(&label);
            finished.insert(label);
            stack.pop();
        }
    }
}
