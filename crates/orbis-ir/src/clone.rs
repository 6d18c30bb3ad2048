use crate::context::Context;
use crate::node::{Node, Operand};
use std::collections::HashMap;

/// Remapping policy for deep clones.
///
/// `get_or_clone` is consulted for every operand reference; implementations
/// may pin a node (return it unchanged), redirect it to an already-chosen
/// replacement, or let the default table-backed cloning take over.
pub trait CloneMap {
    fn get_override(&self, node: Node) -> Option<Node>;
    fn set_override(&mut self, node: Node, replacement: Node);

    fn get_or_clone(&mut self, ctx: &mut Context, node: Node, is_operand: bool) -> Node {
        let _ = is_operand;
        if let Some(replacement) = self.get_override(node) {
            return replacement;
        }
        clone_one(ctx, node, self)
    }

    fn get(&self, node: Node) -> Node {
        self.get_override(node).unwrap_or(node)
    }
}

/// Plain override table; clones everything not explicitly pinned.
#[derive(Default)]
pub struct OverrideMap {
    map: HashMap<Node, Node>,
}

impl OverrideMap {
    pub fn new() -> OverrideMap {
        OverrideMap::default()
    }

    /// Pins `node` so clones keep referring to the original.
    pub fn pin(&mut self, node: Node) {
        self.map.insert(node, node);
    }
}

impl CloneMap for OverrideMap {
    fn get_override(&self, node: Node) -> Option<Node> {
        self.map.get(&node).copied()
    }

    fn set_override(&mut self, node: Node, replacement: Node) {
        self.map.insert(node, replacement);
    }
}

/// Clone policy for intra-region rewrites (the structurizer): operand
/// references are kept as-is, only instructions explicitly cloned through the
/// map get fresh copies.
#[derive(Default)]
pub struct ShallowOperands {
    map: OverrideMap,
}

impl ShallowOperands {
    pub fn new() -> ShallowOperands {
        ShallowOperands::default()
    }
}

impl CloneMap for ShallowOperands {
    fn get_override(&self, node: Node) -> Option<Node> {
        self.map.get_override(node)
    }

    fn set_override(&mut self, node: Node, replacement: Node) {
        self.map.set_override(node, replacement);
    }

    fn get_or_clone(&mut self, ctx: &mut Context, node: Node, is_operand: bool) -> Node {
        if is_operand {
            return self.get_override(node).unwrap_or(node);
        }
        if let Some(replacement) = self.get_override(node) {
            return replacement;
        }
        clone_one(ctx, node, self)
    }
}

fn clone_one(ctx: &mut Context, node: Node, cmap: &mut (impl CloneMap + ?Sized)) -> Node {
    let (kind, op) = ctx.op_of(node);
    let loc = ctx.loc(node);
    let is_value = ctx.is_value(node);
    let replacement = ctx.create(loc, kind, op, is_value, Vec::new());
    // Record the override before walking operands so self-references and
    // cycles resolve to the clone.
    cmap.set_override(node, replacement);

    for index in 0..ctx.operands(node).len() {
        let operand = ctx.operand(node, index).clone();
        let operand = match operand {
            Operand::Value(value) => Operand::Value(cmap.get_or_clone(ctx, value, true)),
            other => other,
        };
        ctx.add_operand(replacement, operand);
    }
    replacement
}

/// Deep-copies `node`, remapping operand references through `cmap`. The clone
/// is unattached; the caller links it wherever it belongs.
pub fn clone_node(ctx: &mut Context, node: Node, cmap: &mut (impl CloneMap + ?Sized)) -> Node {
    cmap.get_or_clone(ctx, node, false)
}
