use crate::context::Context;
use crate::node::{Node, Region};
use crate::spv::Op;
use std::collections::{HashMap, HashSet};

/// One basic block: its label, terminator, and edges.
pub struct CfgNode {
    pub label: Node,
    pub terminator: Option<Node>,
    pub preds: Vec<Node>,
    pub succs: Vec<Node>,
}

/// Control-flow graph over the blocks reachable from an entry label.
pub struct Cfg {
    pub entry: Node,
    nodes: HashMap<Node, CfgNode>,
    preorder: Vec<Node>,
}

/// The terminator of the block starting at `label`, if the block is complete.
pub fn terminator_of(ctx: &Context, label: Node) -> Option<Node> {
    debug_assert!(ctx.is_spv(label, Op::Label));
    let mut cursor = ctx.next(label);
    while let Some(node) = cursor {
        if ctx.spv_op(node).is_some_and(Op::is_terminator) {
            return Some(node);
        }
        if ctx.is_spv(node, Op::Label) {
            return None;
        }
        cursor = ctx.next(node);
    }
    None
}

/// Labels a terminator can transfer control to.
pub fn branch_targets(ctx: &Context, terminator: Node) -> Vec<Node> {
    match ctx.spv_op(terminator) {
        Some(Op::Branch) => ctx.operand_value(terminator, 0).into_iter().collect(),
        Some(Op::BranchConditional) => [1, 2]
            .iter()
            .filter_map(|&index| ctx.operand_value(terminator, index))
            .collect(),
        Some(Op::Switch) => {
            let mut targets = Vec::new();
            if let Some(default) = ctx.operand_value(terminator, 1) {
                targets.push(default);
            }
            let mut index = 3;
            while let Some(target) = ctx.operand_value(terminator, index) {
                targets.push(target);
                index += 2;
            }
            targets
        }
        _ => Vec::new(),
    }
}

impl Cfg {
    /// Builds the CFG reachable from the region's first label.
    pub fn build(ctx: &Context, region: Region) -> Cfg {
        let entry = ctx
            .children_vec(region)
            .into_iter()
            .find(|&node| ctx.is_spv(node, Op::Label))
            .expect("region has an entry label");
        Cfg::build_bounded(ctx, entry, &HashSet::new())
    }

    /// Builds the subgraph reachable from `entry`, treating `stops` as
    /// boundary blocks: they become nodes, but traversal does not continue
    /// past them and their successor lists only keep members of the
    /// subgraph.
    pub fn build_bounded(ctx: &Context, entry: Node, stops: &HashSet<Node>) -> Cfg {
        let mut nodes: HashMap<Node, CfgNode> = HashMap::new();
        let mut preorder = Vec::new();
        let mut worklist = vec![entry];
        let mut seen: HashSet<Node> = HashSet::from([entry]);

        while let Some(label) = worklist.pop() {
            preorder.push(label);
            let terminator = terminator_of(ctx, label);
            let succs = terminator
                .map(|terminator| branch_targets(ctx, terminator))
                .unwrap_or_default();

            nodes.insert(
                label,
                CfgNode {
                    label,
                    terminator,
                    preds: Vec::new(),
                    succs: succs.clone(),
                },
            );

            if stops.contains(&label) {
                continue;
            }
            for succ in succs {
                if seen.insert(succ) {
                    worklist.push(succ);
                }
            }
        }

        // Keep only edges between members, and derive predecessor lists.
        // Edges are collected in preorder so repeated runs see identical
        // orderings.
        let members: HashSet<Node> = nodes.keys().copied().collect();
        let mut preds: HashMap<Node, Vec<Node>> = HashMap::new();
        for &label in &preorder {
            let node = nodes.get_mut(&label).expect("member");
            node.succs.retain(|succ| members.contains(succ));
            for &succ in &node.succs.clone() {
                preds.entry(succ).or_default().push(label);
            }
        }
        for (label, pred_list) in preds {
            nodes.get_mut(&label).expect("member").preds = pred_list;
        }

        Cfg {
            entry,
            nodes,
            preorder,
        }
    }

    pub fn node(&self, label: Node) -> Option<&CfgNode> {
        self.nodes.get(&label)
    }

    pub fn contains(&self, label: Node) -> bool {
        self.nodes.contains_key(&label)
    }

    pub fn preorder(&self) -> &[Node] {
        &self.preorder
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// DFS postorder from the entry.
    pub fn postorder(&self) -> Vec<Node> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited: HashSet<Node> = HashSet::new();
        // (node, next successor index) — explicit stack to match deep CFGs.
        let mut stack = vec![(self.entry, 0usize)];
        visited.insert(self.entry);

        while let Some(&mut (label, ref mut index)) = stack.last_mut() {
            let succs = &self.nodes[&label].succs;
            if *index < succs.len() {
                let succ = succs[*index];
                *index += 1;
                if visited.insert(succ) {
                    stack.push((succ, 0));
                }
            } else {
                order.push(label);
                stack.pop();
            }
        }
        order
    }
}
