//! Dominator and post-dominator trees, Cooper-Harvey-Kennedy style: iterate
//! `idom` to a fixed point over reverse postorder.

use crate::analysis::Cfg;
use crate::node::Node;
use std::collections::HashMap;

const UNDEFINED: usize = usize::MAX;

pub struct DomTree {
    nodes: Vec<Node>,
    index: HashMap<Node, usize>,
    /// Immediate dominator per node index; the root points at itself. Index
    /// 0 is the (possibly virtual) root.
    idom: Vec<usize>,
    virtual_root: bool,
}

impl DomTree {
    /// Dominator tree of `cfg`.
    pub fn dominators(cfg: &Cfg) -> DomTree {
        let mut order = cfg.postorder();
        order.reverse();
        let index: HashMap<Node, usize> = order
            .iter()
            .enumerate()
            .map(|(position, &node)| (node, position))
            .collect();

        let preds: Vec<Vec<usize>> = order
            .iter()
            .map(|&label| {
                cfg.node(label)
                    .map(|node| {
                        node.preds
                            .iter()
                            .filter_map(|pred| index.get(pred).copied())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();

        let idom = solve(order.len(), &preds);
        DomTree {
            nodes: order,
            index,
            idom,
            virtual_root: false,
        }
    }

    /// Post-dominator tree of `cfg`. A virtual root collects every exit
    /// (block without successors), so graphs with several exits still have a
    /// single tree.
    pub fn post_dominators(cfg: &Cfg) -> DomTree {
        // Reverse postorder of the reversed graph, rooted at the virtual
        // exit at position 0.
        let order: Vec<Node> = {
            let mut visited = vec![false; cfg.preorder().len()];
            let positions: HashMap<Node, usize> = cfg
                .preorder()
                .iter()
                .enumerate()
                .map(|(position, &node)| (node, position))
                .collect();
            let exits: Vec<Node> = cfg
                .preorder()
                .iter()
                .copied()
                .filter(|&label| cfg.node(label).is_some_and(|node| node.succs.is_empty()))
                .collect();

            let mut stack: Vec<(Node, usize)> = Vec::new();
            let mut postorder = Vec::new();
            for exit in exits {
                let position = positions[&exit];
                if visited[position] {
                    continue;
                }
                visited[position] = true;
                stack.push((exit, 0));
                while let Some(&mut (label, ref mut next)) = stack.last_mut() {
                    let preds = &cfg.node(label).expect("member").preds;
                    if *next < preds.len() {
                        let pred = preds[*next];
                        *next += 1;
                        let position = positions[&pred];
                        if !visited[position] {
                            visited[position] = true;
                            stack.push((pred, 0));
                        }
                    } else {
                        postorder.push(label);
                        stack.pop();
                    }
                }
            }
            postorder.reverse();
            postorder
        };

        // Shift everything by one to make room for the virtual root.
        let mut nodes = Vec::with_capacity(order.len() + 1);
        nodes.push(order.first().copied().unwrap_or(cfg.entry));
        nodes.extend(order.iter().copied());

        let index: HashMap<Node, usize> = order
            .iter()
            .enumerate()
            .map(|(position, &node)| (node, position + 1))
            .collect();

        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (&label, &position) in &index {
            let cfg_node = cfg.node(label).expect("member");
            // Predecessors in the reversed graph are CFG successors; exits
            // additionally hang off the virtual root.
            preds[position] = cfg_node
                .succs
                .iter()
                .filter_map(|succ| index.get(succ).copied())
                .collect();
            if cfg_node.succs.is_empty() {
                preds[position].push(0);
            }
        }

        let idom = solve(nodes.len(), &preds);
        DomTree {
            nodes,
            index,
            idom,
            virtual_root: true,
        }
    }

    fn position(&self, node: Node) -> Option<usize> {
        self.index.get(&node).copied()
    }

    /// Whether `a` (post-)dominates `b`.
    pub fn dominates(&self, a: Node, b: Node) -> bool {
        let Some(a_position) = self.position(a) else {
            return false;
        };
        let Some(mut cursor) = self.position(b) else {
            return false;
        };
        loop {
            if cursor == a_position {
                return true;
            }
            let parent = self.idom[cursor];
            if parent == UNDEFINED || parent == cursor {
                return false;
            }
            cursor = parent;
        }
    }

    /// Nearest common (post-)dominator of `a` and `b`. `None` when the only
    /// common ancestor is the virtual root.
    pub fn nearest_common_dominator(&self, a: Node, b: Node) -> Option<Node> {
        let mut a_position = self.position(a)?;
        let mut b_position = self.position(b)?;

        while a_position != b_position {
            while a_position > b_position {
                let parent = self.idom[a_position];
                if parent == UNDEFINED {
                    return None;
                }
                a_position = parent;
            }
            while b_position > a_position {
                let parent = self.idom[b_position];
                if parent == UNDEFINED {
                    return None;
                }
                b_position = parent;
            }
        }

        if self.virtual_root && a_position == 0 {
            return None;
        }
        Some(self.nodes[a_position])
    }
}

/// CHK fixed-point solve. `preds` are indices in reverse postorder; node 0
/// is the root.
fn solve(len: usize, preds: &[Vec<usize>]) -> Vec<usize> {
    let mut idom = vec![UNDEFINED; len];
    if len == 0 {
        return idom;
    }
    idom[0] = 0;

    let mut changed = true;
    while changed {
        changed = false;
        for node in 1..len {
            let mut new_idom = UNDEFINED;
            for &pred in &preds[node] {
                if idom[pred] == UNDEFINED {
                    continue;
                }
                new_idom = if new_idom == UNDEFINED {
                    pred
                } else {
                    intersect(&idom, pred, new_idom)
                };
            }
            if new_idom != UNDEFINED && idom[node] != new_idom {
                idom[node] = new_idom;
                changed = true;
            }
        }
    }
    idom
}

fn intersect(idom: &[usize], mut a: usize, mut b: usize) -> usize {
    while a != b {
        while a > b {
            a = idom[a];
        }
        while b > a {
            b = idom[b];
        }
    }
    a
}
