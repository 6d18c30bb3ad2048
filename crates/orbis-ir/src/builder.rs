use crate::context::Context;
use crate::dialect::Kind;
use crate::node::{Location, Node, Operand, Region};
use crate::spv::{Op, StorageClass};

enum InsertPoint {
    /// Append to the end of a region.
    Append(Region),
    /// Insert before a fixed anchor (repeated emissions stay in order).
    Before(Node),
    /// Insert after a moving anchor (repeated emissions stay in order).
    After(Node),
}

/// Instruction cursor. Owns a mutable borrow of the context for its lifetime
/// and inserts every emitted instruction at the cursor position.
pub struct Builder<'a> {
    pub ctx: &'a mut Context,
    point: InsertPoint,
}

impl<'a> Builder<'a> {
    pub fn append(ctx: &'a mut Context, region: Region) -> Builder<'a> {
        Builder {
            ctx,
            point: InsertPoint::Append(region),
        }
    }

    pub fn prepend(ctx: &'a mut Context, region: Region) -> Builder<'a> {
        match ctx.region_first(region) {
            Some(first) => Builder {
                ctx,
                point: InsertPoint::Before(first),
            },
            None => Builder {
                ctx,
                point: InsertPoint::Append(region),
            },
        }
    }

    pub fn before(ctx: &'a mut Context, anchor: Node) -> Builder<'a> {
        Builder {
            ctx,
            point: InsertPoint::Before(anchor),
        }
    }

    pub fn after(ctx: &'a mut Context, anchor: Node) -> Builder<'a> {
        Builder {
            ctx,
            point: InsertPoint::After(anchor),
        }
    }

    fn insert(&mut self, node: Node) {
        match self.point {
            InsertPoint::Append(region) => self.ctx.append(region, node),
            InsertPoint::Before(anchor) => self.ctx.insert_before(anchor, node),
            InsertPoint::After(anchor) => {
                self.ctx.insert_after(anchor, node);
                self.point = InsertPoint::After(node);
            }
        }
    }

    /// Emits a non-value instruction.
    pub fn emit(&mut self, loc: Location, kind: Kind, op: u32, operands: Vec<Operand>) -> Node {
        let node = self.ctx.create(loc, kind, op, false, operands);
        self.insert(node);
        node
    }

    /// Emits a value-producing instruction. By convention its first operand
    /// is the result type (type-declaring ops aside).
    pub fn emit_value(
        &mut self,
        loc: Location,
        kind: Kind,
        op: u32,
        operands: Vec<Operand>,
    ) -> Node {
        let node = self.ctx.create(loc, kind, op, true, operands);
        self.insert(node);
        node
    }

    fn spv(&mut self, loc: Location, op: Op, operands: Vec<Operand>) -> Node {
        self.emit(loc, Kind::Spv, op as u32, operands)
    }

    fn spv_value(&mut self, loc: Location, op: Op, operands: Vec<Operand>) -> Node {
        self.emit_value(loc, Kind::Spv, op as u32, operands)
    }

    // ---- SPIR-V conveniences (the ops the pipeline emits) --------------

    pub fn label(&mut self, loc: Location) -> Node {
        self.spv_value(loc, Op::Label, vec![])
    }

    pub fn branch(&mut self, loc: Location, target: Node) -> Node {
        self.spv(loc, Op::Branch, vec![target.into()])
    }

    pub fn branch_conditional(
        &mut self,
        loc: Location,
        condition: Node,
        if_true: Node,
        if_false: Node,
    ) -> Node {
        self.spv(
            loc,
            Op::BranchConditional,
            vec![condition.into(), if_true.into(), if_false.into()],
        )
    }

    pub fn switch(&mut self, loc: Location, selector: Node, default: Node) -> Node {
        self.spv(loc, Op::Switch, vec![selector.into(), default.into()])
    }

    pub fn selection_merge(&mut self, loc: Location, merge: Node) -> Node {
        self.spv(
            loc,
            Op::SelectionMerge,
            vec![merge.into(), Operand::Int32(crate::spv::SELECTION_CONTROL_NONE)],
        )
    }

    pub fn loop_merge(&mut self, loc: Location, merge: Node, continue_target: Node) -> Node {
        self.spv(
            loc,
            Op::LoopMerge,
            vec![
                merge.into(),
                continue_target.into(),
                Operand::Int32(crate::spv::LOOP_CONTROL_NONE),
            ],
        )
    }

    pub fn ret(&mut self, loc: Location) -> Node {
        self.spv(loc, Op::Return, vec![])
    }

    pub fn unreachable(&mut self, loc: Location) -> Node {
        self.spv(loc, Op::Unreachable, vec![])
    }

    pub fn phi(&mut self, loc: Location, result_type: Node) -> Node {
        self.spv_value(loc, Op::Phi, vec![result_type.into()])
    }

    pub fn undef(&mut self, loc: Location, result_type: Node) -> Node {
        self.spv_value(loc, Op::Undef, vec![result_type.into()])
    }

    pub fn variable(&mut self, loc: Location, pointer_type: Node, storage: StorageClass) -> Node {
        self.spv_value(
            loc,
            Op::Variable,
            vec![pointer_type.into(), Operand::Int32(storage as i32)],
        )
    }

    pub fn load(&mut self, loc: Location, result_type: Node, pointer: Node) -> Node {
        self.spv_value(loc, Op::Load, vec![result_type.into(), pointer.into()])
    }

    pub fn store(&mut self, loc: Location, pointer: Node, value: Node) -> Node {
        self.spv(loc, Op::Store, vec![pointer.into(), value.into()])
    }

    pub fn access_chain(
        &mut self,
        loc: Location,
        result_type: Node,
        base: Node,
        indices: &[Node],
    ) -> Node {
        let mut operands = vec![result_type.into(), base.into()];
        operands.extend(indices.iter().map(|&index| Operand::Value(index)));
        self.spv_value(loc, Op::AccessChain, operands)
    }

    pub fn bitcast(&mut self, loc: Location, result_type: Node, value: Node) -> Node {
        self.spv_value(loc, Op::Bitcast, vec![result_type.into(), value.into()])
    }

    pub fn u_convert(&mut self, loc: Location, result_type: Node, value: Node) -> Node {
        self.spv_value(loc, Op::UConvert, vec![result_type.into(), value.into()])
    }

    pub fn s_convert(&mut self, loc: Location, result_type: Node, value: Node) -> Node {
        self.spv_value(loc, Op::SConvert, vec![result_type.into(), value.into()])
    }

    pub fn f_convert(&mut self, loc: Location, result_type: Node, value: Node) -> Node {
        self.spv_value(loc, Op::FConvert, vec![result_type.into(), value.into()])
    }

    pub fn f_negate(&mut self, loc: Location, result_type: Node, value: Node) -> Node {
        self.spv_value(loc, Op::FNegate, vec![result_type.into(), value.into()])
    }

    pub fn select(
        &mut self,
        loc: Location,
        result_type: Node,
        condition: Node,
        if_true: Node,
        if_false: Node,
    ) -> Node {
        self.spv_value(
            loc,
            Op::Select,
            vec![
                result_type.into(),
                condition.into(),
                if_true.into(),
                if_false.into(),
            ],
        )
    }

    pub fn binary(
        &mut self,
        loc: Location,
        op: Op,
        result_type: Node,
        lhs: Node,
        rhs: Node,
    ) -> Node {
        self.spv_value(loc, op, vec![result_type.into(), lhs.into(), rhs.into()])
    }

    pub fn i_add(&mut self, loc: Location, result_type: Node, lhs: Node, rhs: Node) -> Node {
        self.binary(loc, Op::IAdd, result_type, lhs, rhs)
    }

    pub fn s_less_than(&mut self, loc: Location, result_type: Node, lhs: Node, rhs: Node) -> Node {
        self.binary(loc, Op::SLessThan, result_type, lhs, rhs)
    }

    pub fn composite_construct(
        &mut self,
        loc: Location,
        result_type: Node,
        constituents: &[Node],
    ) -> Node {
        let mut operands = vec![result_type.into()];
        operands.extend(constituents.iter().map(|&node| Operand::Value(node)));
        self.spv_value(loc, Op::CompositeConstruct, operands)
    }

    pub fn composite_extract(
        &mut self,
        loc: Location,
        result_type: Node,
        composite: Node,
        indices: &[i32],
    ) -> Node {
        let mut operands = vec![result_type.into(), composite.into()];
        operands.extend(indices.iter().map(|&index| Operand::Int32(index)));
        self.spv_value(loc, Op::CompositeExtract, operands)
    }

    pub fn function_call(
        &mut self,
        loc: Location,
        result_type: Node,
        function: Node,
        args: &[Node],
    ) -> Node {
        let mut operands = vec![result_type.into(), function.into()];
        operands.extend(args.iter().map(|&arg| Operand::Value(arg)));
        self.spv_value(loc, Op::FunctionCall, operands)
    }

    pub fn name(&mut self, loc: Location, target: Node, name: &str) -> Node {
        self.spv(loc, Op::Name, vec![target.into(), name.into()])
    }
}
