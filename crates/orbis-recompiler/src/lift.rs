//! GCN → IR lifter.
//!
//! Drives a worklist of code addresses: each address is decoded once and its
//! IR goes into a per-address fragment; fragments are stitched into the
//! function body in address order, with fall-throughs made explicit wherever
//! runs are split. Straight arithmetic goes through semantic-function calls;
//! branches become SPIR-V terminators; indirect branches leave placeholders
//! that the partial evaluator resolves after the worklist drains.

use crate::eval::Evaluator;
use crate::registers::{type_width, RegId, RegShape};
use crate::semantics::{SemanticError, SemanticModule};
use crate::{Environment, RecompileError};
use orbis_gcn::ops::{sop1, sopp, vop1, vop3};
use orbis_gcn::{decode, Family, GcnInstruction, Operand as GcnOperand, OperandKind, Slot};
use orbis_ir::analysis::Cfg;
use orbis_ir::spv::{Op, StorageClass};
use orbis_ir::{amdgpu, Builder, Context, Kind, Location, Node, Operand, Region};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Clone, Copy)]
pub(crate) enum RegIndex {
    Const(u32),
    Value(Node),
}

struct Fragment {
    region: Region,
    end: u64,
}

pub(crate) struct LiftOutput {
    pub body: Region,
    pub epilogue_label: Node,
    pub required_user_sgprs: u32,
}

pub(crate) struct Lifter<'a, R: FnMut(u64) -> u32> {
    ctx: &'a mut Context,
    env: &'a Environment,
    semantics: &'a SemanticModule,
    read_word: &'a mut R,

    body: Region,
    local_variables: Region,
    epilogue_region: Region,
    epilogue_label: Node,

    fragments: BTreeMap<u64, Fragment>,
    /// First IR node of every assembled address, for late label injection.
    anchors: BTreeMap<u64, Node>,
    labels: HashMap<u64, Node>,
    processed: HashSet<u64>,
    pending_branches: Vec<Node>,
    attr_inputs: HashMap<u16, Node>,
    registers: HashMap<RegId, Node>,
    required_user_sgprs: u32,
}

impl<'a, R: FnMut(u64) -> u32> Lifter<'a, R> {
    pub fn new(
        ctx: &'a mut Context,
        env: &'a Environment,
        semantics: &'a SemanticModule,
        read_word: &'a mut R,
    ) -> Lifter<'a, R> {
        let body = ctx.create_region();
        let local_variables = ctx.create_region();
        let epilogue_region = ctx.create_region();
        let epilogue_label = {
            let mut builder = Builder::append(ctx, epilogue_region);
            let label = builder.label(Location::Unknown);
            builder.ret(Location::Unknown);
            label
        };
        let registers = semantics.registers.clone();

        Lifter {
            ctx,
            env,
            semantics,
            read_word,
            body,
            local_variables,
            epilogue_region,
            epilogue_label,
            fragments: BTreeMap::new(),
            anchors: BTreeMap::new(),
            labels: HashMap::new(),
            processed: HashSet::new(),
            pending_branches: Vec::new(),
            attr_inputs: HashMap::new(),
            registers,
            required_user_sgprs: 0,
        }
    }

    pub fn run(mut self, entry: u64) -> Result<LiftOutput, RecompileError> {
        self.lift_batch(entry)?;
        let main_entry = self.get_or_create_label(entry);
        self.assemble_fragments();
        self.emit_entry_block(main_entry);
        self.make_fallthroughs_explicit();

        // Indirect-branch resolution: evaluate each placeholder; a constant
        // target is lifted with the same worklist driver and the placeholder
        // becomes a direct branch.
        while let Some(placeholder) = self.pending_branches.pop() {
            self.ctx.invalidate_analyses();
            let value = self
                .ctx
                .operand_value(placeholder, 0)
                .expect("branch placeholder has a target");
            let entry_node = self
                .ctx
                .region_first(self.body)
                .expect("body has an entry block");
            let body = self.body;
            let cfg = self.ctx.cached_cfg(entry_node, |ctx| Cfg::build(ctx, body));
            let (target, used_user_sgprs) = {
                let mut evaluator = Evaluator::new(
                    &*self.ctx,
                    self.semantics,
                    &cfg,
                    &self.env.user_sgprs,
                    Some(&mut *self.read_word),
                );
                let target = evaluator.eval(value).and_then(|value| value.zext());
                (target, evaluator.used_user_sgprs)
            };
            self.required_user_sgprs |= used_user_sgprs;

            let Some(target) = target else {
                let address = match self.ctx.loc(placeholder) {
                    Location::Memory { base, .. } => base,
                    Location::Unknown => 0,
                };
                return Err(RecompileError::UnresolvedBranch { address });
            };

            tracing::debug!(address = target, "resolved indirect branch");
            self.lift_batch(target)?;
            let label = self.get_or_create_label(target);
            self.assemble_fragments();
            self.make_fallthroughs_explicit();

            let loc = self.ctx.loc(placeholder);
            Builder::before(self.ctx, placeholder).branch(loc, label);
            // The placeholder's target value may now be dead; the branch
            // replaces it entirely.
            self.ctx.remove(placeholder);
        }

        self.splice_locals_after_entry();
        self.ctx.splice_all(self.epilogue_region, self.body);
        self.make_fallthroughs_explicit();
        self.ctx.invalidate_analyses();

        Ok(LiftOutput {
            body: self.body,
            epilogue_label: self.epilogue_label,
            required_user_sgprs: self.required_user_sgprs,
        })
    }

    /// Function-storage variables must sit at the head of the entry block;
    /// late batches may have added more after the entry block was built.
    fn splice_locals_after_entry(&mut self) {
        let Some(entry_label) = self.ctx.region_first(self.body) else {
            return;
        };
        let mut cursor = entry_label;
        for node in self.ctx.children_vec(self.local_variables) {
            self.ctx.unlink(node);
            self.ctx.insert_after(cursor, node);
            cursor = node;
        }
    }

    // ---- worklist driver ----------------------------------------------

    fn lift_batch(&mut self, entry: u64) -> Result<(), RecompileError> {
        let mut worklist = vec![entry];
        while let Some(address) = worklist.pop() {
            if !self.processed.insert(address) {
                continue;
            }
            let mut cursor = address;
            let inst = decode(&mut cursor, self.read_word)?;
            let end = cursor;
            tracing::trace!(address, inst = %inst, "lift");

            self.fragment(address).end = end;
            self.lift_instruction(address, end, &inst, &mut worklist)?;
        }
        Ok(())
    }

    /// Whether `node` ends a block: a SPIR-V terminator, or the indirect
    /// branch placeholder that resolution later replaces with one.
    fn is_block_terminator(&self, node: Node) -> bool {
        self.ctx.spv_op(node).is_some_and(Op::is_terminator)
            || self.ctx.op_of(node) == (Kind::AmdGpu, amdgpu::BRANCH)
    }

    fn fragment(&mut self, address: u64) -> &mut Fragment {
        if !self.fragments.contains_key(&address) {
            let region = self.ctx.create_region();
            self.fragments.insert(
                address,
                Fragment {
                    region,
                    end: address,
                },
            );
        }
        self.fragments.get_mut(&address).expect("just inserted")
    }

    fn get_or_create_label(&mut self, address: u64) -> Node {
        if let Some(&label) = self.labels.get(&address) {
            return label;
        }
        let label = if let Some(&anchor) = self.anchors.get(&address) {
            // The address is already assembled mid-run; split the block.
            let loc = self.ctx.loc(anchor);
            Builder::before(self.ctx, anchor).label(loc)
        } else {
            let region = self.fragment(address).region;
            Builder::prepend(self.ctx, region).label(Location::Memory {
                base: address,
                size: 4,
            })
        };
        self.labels.insert(address, label);
        label
    }

    /// Splices pending fragments into the body in address order, making
    /// run-final fall-throughs explicit where runs are not contiguous.
    fn assemble_fragments(&mut self) {
        let addresses: Vec<u64> = self.fragments.keys().copied().collect();

        // Non-contiguous fall-throughs get an explicit branch while the
        // target fragment is still reachable through the label machinery.
        for (position, &address) in addresses.iter().enumerate() {
            let (region, end) = {
                let fragment = &self.fragments[&address];
                (fragment.region, fragment.end)
            };
            let last = self.ctx.region_last(region);
            let falls_through = last.is_some_and(|node| !self.is_block_terminator(node));
            let contiguous = addresses.get(position + 1) == Some(&end);

            if falls_through && !contiguous {
                let target = self.get_or_create_label(end);
                let loc = Location::Memory {
                    base: address,
                    size: 4,
                };
                Builder::append(self.ctx, region).branch(loc, target);
            }
        }

        let fragments = std::mem::take(&mut self.fragments);
        for (address, fragment) in fragments {
            if let Some(first) = self.ctx.region_first(fragment.region) {
                self.anchors.insert(address, first);
            }
            self.ctx.splice_all(fragment.region, self.body);
        }
    }

    /// A label preceded by a non-terminator receives an explicit branch, so
    /// every block ends in a terminator.
    fn make_fallthroughs_explicit(&mut self) {
        for node in self.ctx.children_vec(self.body) {
            if !self.ctx.is_spv(node, Op::Label) {
                continue;
            }
            let Some(prev) = self.ctx.prev(node) else {
                continue;
            };
            if self.is_block_terminator(prev) {
                continue;
            }
            let loc = self.ctx.loc(node);
            Builder::before(self.ctx, node).branch(loc, node);
        }
    }

    /// Synthetic entry block: seed SGPRs from the user-SGPR pseudo-ops,
    /// record the register budget, and branch to the lifted code.
    fn emit_entry_block(&mut self, main_entry: Node) {
        let loc = Location::Unknown;
        let entry_region = self.ctx.create_region();
        Builder::append(self.ctx, entry_region).label(loc);
        self.ctx.splice_all(self.local_variables, entry_region);

        let u32_type = self.ctx.type_uint32();
        for index in 0..self.env.user_sgprs.len() {
            let value = Builder::append(self.ctx, entry_region).emit_value(
                loc,
                Kind::AmdGpu,
                amdgpu::USER_SGPR,
                vec![u32_type.into(), Operand::Int32(index as i32)],
            );
            self.write_reg(entry_region, RegId::Sgpr, RegIndex::Const(index as u32), value);
        }

        let sgpr_count = self.ctx.const_u32(self.env.sgpr_count);
        self.write_reg(entry_region, RegId::SgprCount, RegIndex::Const(0), sgpr_count);
        let vgpr_count = self.ctx.const_u32(self.env.vgpr_count);
        self.write_reg(entry_region, RegId::VgprCount, RegIndex::Const(0), vgpr_count);

        Builder::append(self.ctx, entry_region).branch(loc, main_entry);

        // The entry block leads the body.
        let rest = std::mem::replace(&mut self.body, entry_region);
        self.ctx.splice_all(rest, self.body);
    }

    // ---- register file -------------------------------------------------

    fn register_var(&mut self, reg: RegId) -> Node {
        if let Some(&variable) = self.registers.get(&reg) {
            return variable;
        }
        let variable = reg.create_variable(self.ctx, self.env.sgpr_count, self.env.vgpr_count);
        self.registers.insert(reg, variable);
        variable
    }

    fn index_value(&mut self, index: RegIndex) -> Node {
        match index {
            RegIndex::Const(value) => self.ctx.const_u32(value),
            RegIndex::Value(node) => node,
        }
    }

    fn register_ref(
        &mut self,
        region: Region,
        reg: RegId,
        index: RegIndex,
        lane: Option<Node>,
    ) -> Node {
        let variable = self.register_var(reg);
        let loc = Location::Unknown;
        match reg.shape() {
            RegShape::Bool | RegShape::Word => variable,
            RegShape::WordPair | RegShape::WordArray => {
                let u32_type = self.ctx.type_uint32();
                let pointer = self.ctx.type_pointer(StorageClass::Private, u32_type);
                let index = self.index_value(index);
                Builder::append(self.ctx, region).access_chain(loc, pointer, variable, &[index])
            }
            RegShape::LaneWordArray => {
                let lane = match lane {
                    Some(lane) => lane,
                    None => {
                        let u32_type = self.ctx.type_uint32();
                        self.read_reg(region, u32_type, RegId::ThreadId, RegIndex::Const(0), None)
                    }
                };
                let u32_type = self.ctx.type_uint32();
                let pointer = self.ctx.type_pointer(StorageClass::Private, u32_type);
                let index = self.index_value(index);
                Builder::append(self.ctx, region)
                    .access_chain(loc, pointer, variable, &[lane, index])
            }
        }
    }

    /// Reads a register slot (or slot run) as `type_node`, decomposing
    /// through loads, composite construction, and bitcasts as needed.
    fn read_reg(
        &mut self,
        region: Region,
        type_node: Node,
        reg: RegId,
        index: RegIndex,
        lane: Option<Node>,
    ) -> Node {
        let loc = Location::Unknown;
        let value_width = type_width(self.ctx, type_node).unwrap_or(32);

        if reg.element_width() == 1 {
            let reference = self.register_ref(region, reg, index, lane);
            let bool_type = self.ctx.type_bool();
            let flag = Builder::append(self.ctx, region).load(loc, bool_type, reference);
            if type_node == bool_type {
                return flag;
            }
            // Bool registers round-trip through Select.
            let (one, zero) = if value_width == 64 {
                (self.ctx.const_u64(1), self.ctx.const_u64(0))
            } else {
                (self.ctx.const_u32(1), self.ctx.const_u32(0))
            };
            return Builder::append(self.ctx, region).select(loc, type_node, flag, one, zero);
        }

        let u32_type = self.ctx.type_uint32();
        if value_width == 32 {
            let reference = self.register_ref(region, reg, index, lane);
            let value = Builder::append(self.ctx, region).load(loc, u32_type, reference);
            if type_node == u32_type {
                return value;
            }
            return Builder::append(self.ctx, region).bitcast(loc, type_node, value);
        }

        // Wider than a slot: load consecutive registers and join them.
        debug_assert!(value_width % 32 == 0 && value_width > 32);
        let count = value_width / 32;
        let mut parts = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let element_index = match index {
                RegIndex::Const(base) => RegIndex::Const(base + offset),
                RegIndex::Value(base) => {
                    let offset_value = self.ctx.const_u32(offset);
                    let sum = Builder::append(self.ctx, region)
                        .i_add(loc, u32_type, base, offset_value);
                    RegIndex::Value(sum)
                }
            };
            let reference = self.register_ref(region, reg, element_index, lane);
            parts.push(Builder::append(self.ctx, region).load(loc, u32_type, reference));
        }

        let joined_type = if count > 4 {
            self.ctx.type_array(u32_type, count)
        } else {
            self.ctx.type_vector(u32_type, count)
        };
        let joined =
            Builder::append(self.ctx, region).composite_construct(loc, joined_type, &parts);
        if joined_type == type_node {
            return joined;
        }
        Builder::append(self.ctx, region).bitcast(loc, type_node, joined)
    }

    fn write_reg(&mut self, region: Region, reg: RegId, index: RegIndex, value: Node) {
        let loc = Location::Unknown;
        let value_type = self.ctx.value_type(value).expect("value has a type");
        let value_width = type_width(self.ctx, value_type).unwrap_or(32);

        if reg.element_width() == 1 {
            let bool_type = self.ctx.type_bool();
            let flag = if value_type == bool_type {
                value
            } else {
                let zero = self.ctx.const_u32(0);
                Builder::append(self.ctx, region).binary(
                    loc,
                    Op::INotEqual,
                    bool_type,
                    value,
                    zero,
                )
            };
            let reference = self.register_ref(region, reg, index, None);
            Builder::append(self.ctx, region).store(loc, reference, flag);
            return;
        }

        let u32_type = self.ctx.type_uint32();
        if value_width == 32 {
            let value = if value_type == u32_type {
                value
            } else {
                Builder::append(self.ctx, region).bitcast(loc, u32_type, value)
            };
            let reference = self.register_ref(region, reg, index, None);
            Builder::append(self.ctx, region).store(loc, reference, value);
            return;
        }

        debug_assert!(value_width % 32 == 0 && value_width > 32);
        let count = value_width / 32;

        // Array-typed values extract per element (arrays cannot be bitcast);
        // everything else splits through a word vector.
        let is_array = self.ctx.spv_op(value_type) == Some(Op::TypeArray);
        let split = if is_array || {
            self.ctx.spv_op(value_type) == Some(Op::TypeVector)
                && self.ctx.operand_value(value_type, 0) == Some(u32_type)
        } {
            value
        } else {
            let split_type = if count > 4 {
                self.ctx.type_array(u32_type, count)
            } else {
                self.ctx.type_vector(u32_type, count)
            };
            Builder::append(self.ctx, region).bitcast(loc, split_type, value)
        };

        for offset in 0..count {
            let element_index = match index {
                RegIndex::Const(base) => RegIndex::Const(base + offset),
                RegIndex::Value(base) => {
                    let offset_value = self.ctx.const_u32(offset);
                    let sum = Builder::append(self.ctx, region)
                        .i_add(loc, u32_type, base, offset_value);
                    RegIndex::Value(sum)
                }
            };
            let element = Builder::append(self.ctx, region).composite_extract(
                loc,
                u32_type,
                split,
                &[offset as i32],
            );
            let reference = self.register_ref(region, reg, element_index, None);
            Builder::append(self.ctx, region).store(loc, reference, element);
        }
    }

    // ---- operand materialization ---------------------------------------

    fn scalar_read(
        &mut self,
        region: Region,
        _loc: Location,
        type_node: Node,
        slot: Slot,
    ) -> Result<Node, RecompileError> {
        let value = match slot {
            Slot::Constant(bits) => self.typed_constant(type_node, bits)?,
            Slot::Literal { address } => Builder::append(self.ctx, region).emit_value(
                Location::Memory { base: address, size: 4 },
                Kind::AmdGpu,
                amdgpu::IMM,
                vec![type_node.into(), Operand::Int64(address as i64)],
            ),
            Slot::VccLo => self.read_reg(region, type_node, RegId::Vcc, RegIndex::Const(0), None),
            Slot::VccHi => self.read_reg(region, type_node, RegId::Vcc, RegIndex::Const(1), None),
            Slot::M0 => self.read_reg(region, type_node, RegId::M0, RegIndex::Const(0), None),
            Slot::ExecLo => self.read_reg(region, type_node, RegId::Exec, RegIndex::Const(0), None),
            Slot::ExecHi => self.read_reg(region, type_node, RegId::Exec, RegIndex::Const(1), None),
            Slot::Scc => self.read_reg(region, type_node, RegId::Scc, RegIndex::Const(0), None),
            Slot::VccZ => self.read_reg(region, type_node, RegId::VccZ, RegIndex::Const(0), None),
            Slot::ExecZ => self.read_reg(region, type_node, RegId::ExecZ, RegIndex::Const(0), None),
            Slot::LdsDirect => {
                self.read_reg(region, type_node, RegId::LdsDirect, RegIndex::Const(0), None)
            }
            Slot::Sgpr(index) => {
                self.read_reg(region, type_node, RegId::Sgpr, RegIndex::Const(index), None)
            }
            Slot::Vgpr(index) => {
                self.read_reg(region, type_node, RegId::Vgpr, RegIndex::Const(index), None)
            }
        };
        Ok(value)
    }

    /// Materializes an inline constant as the requested type, mirroring the
    /// scalar-source table semantics (integer constants sign-extend, float
    /// constants are bit patterns).
    fn typed_constant(&mut self, type_node: Node, bits: u32) -> Result<Node, RecompileError> {
        let u32_type = self.ctx.type_uint32();
        let s32_type = self.ctx.type_sint32();
        let u64_type = self.ctx.type_uint64();
        let s64_type = self.ctx.type_int(64, true);
        let f32_type = self.ctx.type_float(32);
        let bool_type = self.ctx.type_bool();
        let u16_type = self.ctx.type_int(16, false);
        let s16_type = self.ctx.type_int(16, true);

        let node = if type_node == f32_type {
            self.ctx.const_f32(f32::from_bits(bits))
        } else if type_node == u64_type {
            self.ctx.const_u64(u64::from(bits))
        } else if type_node == s64_type {
            let value = bits as i32 as i64;
            self.ctx.constant(s64_type, Operand::Int64(value))
        } else if type_node == s32_type {
            self.ctx.const_i32(bits as i32)
        } else if type_node == u32_type {
            self.ctx.const_u32(bits)
        } else if type_node == u16_type {
            self.ctx.constant(u16_type, Operand::Int32((bits & 0xFFFF) as i32))
        } else if type_node == s16_type {
            self.ctx
                .constant(s16_type, Operand::Int32(bits as u16 as i16 as i32))
        } else if type_node == bool_type {
            self.ctx.const_bool(bits != 0)
        } else {
            // Fall back to the raw word; the consumer bitcasts.
            self.ctx.const_u32(bits)
        };
        Ok(node)
    }

    fn operand_read(
        &mut self,
        region: Region,
        loc: Location,
        type_node: Node,
        operand: &GcnOperand,
    ) -> Result<Node, RecompileError> {
        let u32_type = self.ctx.type_uint32();

        let mut read_registers = |lifter: &mut Self, count: u32| -> Result<Vec<Node>, RecompileError> {
            (0..count)
                .map(|index| lifter.scalar_read(region, loc, u32_type, operand.register(index)))
                .collect()
        };

        match operand.kind {
            OperandKind::Buffer { .. } => {
                let words = read_registers(self, 4)?;
                let mut operands = vec![
                    Operand::Value(type_node),
                    Operand::Int32(i32::from(operand.access.bits())),
                ];
                operands.extend(words.into_iter().map(Operand::Value));
                Ok(Builder::append(self.ctx, region).emit_value(
                    loc,
                    Kind::AmdGpu,
                    amdgpu::VBUFFER,
                    operands,
                ))
            }
            OperandKind::Texture { wide, .. } => {
                let words = read_registers(self, if wide { 8 } else { 4 })?;
                let mut operands = vec![
                    Operand::Value(type_node),
                    Operand::Int32(i32::from(operand.access.bits())),
                ];
                operands.extend(words.into_iter().map(Operand::Value));
                Ok(Builder::append(self.ctx, region).emit_value(
                    loc,
                    Kind::AmdGpu,
                    amdgpu::TBUFFER,
                    operands,
                ))
            }
            OperandKind::Sampler { unnorm, .. } => {
                let words = read_registers(self, 4)?;
                let mut operands = vec![Operand::Value(type_node)];
                operands.extend(words.into_iter().map(Operand::Value));
                operands.push(Operand::Bool(unnorm));
                Ok(Builder::append(self.ctx, region).emit_value(
                    loc,
                    Kind::AmdGpu,
                    amdgpu::SAMPLER,
                    operands,
                ))
            }
            OperandKind::Pointer {
                base,
                offset,
                pointee_size,
            } => {
                let u64_type = self.ctx.type_uint64();
                let s32_type = self.ctx.type_sint32();
                let base = self.scalar_read(region, loc, u64_type, base)?;
                let offset = self.scalar_read(region, loc, s32_type, offset)?;
                Ok(Builder::append(self.ctx, region).emit_value(
                    loc,
                    Kind::AmdGpu,
                    amdgpu::POINTER,
                    vec![
                        Operand::Value(type_node),
                        Operand::Int32(i32::from(pointee_size)),
                        Operand::Value(base),
                        Operand::Value(offset),
                    ],
                ))
            }
            OperandKind::Attr { id, channel } => self.attr_read(region, loc, type_node, id, channel),
            OperandKind::Scalar(slot) => {
                let value = self.scalar_read(region, loc, type_node, slot)?;
                if !operand.neg && !operand.abs {
                    return Ok(value);
                }
                Ok(Builder::append(self.ctx, region).emit_value(
                    loc,
                    Kind::AmdGpu,
                    amdgpu::NEG_ABS,
                    vec![
                        Operand::Value(type_node),
                        Operand::Bool(operand.neg),
                        Operand::Bool(operand.abs),
                        Operand::Value(value),
                    ],
                ))
            }
        }
    }

    fn attr_var(&mut self, id: u16) -> Node {
        if let Some(&variable) = self.attr_inputs.get(&id) {
            return variable;
        }
        let f32_type = self.ctx.type_float(32);
        let vec4 = self.ctx.type_vector(f32_type, 4);
        let value_type = if self.env.supports_barycentric {
            self.ctx.type_array(vec4, 3)
        } else {
            vec4
        };
        let pointer = self.ctx.type_pointer(StorageClass::Input, value_type);
        let globals = self.ctx.section(orbis_ir::spv::Section::Globals);
        let variable =
            Builder::append(self.ctx, globals).variable(Location::Unknown, pointer, StorageClass::Input);
        let debugs = self.ctx.section(orbis_ir::spv::Section::Debugs);
        let name = format!("attr{id}");
        Builder::append(self.ctx, debugs).name(Location::Unknown, variable, &name);
        self.attr_inputs.insert(id, variable);
        variable
    }

    fn attr_read(
        &mut self,
        region: Region,
        loc: Location,
        type_node: Node,
        id: u16,
        channel: u16,
    ) -> Result<Node, RecompileError> {
        let variable = self.attr_var(id);
        let f32_type = self.ctx.type_float(32);

        if self.env.supports_barycentric {
            let pointer = self.ctx.type_pointer(StorageClass::Input, f32_type);
            let channel_index = self.ctx.const_u32(u32::from(channel));
            let mut values = Vec::with_capacity(3);
            for vertex in 0..3u32 {
                let vertex_index = self.ctx.const_u32(vertex);
                let chain = Builder::append(self.ctx, region).access_chain(
                    loc,
                    pointer,
                    variable,
                    &[vertex_index, channel_index],
                );
                values.push(Builder::append(self.ctx, region).load(loc, f32_type, chain));
            }
            return Ok(Builder::append(self.ctx, region)
                .composite_construct(loc, type_node, &values));
        }

        let vec4 = self.ctx.type_vector(f32_type, 4);
        let value = Builder::append(self.ctx, region).load(loc, vec4, variable);
        let element = Builder::append(self.ctx, region).composite_extract(
            loc,
            f32_type,
            value,
            &[i32::from(channel)],
        );
        Ok(Builder::append(self.ctx, region)
            .composite_construct(loc, type_node, &[element, element, element]))
    }

    fn operand_write(&mut self, region: Region, loc: Location, operand: &GcnOperand, value: Node) {
        let mut value = value;
        if operand.clamp || operand.omod != 0 {
            let value_type = self.ctx.value_type(value).expect("value has a type");
            value = Builder::append(self.ctx, region).emit_value(
                loc,
                Kind::AmdGpu,
                amdgpu::OMOD,
                vec![
                    Operand::Value(value_type),
                    Operand::Bool(operand.clamp),
                    Operand::Int32(i32::from(operand.omod)),
                    Operand::Value(value),
                ],
            );
        }

        match operand.kind {
            OperandKind::Scalar(slot) => match slot {
                Slot::VccLo => self.write_reg(region, RegId::Vcc, RegIndex::Const(0), value),
                Slot::VccHi => self.write_reg(region, RegId::Vcc, RegIndex::Const(1), value),
                Slot::M0 => self.write_reg(region, RegId::M0, RegIndex::Const(0), value),
                Slot::ExecLo => self.write_reg(region, RegId::Exec, RegIndex::Const(0), value),
                Slot::ExecHi => self.write_reg(region, RegId::Exec, RegIndex::Const(1), value),
                Slot::Scc => self.write_reg(region, RegId::Scc, RegIndex::Const(0), value),
                Slot::LdsDirect => {
                    self.write_reg(region, RegId::LdsDirect, RegIndex::Const(0), value)
                }
                Slot::Sgpr(index) => {
                    self.write_reg(region, RegId::Sgpr, RegIndex::Const(index), value)
                }
                Slot::Vgpr(index) => {
                    self.write_reg(region, RegId::Vgpr, RegIndex::Const(index), value)
                }
                Slot::VccZ | Slot::ExecZ => {
                    // Derived zero flags are recomputed from VCC/EXEC; a
                    // direct write has no canonical destination.
                    tracing::warn!("dropping write to derived flag {slot}");
                }
                Slot::Constant(_) | Slot::Literal { .. } => {
                    tracing::warn!("dropping write to constant operand");
                }
            },
            _ => {
                // Composite descriptors are read-only packs at this
                // boundary.
                tracing::warn!("dropping write to composite operand");
            }
        }
    }

    // ---- per-instruction lifting ----------------------------------------

    fn lift_instruction(
        &mut self,
        address: u64,
        end: u64,
        inst: &GcnInstruction,
        worklist: &mut Vec<u64>,
    ) -> Result<(), RecompileError> {
        let loc = Location::Memory {
            base: address,
            size: (end - address) as u32,
        };
        let region = self.fragment(address).region;
        let kind = Kind::Gcn(inst.family);

        if inst.is(Family::Sopp, sopp::ENDPGM) {
            let epilogue = self.epilogue_label;
            Builder::append(self.ctx, region).branch(loc, epilogue);
            return Ok(());
        }

        let is_branch = inst.is(Family::Sopp, sopp::BRANCH)
            || inst.is(Family::Sop1, sop1::SETPC_B64)
            || inst.is(Family::Sop1, sop1::SWAPPC_B64);
        if !is_branch {
            worklist.push(end);
        }

        if inst.is(Family::Sopp, sopp::WAITCNT) || inst.is(Family::Sopp, sopp::NOP) {
            // No side effect in this IR.
            return Ok(());
        }

        if inst.is(Family::Sopp, sopp::BRANCH) {
            let displacement = inst.operand(0).constant_value().unwrap_or(0) as i32;
            let target = end.wrapping_add(displacement as i64 as u64);
            worklist.push(target);
            let label = self.get_or_create_label(target);
            Builder::append(self.ctx, region).branch(loc, label);
            return Ok(());
        }

        if matches!(
            inst.op,
            sopp::CBRANCH_SCC0
                | sopp::CBRANCH_SCC1
                | sopp::CBRANCH_VCCZ
                | sopp::CBRANCH_VCCNZ
                | sopp::CBRANCH_EXECZ
                | sopp::CBRANCH_EXECNZ
        ) && inst.family == Family::Sopp
        {
            let bool_type = self.ctx.type_bool();
            let (reg, inverted) = match inst.op {
                sopp::CBRANCH_SCC0 => (RegId::Scc, true),
                sopp::CBRANCH_SCC1 => (RegId::Scc, false),
                sopp::CBRANCH_VCCZ => (RegId::VccZ, false),
                sopp::CBRANCH_VCCNZ => (RegId::VccZ, true),
                sopp::CBRANCH_EXECZ => (RegId::ExecZ, false),
                _ => (RegId::ExecZ, true),
            };
            let mut condition = self.read_reg(region, bool_type, reg, RegIndex::Const(0), None);
            if inverted {
                condition = Builder::append(self.ctx, region).emit_value(
                    loc,
                    Kind::Spv,
                    Op::LogicalNot as u32,
                    vec![bool_type.into(), condition.into()],
                );
            }

            let displacement = inst.operand(0).constant_value().unwrap_or(0) as i32;
            let target = end.wrapping_add(displacement as i64 as u64);
            worklist.push(target);
            let if_true = self.get_or_create_label(target);
            let if_false = self.get_or_create_label(end);
            Builder::append(self.ctx, region).branch_conditional(loc, condition, if_true, if_false);
            return Ok(());
        }

        if inst.is(Family::Sop1, sop1::SETPC_B64) || inst.is(Family::Sop1, sop1::SWAPPC_B64) {
            let u64_type = self.ctx.type_uint64();
            let target = self.operand_read(region, loc, u64_type, inst.operand(1))?;
            if inst.op == sop1::SWAPPC_B64 {
                let return_pc = self.ctx.const_u64(end);
                self.operand_write(region, loc, inst.operand(0), return_pc);
            }
            let placeholder = Builder::append(self.ctx, region).emit(
                loc,
                Kind::AmdGpu,
                amdgpu::BRANCH,
                vec![Operand::Value(target)],
            );
            self.pending_branches.push(placeholder);
            return Ok(());
        }

        if inst.is(Family::Sop1, sop1::GETPC_B64) {
            let value = self.ctx.const_u64(end);
            self.operand_write(region, loc, inst.operand(0), value);
            return Ok(());
        }

        if self.lift_movrel(region, loc, inst)? {
            return Ok(());
        }

        if inst.is(Family::Vintrp, orbis_gcn::ops::vintrp::MOV_F32) {
            if !self.env.supports_barycentric {
                let f32_type = self.ctx.type_float(32);
                let OperandKind::Attr { id, channel } = inst.operand(2).kind else {
                    return Ok(());
                };
                let value = self.attr_read_single(region, loc, f32_type, id, channel);
                self.operand_write(region, loc, inst.operand(0), value);
            }
            return Ok(());
        }

        if let Some(_sem) = self.semantics.find(kind, inst.op) {
            return self.lift_semantic_call(region, loc, kind, inst);
        }

        // Plain moves work without a semantic.
        let is_move = inst.is(Family::Vop1, vop1::MOV_B32)
            || inst.is(Family::Vop3, vop3::MOV_B32)
            || inst.is(Family::Sop1, sop1::MOV_B32)
            || inst.is(Family::Sop1, sop1::MOV_B64)
            || inst.is(Family::Sopk, orbis_gcn::ops::sopk::MOVK_I32);
        if is_move && inst.operands().len() >= 2 {
            let is_64 = inst.is(Family::Sop1, sop1::MOV_B64);
            let type_node = if is_64 {
                self.ctx.type_uint64()
            } else {
                self.ctx.type_uint32()
            };
            let value = self.operand_read(region, loc, type_node, inst.operand(1))?;
            self.operand_write(region, loc, inst.operand(0), value);
            return Ok(());
        }

        Err(RecompileError::BadSemanticModule(
            SemanticError::MissingMnemonic {
                name: inst.display_name(),
            },
        ))
    }

    fn attr_read_single(
        &mut self,
        region: Region,
        loc: Location,
        f32_type: Node,
        id: u16,
        channel: u16,
    ) -> Node {
        let variable = self.attr_var(id);
        let vec4 = self.ctx.type_vector(f32_type, 4);
        let value = Builder::append(self.ctx, region).load(loc, vec4, variable);
        Builder::append(self.ctx, region).composite_extract(
            loc,
            f32_type,
            value,
            &[i32::from(channel)],
        )
    }

    /// `*movrel*`: register moves with an M0-relative index, expanded into a
    /// bounds-checked block using the stored register budget.
    fn lift_movrel(
        &mut self,
        region: Region,
        loc: Location,
        inst: &GcnInstruction,
    ) -> Result<bool, RecompileError> {
        let is_moveld = inst.is(Family::Vop1, vop1::MOVRELD_B32)
            || inst.is(Family::Vop3, vop3::MOVRELD_B32)
            || inst.is(Family::Sop1, sop1::MOVRELD_B32)
            || inst.is(Family::Sop1, sop1::MOVRELD_B64);
        let is_movels = inst.is(Family::Vop1, vop1::MOVRELS_B32)
            || inst.is(Family::Vop3, vop3::MOVRELS_B32)
            || inst.is(Family::Sop1, sop1::MOVRELS_B32)
            || inst.is(Family::Sop1, sop1::MOVRELS_B64);
        let is_movelsd =
            inst.is(Family::Vop1, vop1::MOVRELSD_B32) || inst.is(Family::Vop3, vop3::MOVRELSD_B32);

        if !is_moveld && !is_movels && !is_movelsd {
            return Ok(false);
        }

        let scalar = inst.family == Family::Sop1;
        let (file, count_reg) = if scalar {
            (RegId::Sgpr, RegId::SgprCount)
        } else {
            (RegId::Vgpr, RegId::VgprCount)
        };
        let is_64 = matches!(inst.op, sop1::MOVRELD_B64 | sop1::MOVRELS_B64) && scalar;

        let u32_type = self.ctx.type_uint32();
        let bool_type = self.ctx.type_bool();
        let value_type = if is_64 {
            self.ctx.type_uint64()
        } else {
            u32_type
        };

        let base_index = |operand: &GcnOperand| -> u32 {
            match operand.slot() {
                Some(Slot::Sgpr(index)) | Some(Slot::Vgpr(index)) => index,
                _ => 0,
            }
        };

        let m0 = self.read_reg(region, u32_type, RegId::M0, RegIndex::Const(0), None);
        let count = self.read_reg(region, u32_type, count_reg, RegIndex::Const(0), None);

        if is_movels {
            let base = self.ctx.const_u32(base_index(inst.operand(1)));
            let index = Builder::append(self.ctx, region).i_add(loc, u32_type, base, m0);
            let in_bounds = Builder::append(self.ctx, region).binary(
                loc,
                Op::ULessThan,
                bool_type,
                index,
                count,
            );
            let zero = self.ctx.const_u32(0);
            let index =
                Builder::append(self.ctx, region).select(loc, u32_type, in_bounds, index, zero);
            let value = self.read_reg(region, value_type, file, RegIndex::Value(index), None);
            self.operand_write(region, loc, inst.operand(0), value);
            return Ok(true);
        }

        // moveld / movelsd: guard the destination write behind the bounds
        // check.
        let dst_base = self.ctx.const_u32(base_index(inst.operand(0)));
        let dst_index = Builder::append(self.ctx, region).i_add(loc, u32_type, dst_base, m0);
        let in_bounds = Builder::append(self.ctx, region).binary(
            loc,
            Op::ULessThan,
            bool_type,
            dst_index,
            count,
        );

        let move_block = self
            .ctx
            .create(loc, Kind::Spv, Op::Label as u32, true, vec![]);
        let merge_block = self
            .ctx
            .create(loc, Kind::Spv, Op::Label as u32, true, vec![]);

        {
            let mut builder = Builder::append(self.ctx, region);
            builder.selection_merge(loc, merge_block);
            builder.branch_conditional(loc, in_bounds, move_block, merge_block);
        }
        self.ctx.append(region, move_block);

        let value = if is_movelsd {
            let src_base = self.ctx.const_u32(base_index(inst.operand(1)));
            let src_index = Builder::append(self.ctx, region).i_add(loc, u32_type, src_base, m0);
            let src_in_bounds = Builder::append(self.ctx, region).binary(
                loc,
                Op::ULessThan,
                bool_type,
                src_index,
                count,
            );
            let zero = self.ctx.const_u32(0);
            let src_index = Builder::append(self.ctx, region).select(
                loc,
                u32_type,
                src_in_bounds,
                src_index,
                zero,
            );
            self.read_reg(region, value_type, file, RegIndex::Value(src_index), None)
        } else {
            self.operand_read(region, loc, value_type, inst.operand(1))?
        };
        self.write_reg(region, file, RegIndex::Value(dst_index), value);
        Builder::append(self.ctx, region).branch(loc, merge_block);
        self.ctx.append(region, merge_block);

        Ok(true)
    }

    /// The general path: marshal operands into `Function`-storage variables,
    /// call the semantic, commit the result and write-capable parameters
    /// back to their GCN destinations.
    fn lift_semantic_call(
        &mut self,
        region: Region,
        loc: Location,
        kind: Kind,
        inst: &GcnInstruction,
    ) -> Result<(), RecompileError> {
        let sem = self
            .semantics
            .find(kind, inst.op)
            .expect("caller checked the semantic exists");
        let name = inst.display_name();
        let return_type = sem.return_type;
        let is_void = self.ctx.spv_op(return_type) == Some(Op::TypeVoid);
        let param_types: Vec<Node> = sem.params.iter().map(|param| param.pointee).collect();
        let param_access: Vec<orbis_gcn::Access> =
            sem.params.iter().map(|param| param.access).collect();
        let function = sem.function;

        let mut operands = inst.operands();
        let mut result_operand = None;
        if !is_void {
            let Some((first, rest)) = operands.split_first() else {
                return Err(RecompileError::BadSemanticModule(
                    SemanticError::ArityMismatch {
                        name,
                        expected: param_types.len() + 1,
                        actual: 0,
                    },
                ));
            };
            result_operand = Some(*first);
            operands = rest;
        }

        if operands.len() != param_types.len() {
            if is_void
                && !operands.is_empty()
                && operands[0].access.writes()
                && operands.len() == param_types.len() + 1
            {
                return Err(RecompileError::BadSemanticModule(
                    SemanticError::VoidProducer { name },
                ));
            }
            return Err(RecompileError::BadSemanticModule(
                SemanticError::ArityMismatch {
                    name,
                    expected: param_types.len(),
                    actual: operands.len(),
                },
            ));
        }

        let mut args = Vec::with_capacity(param_types.len());
        for (operand, &pointee) in operands.iter().zip(&param_types) {
            let pointer_type = self.ctx.type_pointer(StorageClass::Function, pointee);
            let variable = {
                let locals = self.local_variables;
                Builder::append(self.ctx, locals).variable(
                    Location::Unknown,
                    pointer_type,
                    StorageClass::Function,
                )
            };
            args.push(variable);
        }

        for ((operand, &pointee), (&variable, access)) in operands
            .iter()
            .zip(&param_types)
            .zip(args.iter().zip(param_access.iter()))
        {
            if access.reads() {
                let value = self.operand_read(region, loc, pointee, operand)?;
                Builder::append(self.ctx, region).store(loc, variable, value);
            }
        }

        let call =
            Builder::append(self.ctx, region).function_call(loc, return_type, function, &args);

        if let Some(result_operand) = result_operand {
            if !result_operand.access.writes() {
                tracing::warn!(
                    inst = %inst,
                    "destination operand lacks write access"
                );
            }
            self.operand_write(region, loc, &result_operand, call);
        }

        for ((operand, &pointee), &variable) in operands.iter().zip(&param_types).zip(&args) {
            if !operand.access.writes() {
                continue;
            }
            let value = Builder::append(self.ctx, region).load(loc, pointee, variable);
            self.operand_write(region, loc, operand, value);
        }

        Ok(())
    }
}
