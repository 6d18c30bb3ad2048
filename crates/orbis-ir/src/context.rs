use crate::analysis::{Cfg, MemorySsa};
use crate::dialect::{instruction_name, Kind};
use crate::node::{Location, Node, NodeData, Operand, Region, RegionData, UseSite};
use crate::spv::{Op, Section, StorageClass};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Hash, PartialEq, Eq, Clone)]
enum OpKey {
    Value(Node),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    Float32(u32),
    Float64(u64),
    Str(String),
}

impl OpKey {
    fn of(operand: &Operand) -> OpKey {
        match operand {
            Operand::Value(node) => OpKey::Value(*node),
            Operand::Int32(value) => OpKey::Int32(*value),
            Operand::Int64(value) => OpKey::Int64(*value),
            Operand::Bool(value) => OpKey::Bool(*value),
            Operand::Float32(value) => OpKey::Float32(value.to_bits()),
            Operand::Float64(value) => OpKey::Float64(value.to_bits()),
            Operand::String(value) => OpKey::Str(value.clone()),
        }
    }
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct InternKey {
    kind: Kind,
    op: u32,
    operands: Vec<OpKey>,
}

/// Owning container for one compilation: the node arena, interned types and
/// constants, debug names, module layout sections, and the analysis cache.
pub struct Context {
    nodes: Vec<NodeData>,
    regions: Vec<RegionData>,
    interned: HashMap<InternKey, Node>,
    names: HashMap<Node, String>,
    sections: [Option<Region>; Section::COUNT],
    cfg_cache: RefCell<HashMap<Node, Rc<Cfg>>>,
    memssa_cache: RefCell<HashMap<Node, Rc<MemorySsa>>>,
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

impl Context {
    pub fn new() -> Context {
        Context {
            nodes: Vec::new(),
            regions: Vec::new(),
            interned: HashMap::new(),
            names: HashMap::new(),
            sections: [None; Section::COUNT],
            cfg_cache: RefCell::new(HashMap::new()),
            memssa_cache: RefCell::new(HashMap::new()),
        }
    }

    // ---- node accessors ------------------------------------------------

    fn data(&self, node: Node) -> &NodeData {
        &self.nodes[node.index()]
    }

    fn data_mut(&mut self, node: Node) -> &mut NodeData {
        &mut self.nodes[node.index()]
    }

    pub fn kind(&self, node: Node) -> Kind {
        self.data(node).kind
    }

    pub fn op(&self, node: Node) -> u32 {
        self.data(node).op
    }

    pub fn op_of(&self, node: Node) -> (Kind, u32) {
        let data = self.data(node);
        (data.kind, data.op)
    }

    pub fn spv_op(&self, node: Node) -> Option<Op> {
        let data = self.data(node);
        if data.kind == Kind::Spv {
            Op::from_u32(data.op)
        } else {
            None
        }
    }

    pub fn is_spv(&self, node: Node, op: Op) -> bool {
        self.op_of(node) == (Kind::Spv, op as u32)
    }

    pub fn loc(&self, node: Node) -> Location {
        self.data(node).loc
    }

    pub fn is_value(&self, node: Node) -> bool {
        self.data(node).is_value
    }

    /// Whether the node has been removed (tombstoned). Handles to removed
    /// nodes stay valid but must not be re-linked.
    pub fn is_removed(&self, node: Node) -> bool {
        self.data(node).removed
    }

    pub fn operands(&self, node: Node) -> &[Operand] {
        &self.data(node).operands
    }

    pub fn operand(&self, node: Node, index: usize) -> &Operand {
        &self.data(node).operands[index]
    }

    pub fn operand_value(&self, node: Node, index: usize) -> Option<Node> {
        self.data(node).operands.get(index)?.as_value()
    }

    /// The result type of a value instruction (its first operand).
    pub fn value_type(&self, node: Node) -> Option<Node> {
        debug_assert!(self.is_value(node));
        self.operand_value(node, 0)
    }

    pub fn uses(&self, node: Node) -> &[UseSite] {
        &self.data(node).uses
    }

    pub fn parent(&self, node: Node) -> Option<Region> {
        self.data(node).parent
    }

    pub fn next(&self, node: Node) -> Option<Node> {
        self.data(node).next
    }

    pub fn prev(&self, node: Node) -> Option<Node> {
        self.data(node).prev
    }

    pub fn name(&self, node: Node) -> Option<&str> {
        self.names.get(&node).map(String::as_str)
    }

    pub fn set_name(&mut self, node: Node, name: impl Into<String>) {
        self.names.insert(node, name.into());
    }

    pub fn display(&self, node: Node) -> String {
        let (kind, op) = self.op_of(node);
        instruction_name(kind, op)
    }

    // ---- creation ------------------------------------------------------

    /// Creates an unattached node and wires def-use edges for its value
    /// operands.
    pub fn create(
        &mut self,
        loc: Location,
        kind: Kind,
        op: u32,
        is_value: bool,
        operands: Vec<Operand>,
    ) -> Node {
        let node = Node(u32::try_from(self.nodes.len()).expect("node arena exhausted"));
        self.nodes.push(NodeData {
            kind,
            op,
            loc,
            operands: Vec::new(),
            uses: Vec::new(),
            parent: None,
            prev: None,
            next: None,
            is_value,
            removed: false,
        });

        for operand in operands {
            self.add_operand(node, operand);
        }
        node
    }

    pub fn create_region(&mut self) -> Region {
        let region = Region(u32::try_from(self.regions.len()).expect("region arena exhausted"));
        self.regions.push(RegionData::default());
        region
    }

    // ---- operand mutation ----------------------------------------------

    pub fn add_operand(&mut self, node: Node, operand: Operand) {
        let index = self.data(node).operands.len();
        if let Operand::Value(value) = operand {
            self.data_mut(value).uses.push(UseSite { user: node, index });
        }
        self.data_mut(node).operands.push(operand);
    }

    pub fn replace_operand(&mut self, node: Node, index: usize, operand: Operand) {
        if let Some(old) = self.data(node).operands[index].as_value() {
            self.drop_use(old, node, index);
        }
        if let Operand::Value(value) = operand {
            self.data_mut(value).uses.push(UseSite { user: node, index });
        }
        self.data_mut(node).operands[index] = operand;
    }

    /// Removes operand `index`, shifting the rest down (and keeping their use
    /// sites consistent).
    pub fn erase_operand(&mut self, node: Node, index: usize) -> Operand {
        let operand = self.data_mut(node).operands.remove(index);
        if let Some(value) = operand.as_value() {
            self.drop_use(value, node, index);
        }
        let later: Vec<(usize, Node)> = self
            .data(node)
            .operands
            .iter()
            .enumerate()
            .skip(index)
            .filter_map(|(i, op)| op.as_value().map(|v| (i, v)))
            .collect();
        for (new_index, value) in later {
            for site in &mut self.data_mut(value).uses {
                if site.user == node && site.index == new_index + 1 {
                    site.index = new_index;
                }
            }
        }
        operand
    }

    fn drop_use(&mut self, value: Node, user: Node, index: usize) {
        let uses = &mut self.data_mut(value).uses;
        if let Some(position) = uses
            .iter()
            .position(|site| site.user == user && site.index == index)
        {
            uses.swap_remove(position);
        }
    }

    pub fn replace_all_uses_with(&mut self, old: Node, new: Node) {
        let sites = std::mem::take(&mut self.data_mut(old).uses);
        for site in sites {
            self.data_mut(site.user).operands[site.index] = Operand::Value(new);
            self.data_mut(new).uses.push(site);
        }
    }

    /// Unlinks `node` from its region and releases its operand references.
    /// Uses of the node by live instructions are a programmer error.
    pub fn remove(&mut self, node: Node) {
        debug_assert!(
            self.data(node).uses.is_empty(),
            "removing {} with live uses",
            self.display(node)
        );
        self.unlink(node);
        for index in (0..self.data(node).operands.len()).rev() {
            if let Some(value) = self.data(node).operands[index].as_value() {
                self.drop_use(value, node, index);
            }
        }
        self.data_mut(node).operands.clear();
        self.data_mut(node).removed = true;
    }

    // ---- region linking ------------------------------------------------

    pub fn region_first(&self, region: Region) -> Option<Node> {
        self.regions[region.index()].first
    }

    pub fn region_last(&self, region: Region) -> Option<Node> {
        self.regions[region.index()].last
    }

    /// Children of a region, collected up front so the caller may mutate
    /// while walking.
    pub fn children_vec(&self, region: Region) -> Vec<Node> {
        let mut result = Vec::new();
        let mut cursor = self.region_first(region);
        while let Some(node) = cursor {
            result.push(node);
            cursor = self.next(node);
        }
        result
    }

    pub fn append(&mut self, region: Region, node: Node) {
        debug_assert!(self.data(node).parent.is_none());
        let last = self.regions[region.index()].last;
        self.data_mut(node).parent = Some(region);
        self.data_mut(node).prev = last;
        self.data_mut(node).next = None;
        match last {
            Some(last) => self.data_mut(last).next = Some(node),
            None => self.regions[region.index()].first = Some(node),
        }
        self.regions[region.index()].last = Some(node);
    }

    pub fn prepend(&mut self, region: Region, node: Node) {
        match self.region_first(region) {
            Some(first) => self.insert_before(first, node),
            None => self.append(region, node),
        }
    }

    pub fn insert_before(&mut self, anchor: Node, node: Node) {
        debug_assert!(self.data(node).parent.is_none());
        let region = self.data(anchor).parent.expect("anchor is linked");
        let prev = self.data(anchor).prev;
        self.data_mut(node).parent = Some(region);
        self.data_mut(node).prev = prev;
        self.data_mut(node).next = Some(anchor);
        self.data_mut(anchor).prev = Some(node);
        match prev {
            Some(prev) => self.data_mut(prev).next = Some(node),
            None => self.regions[region.index()].first = Some(node),
        }
    }

    pub fn insert_after(&mut self, anchor: Node, node: Node) {
        debug_assert!(self.data(node).parent.is_none());
        let region = self.data(anchor).parent.expect("anchor is linked");
        let next = self.data(anchor).next;
        self.data_mut(node).parent = Some(region);
        self.data_mut(node).prev = Some(anchor);
        self.data_mut(node).next = next;
        self.data_mut(anchor).next = Some(node);
        match next {
            Some(next) => self.data_mut(next).prev = Some(node),
            None => self.regions[region.index()].last = Some(node),
        }
    }

    pub fn unlink(&mut self, node: Node) {
        let Some(region) = self.data(node).parent else {
            return;
        };
        let prev = self.data(node).prev;
        let next = self.data(node).next;
        match prev {
            Some(prev) => self.data_mut(prev).next = next,
            None => self.regions[region.index()].first = next,
        }
        match next {
            Some(next) => self.data_mut(next).prev = prev,
            None => self.regions[region.index()].last = prev,
        }
        let data = self.data_mut(node);
        data.parent = None;
        data.prev = None;
        data.next = None;
    }

    /// Moves every child of `from` to the end of `to`, preserving order.
    pub fn splice_all(&mut self, from: Region, to: Region) {
        for node in self.children_vec(from) {
            self.unlink(node);
            self.append(to, node);
        }
    }

    // ---- module layout -------------------------------------------------

    pub fn section(&mut self, section: Section) -> Region {
        if let Some(region) = self.sections[section as usize] {
            return region;
        }
        let region = self.create_region();
        self.sections[section as usize] = Some(region);
        region
    }

    pub fn section_if_present(&self, section: Section) -> Option<Region> {
        self.sections[section as usize]
    }

    // ---- interning -----------------------------------------------------

    /// Returns the unique node for `(kind, op, operands)`, creating it at the
    /// end of the globals section on first request.
    pub fn intern(&mut self, kind: Kind, op: u32, operands: Vec<Operand>) -> Node {
        let key = InternKey {
            kind,
            op,
            operands: operands.iter().map(OpKey::of).collect(),
        };
        if let Some(&node) = self.interned.get(&key) {
            return node;
        }
        let node = self.create(Location::Unknown, kind, op, true, operands);
        let globals = self.section(Section::Globals);
        self.append(globals, node);
        self.interned.insert(key, node);
        node
    }

    /// Registers an already-created node (e.g. one produced by the
    /// deserializer) as the canonical interned instance, unless an equal node
    /// is already known.
    pub(crate) fn adopt_interned(&mut self, node: Node) -> Option<Node> {
        let data = self.data(node);
        let key = InternKey {
            kind: data.kind,
            op: data.op,
            operands: data.operands.iter().map(OpKey::of).collect(),
        };
        match self.interned.get(&key) {
            Some(&existing) if existing != node => Some(existing),
            Some(_) => None,
            None => {
                self.interned.insert(key, node);
                None
            }
        }
    }

    // ---- type helpers --------------------------------------------------

    pub fn type_void(&mut self) -> Node {
        self.intern(Kind::Spv, Op::TypeVoid as u32, vec![])
    }

    pub fn type_bool(&mut self) -> Node {
        self.intern(Kind::Spv, Op::TypeBool as u32, vec![])
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> Node {
        self.intern(
            Kind::Spv,
            Op::TypeInt as u32,
            vec![Operand::Int32(width as i32), Operand::Int32(i32::from(signed))],
        )
    }

    pub fn type_uint32(&mut self) -> Node {
        self.type_int(32, false)
    }

    pub fn type_sint32(&mut self) -> Node {
        self.type_int(32, true)
    }

    pub fn type_uint64(&mut self) -> Node {
        self.type_int(64, false)
    }

    pub fn type_float(&mut self, width: u32) -> Node {
        self.intern(
            Kind::Spv,
            Op::TypeFloat as u32,
            vec![Operand::Int32(width as i32)],
        )
    }

    pub fn type_vector(&mut self, element: Node, count: u32) -> Node {
        self.intern(
            Kind::Spv,
            Op::TypeVector as u32,
            vec![Operand::Value(element), Operand::Int32(count as i32)],
        )
    }

    pub fn type_array(&mut self, element: Node, length: u32) -> Node {
        let length = self.const_u32(length);
        self.intern(
            Kind::Spv,
            Op::TypeArray as u32,
            vec![Operand::Value(element), Operand::Value(length)],
        )
    }

    pub fn type_pointer(&mut self, storage: StorageClass, pointee: Node) -> Node {
        self.intern(
            Kind::Spv,
            Op::TypePointer as u32,
            vec![Operand::Int32(storage as i32), Operand::Value(pointee)],
        )
    }

    pub fn type_function(&mut self, return_type: Node, params: &[Node]) -> Node {
        let mut operands = vec![Operand::Value(return_type)];
        operands.extend(params.iter().map(|&param| Operand::Value(param)));
        self.intern(Kind::Spv, Op::TypeFunction as u32, operands)
    }

    // ---- constant helpers ----------------------------------------------

    pub fn constant(&mut self, type_node: Node, literal: Operand) -> Node {
        self.intern(
            Kind::Spv,
            Op::Constant as u32,
            vec![Operand::Value(type_node), literal],
        )
    }

    pub fn const_bool(&mut self, value: bool) -> Node {
        let type_bool = self.type_bool();
        let op = if value {
            Op::ConstantTrue
        } else {
            Op::ConstantFalse
        };
        self.intern(Kind::Spv, op as u32, vec![Operand::Value(type_bool)])
    }

    pub fn const_u32(&mut self, value: u32) -> Node {
        let type_node = self.type_uint32();
        self.constant(type_node, Operand::Int32(value as i32))
    }

    pub fn const_i32(&mut self, value: i32) -> Node {
        let type_node = self.type_sint32();
        self.constant(type_node, Operand::Int32(value))
    }

    pub fn const_u64(&mut self, value: u64) -> Node {
        let type_node = self.type_uint64();
        self.constant(type_node, Operand::Int64(value as i64))
    }

    pub fn const_f32(&mut self, value: f32) -> Node {
        let type_node = self.type_float(32);
        self.constant(type_node, Operand::Float32(value))
    }

    // ---- analysis cache ------------------------------------------------

    pub fn cached_cfg(&self, root: Node, build: impl FnOnce(&Context) -> Cfg) -> Rc<Cfg> {
        if let Some(cfg) = self.cfg_cache.borrow().get(&root) {
            return cfg.clone();
        }
        let cfg = Rc::new(build(self));
        self.cfg_cache.borrow_mut().insert(root, cfg.clone());
        cfg
    }

    pub fn cached_memssa(
        &self,
        root: Node,
        build: impl FnOnce(&Context) -> MemorySsa,
    ) -> Rc<MemorySsa> {
        if let Some(ssa) = self.memssa_cache.borrow().get(&root) {
            return ssa.clone();
        }
        let ssa = Rc::new(build(self));
        self.memssa_cache.borrow_mut().insert(root, ssa.clone());
        ssa
    }

    /// Drops every cached analysis. Must be called after any edit to an
    /// analysed region.
    pub fn invalidate_analyses(&self) {
        self.cfg_cache.borrow_mut().clear();
        self.memssa_cache.borrow_mut().clear();
    }

    // ---- spv helpers ---------------------------------------------------

    /// The storage class of a pointer type node.
    pub fn pointer_storage_class(&self, pointer_type: Node) -> Option<StorageClass> {
        if !self.is_spv(pointer_type, Op::TypePointer) {
            return None;
        }
        StorageClass::from_i32(self.operand(pointer_type, 0).as_i32()?)
    }

    /// The pointee type of a pointer type node.
    pub fn pointee_type(&self, pointer_type: Node) -> Option<Node> {
        if !self.is_spv(pointer_type, Op::TypePointer) {
            return None;
        }
        self.operand_value(pointer_type, 1)
    }
}
