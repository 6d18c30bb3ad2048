//! Register-file abstraction.
//!
//! Each logical GCN register becomes one `Private`-storage SPIR-V variable
//! whose type is fixed by the register kind. Wavefront-wide registers (VCC,
//! EXEC) are a pair of 32-bit lane masks; VGPRs get one 32-bit slot per lane.

use orbis_ir::spv::StorageClass;
use orbis_ir::{Context, Node};

pub const WAVEFRONT_LANES: u32 = 64;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RegId {
    Sgpr,
    Vgpr,
    M0,
    Scc,
    Vcc,
    Exec,
    VccZ,
    ExecZ,
    LdsDirect,
    SgprCount,
    VgprCount,
    ThreadId,
    MemoryTable,
    Gds,
}

/// The value shape stored in a register variable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegShape {
    /// Single boolean flag.
    Bool,
    /// Single 32-bit word.
    Word,
    /// Two 32-bit words (lo/hi lane masks or a 64-bit address pair).
    WordPair,
    /// Indexed array of 32-bit words.
    WordArray,
    /// Per-lane indexed array of 32-bit words.
    LaneWordArray,
}

impl RegId {
    pub fn name(self) -> &'static str {
        match self {
            RegId::Sgpr => "sgpr",
            RegId::Vgpr => "vgpr",
            RegId::M0 => "m0",
            RegId::Scc => "scc",
            RegId::Vcc => "vcc",
            RegId::Exec => "exec",
            RegId::VccZ => "vccz",
            RegId::ExecZ => "execz",
            RegId::LdsDirect => "lds_direct",
            RegId::SgprCount => "sgpr_count",
            RegId::VgprCount => "vgpr_count",
            RegId::ThreadId => "thread_id",
            RegId::MemoryTable => "memory_table",
            RegId::Gds => "gds",
        }
    }

    pub fn from_name(name: &str) -> Option<RegId> {
        Some(match name {
            "sgpr" => RegId::Sgpr,
            "vgpr" => RegId::Vgpr,
            "m0" => RegId::M0,
            "scc" => RegId::Scc,
            "vcc" => RegId::Vcc,
            "exec" => RegId::Exec,
            "vccz" => RegId::VccZ,
            "execz" => RegId::ExecZ,
            "lds_direct" => RegId::LdsDirect,
            "sgpr_count" => RegId::SgprCount,
            "vgpr_count" => RegId::VgprCount,
            "thread_id" => RegId::ThreadId,
            "memory_table" => RegId::MemoryTable,
            "gds" => RegId::Gds,
            _ => return None,
        })
    }

    pub fn shape(self) -> RegShape {
        match self {
            RegId::Scc | RegId::VccZ | RegId::ExecZ => RegShape::Bool,
            RegId::M0 | RegId::LdsDirect | RegId::SgprCount | RegId::VgprCount | RegId::ThreadId => {
                RegShape::Word
            }
            RegId::Vcc | RegId::Exec | RegId::MemoryTable | RegId::Gds => RegShape::WordPair,
            RegId::Sgpr => RegShape::WordArray,
            RegId::Vgpr => RegShape::LaneWordArray,
        }
    }

    /// Width in bits of a single indexed element (what one register slot
    /// holds).
    pub fn element_width(self) -> u32 {
        match self.shape() {
            RegShape::Bool => 1,
            _ => 32,
        }
    }

    /// Builds the variable's value type, sized by the environment's register
    /// budget.
    pub fn value_type(self, ctx: &mut Context, sgpr_count: u32, vgpr_count: u32) -> Node {
        let u32_type = ctx.type_uint32();
        match self.shape() {
            RegShape::Bool => ctx.type_bool(),
            RegShape::Word => u32_type,
            RegShape::WordPair => ctx.type_vector(u32_type, 2),
            RegShape::WordArray => ctx.type_array(u32_type, sgpr_count),
            RegShape::LaneWordArray => {
                let per_lane = ctx.type_array(u32_type, vgpr_count);
                ctx.type_array(per_lane, WAVEFRONT_LANES)
            }
        }
    }

    /// Creates the `Private` variable for this register in the globals
    /// section, with its debug name.
    pub fn create_variable(self, ctx: &mut Context, sgpr_count: u32, vgpr_count: u32) -> Node {
        let value_type = self.value_type(ctx, sgpr_count, vgpr_count);
        let pointer_type = ctx.type_pointer(StorageClass::Private, value_type);

        let globals = ctx.section(orbis_ir::spv::Section::Globals);
        let variable = orbis_ir::Builder::append(ctx, globals).variable(
            orbis_ir::Location::Unknown,
            pointer_type,
            StorageClass::Private,
        );
        let debugs = ctx.section(orbis_ir::spv::Section::Debugs);
        orbis_ir::Builder::append(ctx, debugs).name(
            orbis_ir::Location::Unknown,
            variable,
            self.name(),
        );
        ctx.set_name(variable, self.name());
        variable
    }
}

/// Width in bits of a scalar/vector/array type node. Used to decompose
/// reads and writes that span multiple register slots.
pub fn type_width(ctx: &Context, type_node: Node) -> Option<u32> {
    use orbis_ir::spv::Op;
    Some(match ctx.spv_op(type_node)? {
        Op::TypeBool => 1,
        Op::TypeInt | Op::TypeFloat => ctx.operand(type_node, 0).as_i32()? as u32,
        Op::TypeVector => {
            let element = ctx.operand_value(type_node, 0)?;
            let count = ctx.operand(type_node, 1).as_i32()? as u32;
            type_width(ctx, element)? * count
        }
        Op::TypeArray => {
            let element = ctx.operand_value(type_node, 0)?;
            let length = ctx.operand_value(type_node, 1)?;
            let count = ctx.operand(length, 1).as_i32()? as u32;
            type_width(ctx, element)? * count
        }
        _ => return None,
    })
}

/// Whether a register variable declared by the semantic module is layout
/// compatible with the canonical register shape.
pub fn shape_matches(ctx: &Context, reg: RegId, value_type: Node) -> bool {
    use orbis_ir::spv::Op;
    match reg.shape() {
        RegShape::Bool => ctx.spv_op(value_type) == Some(Op::TypeBool),
        RegShape::Word => {
            ctx.spv_op(value_type) == Some(Op::TypeInt)
                && ctx.operand(value_type, 0).as_i32() == Some(32)
        }
        RegShape::WordPair => {
            ctx.spv_op(value_type) == Some(Op::TypeVector)
                && ctx.operand(value_type, 1).as_i32() == Some(2)
        }
        RegShape::WordArray => ctx.spv_op(value_type) == Some(Op::TypeArray),
        RegShape::LaneWordArray => {
            ctx.spv_op(value_type) == Some(Op::TypeArray)
                && ctx
                    .operand_value(value_type, 0)
                    .is_some_and(|element| ctx.spv_op(element) == Some(Op::TypeArray))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_the_register_shapes() {
        let mut ctx = Context::new();
        let scc = RegId::Scc.value_type(&mut ctx, 16, 8);
        assert_eq!(type_width(&ctx, scc), Some(1));

        let vcc = RegId::Vcc.value_type(&mut ctx, 16, 8);
        assert_eq!(type_width(&ctx, vcc), Some(64));

        let sgpr = RegId::Sgpr.value_type(&mut ctx, 16, 8);
        assert_eq!(type_width(&ctx, sgpr), Some(16 * 32));

        let vgpr = RegId::Vgpr.value_type(&mut ctx, 16, 8);
        assert_eq!(type_width(&ctx, vgpr), Some(8 * 32 * WAVEFRONT_LANES));
    }

    #[test]
    fn names_round_trip() {
        for reg in [
            RegId::Sgpr,
            RegId::Vgpr,
            RegId::M0,
            RegId::Scc,
            RegId::Vcc,
            RegId::Exec,
            RegId::VccZ,
            RegId::ExecZ,
            RegId::LdsDirect,
            RegId::SgprCount,
            RegId::VgprCount,
            RegId::ThreadId,
            RegId::MemoryTable,
            RegId::Gds,
        ] {
            assert_eq!(RegId::from_name(reg.name()), Some(reg));
        }
    }
}
