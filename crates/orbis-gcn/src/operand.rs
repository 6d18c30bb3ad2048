use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// How an instruction touches an operand. Destinations are `W`, sources
    /// `R`; atomics and carry chains use both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Access: u8 {
        const R = 1 << 0;
        const W = 1 << 1;
    }
}

impl Access {
    pub const RW: Access = Access::R.union(Access::W);

    pub fn reads(self) -> bool {
        self.contains(Access::R)
    }

    pub fn writes(self) -> bool {
        self.contains(Access::W)
    }
}

/// A single scalar source/destination slot.
///
/// `Constant` carries the raw 32-bit pattern (inline integer constants are
/// sign-extended into it, float constants are their bit pattern). `Literal`
/// is a trailing `imm32` word identified by its stream address; the decoder
/// has already advanced past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Constant(u32),
    Literal { address: u64 },
    Sgpr(u32),
    Vgpr(u32),
    VccLo,
    VccHi,
    M0,
    ExecLo,
    ExecHi,
    Scc,
    VccZ,
    ExecZ,
    LdsDirect,
}

impl Slot {
    /// The slot `index` registers after this one. Only meaningful for
    /// register slots; the composite-descriptor accessors rely on it.
    pub fn offset_by(self, index: u32) -> Slot {
        match self {
            Slot::Sgpr(base) => Slot::Sgpr(base + index),
            Slot::Vgpr(base) => Slot::Vgpr(base + index),
            other if index == 0 => other,
            other => other,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Slot::Constant(value) => write!(f, "#{value}"),
            Slot::Literal { address } => write!(f, "*{address:#x}"),
            Slot::Sgpr(index) => write!(f, "s{index}"),
            Slot::Vgpr(index) => write!(f, "v{index}"),
            Slot::VccLo => f.write_str("vcc_lo"),
            Slot::VccHi => f.write_str("vcc_hi"),
            Slot::M0 => f.write_str("m0"),
            Slot::ExecLo => f.write_str("exec_lo"),
            Slot::ExecHi => f.write_str("exec_hi"),
            Slot::Scc => f.write_str("scc"),
            Slot::VccZ => f.write_str("vccz"),
            Slot::ExecZ => f.write_str("execz"),
            Slot::LdsDirect => f.write_str("lds_direct"),
        }
    }
}

/// Operand payload: either a scalar slot or one of the composite descriptor
/// kinds read out of consecutive SGPRs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Scalar(Slot),
    /// Interpolated attribute reference (VINTRP only).
    Attr { id: u16, channel: u16 },
    /// V#: a 128-bit buffer descriptor.
    Buffer { base: Slot },
    /// T#: a 128- or 256-bit texture descriptor.
    Texture { base: Slot, wide: bool },
    /// S#: a 128-bit sampler descriptor.
    Sampler { base: Slot, unnorm: bool },
    /// Scalar-memory pointer: 64-bit base pair plus a dword offset.
    Pointer {
        base: Slot,
        offset: Slot,
        pointee_size: u16,
    },
}

/// One decoded GCN operand: payload plus access bits and the VOP3 float
/// modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    pub access: Access,
    pub neg: bool,
    pub abs: bool,
    pub clamp: bool,
    pub omod: u8,
}

impl Operand {
    pub fn scalar(slot: Slot) -> Operand {
        Operand {
            kind: OperandKind::Scalar(slot),
            access: Access::empty(),
            neg: false,
            abs: false,
            clamp: false,
            omod: 0,
        }
    }

    pub fn constant(value: u32) -> Operand {
        Operand::scalar(Slot::Constant(value)).with_access(Access::R)
    }

    pub fn constant_bool(value: bool) -> Operand {
        Operand::constant(u32::from(value))
    }

    pub fn literal(address: u64) -> Operand {
        Operand::scalar(Slot::Literal { address }).with_access(Access::R)
    }

    pub fn sgpr(index: u32) -> Operand {
        Operand::scalar(Slot::Sgpr(index))
    }

    pub fn vgpr(index: u32) -> Operand {
        Operand::scalar(Slot::Vgpr(index))
    }

    pub fn attr(id: u16, channel: u16) -> Operand {
        Operand {
            kind: OperandKind::Attr { id, channel },
            ..Operand::scalar(Slot::Constant(0))
        }
    }

    pub fn buffer(base: Slot) -> Operand {
        Operand {
            kind: OperandKind::Buffer { base },
            ..Operand::scalar(Slot::Constant(0))
        }
    }

    pub fn texture(base: Slot, wide: bool) -> Operand {
        Operand {
            kind: OperandKind::Texture { base, wide },
            ..Operand::scalar(Slot::Constant(0))
        }
    }

    pub fn sampler(base: Slot, unnorm: bool) -> Operand {
        Operand {
            kind: OperandKind::Sampler { base, unnorm },
            ..Operand::scalar(Slot::Constant(0))
        }
    }

    pub fn pointer(base: Slot, pointee_size: u16, offset: Slot) -> Operand {
        Operand {
            kind: OperandKind::Pointer {
                base,
                offset,
                pointee_size,
            },
            ..Operand::scalar(Slot::Constant(0))
        }
    }

    pub fn with_access(mut self, access: Access) -> Operand {
        self.access = access;
        self
    }

    pub fn with_read(self) -> Operand {
        self.with_access(Access::R)
    }

    pub fn with_write(self) -> Operand {
        self.with_access(Access::W)
    }

    pub fn with_rw(self) -> Operand {
        self.with_access(Access::RW)
    }

    pub fn with_neg(mut self, neg: bool) -> Operand {
        self.neg = neg;
        self
    }

    pub fn with_abs(mut self, abs: bool) -> Operand {
        self.abs = abs;
        self
    }

    pub fn with_clamp(mut self, clamp: bool) -> Operand {
        self.clamp = clamp;
        self
    }

    pub fn with_omod(mut self, omod: u8) -> Operand {
        self.omod = omod;
        self
    }

    /// The `index`th constituent register of a composite descriptor (or the
    /// scalar slot itself).
    pub fn register(&self, index: u32) -> Slot {
        match self.kind {
            OperandKind::Scalar(slot) => slot.offset_by(index),
            OperandKind::Buffer { base }
            | OperandKind::Texture { base, .. }
            | OperandKind::Sampler { base, .. }
            | OperandKind::Pointer { base, .. } => base.offset_by(index),
            OperandKind::Attr { .. } => Slot::Constant(0),
        }
    }

    pub fn slot(&self) -> Option<Slot> {
        match self.kind {
            OperandKind::Scalar(slot) => Some(slot),
            _ => None,
        }
    }

    /// The raw payload of an inline-constant scalar operand.
    pub fn constant_value(&self) -> Option<u32> {
        match self.kind {
            OperandKind::Scalar(Slot::Constant(value)) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperandKind::Scalar(slot) => write!(f, "{slot}"),
            OperandKind::Attr { id, channel } => {
                let channel = ["x", "y", "z", "w"].get(channel as usize).unwrap_or(&"?");
                write!(f, "attr{id}.{channel}")
            }
            OperandKind::Buffer { .. } => {
                write!(f, "V#{{{}..{}}}", self.register(0), self.register(3))
            }
            OperandKind::Texture { wide, .. } => {
                let last = if wide { 7 } else { 3 };
                write!(f, "T#{{{}..{}}}", self.register(0), self.register(last))
            }
            OperandKind::Sampler { .. } => {
                write!(f, "S#{{{}..{}}}", self.register(0), self.register(3))
            }
            OperandKind::Pointer { offset, .. } => {
                write!(
                    f,
                    "ptr{{{}..{}}} + {offset}",
                    self.register(0),
                    self.register(1)
                )
            }
        }
    }
}
