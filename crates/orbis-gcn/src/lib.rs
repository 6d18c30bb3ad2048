//! AMD GCN instruction-set surface.
//!
//! This crate knows how GCN shader code is laid out in memory and nothing
//! else: opcode tables per encoding family, the operand model (register
//! slots, inline constants, trailing literals, V#/T#/S# descriptor
//! composites), and a bit-exact decoder driven by a caller-supplied word
//! fetch. Lifting decoded instructions into an IR is the recompiler's job.

pub mod decode;
mod insn;
mod operand;
pub mod ops;

pub use decode::decode;
pub use insn::{Family, GcnInstruction};
pub use operand::{Access, Operand, OperandKind, Slot};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized instruction encoding {word:#010x} at {address:#x}")]
    UnknownEncoding { address: u64, word: u32 },
    #[error("invalid scalar source index {id} at {address:#x}")]
    InvalidScalarSource { id: u32, address: u64 },
}

impl DecodeError {
    /// The code address the failure was observed at.
    pub fn address(&self) -> u64 {
        match *self {
            DecodeError::UnknownEncoding { address, .. }
            | DecodeError::InvalidScalarSource { address, .. } => address,
        }
    }
}
