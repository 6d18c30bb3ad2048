//! Compiler IR for the GCN → SPIR-V recompiler.
//!
//! A [`Context`] owns every node of one compilation: instructions form
//! doubly-linked lists inside regions, values carry def-use edges, and types
//! and constants are interned (structural equality implies node identity).
//! The crate also carries the SPIR-V dialect with its binary (de)serializer,
//! the CFG/dominator/MemorySSA analyses, and the control-flow structurizer.

pub mod analysis;
mod builder;
mod clone;
mod context;
pub mod dialect;
mod node;
pub mod spv;
mod structurize;

pub use builder::Builder;
pub use clone::{clone_node, CloneMap, OverrideMap, ShallowOperands};
pub use context::Context;
pub use dialect::{amdgpu, instruction_name, Kind};
pub use node::{Location, Node, Operand, Region, UseSite};
pub use structurize::{structurize, StructurizeError};
