//! On-demand program analyses. Each is a pure function of a root node;
//! results are cached on the [`crate::Context`] and must be invalidated
//! after edits.

mod cfg;
mod dom;
mod memssa;

pub use cfg::{branch_targets, terminator_of, Cfg, CfgNode};
pub use dom::DomTree;
pub use memssa::{reaching_def, root_variable, MemoryModel, MemorySsa, StoresOnly};
