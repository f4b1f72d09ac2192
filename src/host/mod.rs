//! Host tree adapter module following the crate's `mod` + `core` layout.
//!
//! The reconciler only talks to the target tree through [`HostTree`]. The
//! in-memory [`MemoryTree`] implementation backs the demos, benches and tests.

mod core;
mod memory;

pub use core::{HostTree, NodeId, NodeKind, ancestors, find_first_by_tag, text_content};
pub use memory::{MemoryTree, Mutation};
