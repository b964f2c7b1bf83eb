// SPDX-License-Identifier: Apache-2.0

//! The backing exact nearest-neighbor index: a static k-d tree (spec.md
//! §3, §4.2).

pub(crate) mod builder;
pub(crate) mod node;
pub(crate) mod tree;

pub use builder::{KdTreeBuilder, TerminalPredicate};
pub use node::KNode;
pub use tree::{KdTree, KdTreeStats};
