// SPDX-License-Identifier: Apache-2.0

//! An alternative backing exact nearest-neighbor index: a compressed
//! quadtree (spec.md §3, §4.3).

pub(crate) mod builder;
pub(crate) mod node;
pub(crate) mod tree;

pub use builder::{QuadtreeBuilder, QuadtreeTerminalPredicate};
pub use node::QNode;
pub use tree::{Quadtree, QuadtreeStats};
