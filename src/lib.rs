// SPDX-License-Identifier: Apache-2.0

//! `oddson`: an in-memory approximate nearest-neighbor index that
//! pre-computes, over a known query distribution, cells in which the exact
//! nearest-neighbor answer is provably constant — the Odds-On tree.
//!
//! The crate is organized bottom-up:
//! - [`point`] / [`region`] / [`arena`] / [`pq`] / [`zorder`]: the small
//!   shared primitives every index is built from.
//! - [`kdtree`] / [`quadtree`]: two interchangeable exact backing indices.
//! - [`backing`]: a [`backing::BackingIndex`] enum unifying the two.
//! - [`cache`]: the Odds-On cache itself, in three construction strategies.
//! - [`facade`]: the public cache-first query surface, [`facade::Facade`].
//!
//! [`loader`] and `src/bin/oddson-cli.rs` are the harness layer (spec.md
//! §6): reading the text point format and driving the library from the
//! command line. Neither is part of the stable library surface.

pub mod arena;
pub mod backing;
pub mod cache;
pub mod config;
pub mod errors;
pub mod facade;
pub mod kdtree;
pub mod loader;
pub mod point;
pub mod pq;
pub mod quadtree;
pub mod region;
pub mod zorder;

pub use backing::BackingIndex;
pub use cache::{Cache, CacheBuilder, CacheStats, Strategy};
pub use errors::{OddsonError, OddsonResult};
pub use facade::{Facade, FacadeStats};
pub use point::PointSet;
