// SPDX-License-Identifier: Apache-2.0

//! The Odds-On cache (spec.md §4.4): "the heart of the system". Pre-computes,
//! over an observed query distribution `Q`, cells in which the nearest-
//! neighbor answer is provably constant, so that most queries can skip the
//! backing exact index entirely.

mod interference;
mod kdtree_cache;
mod quadtree_cache;
mod zorder_cache;

pub use zorder_cache::ZOrderTree;

use std::fs::read_to_string;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use yaml_rust::YamlLoader;

use crate::backing::BackingIndex;
use crate::errors::{OddsonError, OddsonResult};
use crate::kdtree::KdTree;
use crate::point::PointSet;
use crate::quadtree::Quadtree;

/// Which backing structure and certification loop the cache builds (spec.md
/// §4.4: "Two concrete strategies are offered; an implementation must
/// provide at least the first").
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Strategy A (primary): a k-d tree over the sample.
    KdTree { max_depth: usize },
    /// Strategy B (alternative): a compressed quadtree over the sample.
    Quadtree { max_depth: usize },
    /// Strategy C (historical variant): Z-order run merging.
    ZOrderRuns { min_run_len: usize },
}

impl Default for Strategy {
    fn default() -> Strategy {
        // spec.md calls the k-d tree cache "primary" and "at least the
        // first" strategy an implementation must provide.
        Strategy::KdTree { max_depth: 6 }
    }
}

/// Build-time counters recovered from `original_source/include/
/// oddson_tree.h`'s file-scope globals `total_nodes`, `terminal_nodes`,
/// `build_nn_queries` (incremented inside `OddsonTreeTerminal::operator()`),
/// re-homed here as per-cache atomics per spec.md §9's "never process-wide"
/// ruling.
#[derive(Debug, Default)]
pub struct CacheStats {
    total_nodes: AtomicU64,
    terminal_nodes: AtomicU64,
    build_nn_queries: AtomicU64,
}

impl CacheStats {
    pub fn total_nodes(&self) -> u64 {
        self.total_nodes.load(AtomicOrdering::Relaxed)
    }
    pub fn terminal_nodes(&self) -> u64 {
        self.terminal_nodes.load(AtomicOrdering::Relaxed)
    }
    pub fn build_nn_queries(&self) -> u64 {
        self.build_nn_queries.load(AtomicOrdering::Relaxed)
    }
}

/// Construction parameters for a [`Cache`]. Grounded the same way as
/// [`crate::kdtree::KdTreeBuilder`]: a `*Builder` struct with setters and a
/// `from_yaml` constructor.
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    strategy: Strategy,
    rng_seed: Option<u64>,
}

impl CacheBuilder {
    pub fn new() -> CacheBuilder {
        CacheBuilder::default()
    }

    pub fn with_strategy(&mut self, strategy: Strategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    pub fn with_rng_seed(&mut self, seed: u64) -> &mut Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> OddsonResult<CacheBuilder> {
        let config = read_to_string(&path)?;
        let docs = YamlLoader::load_from_str(&config).map_err(|e| OddsonError::ParseError {
            line: None,
            message: e.to_string(),
        })?;
        let params = docs.get(0).ok_or_else(|| OddsonError::ParseError {
            line: None,
            message: "empty yaml document".to_string(),
        })?;
        let max_depth = params["max_depth"].as_i64().unwrap_or(6) as usize;
        let strategy = match params["strategy"].as_str() {
            Some("quadtree") => Strategy::Quadtree { max_depth },
            Some("zorder") => Strategy::ZOrderRuns {
                min_run_len: params["min_run_len"].as_i64().unwrap_or(3) as usize,
            },
            _ => Strategy::KdTree { max_depth },
        };
        Ok(CacheBuilder {
            strategy,
            rng_seed: params["rng_seed"].as_i64().map(|i| i as u64),
        })
    }

    /// Builds the cache over `sample` against `backing`, returning the
    /// cache alongside its build-time counters (spec.md §6's
    /// `build_cache(sample, d, backing, D_max) -> Cache`).
    pub fn build<'q>(
        &self,
        sample: PointSet<'q>,
        backing: &BackingIndex,
    ) -> OddsonResult<(Cache<'q>, CacheStats)> {
        let stats = CacheStats::default();
        let cache = match self.strategy {
            Strategy::KdTree { max_depth } => Cache::KdTree(kdtree_cache::build(
                sample,
                backing,
                max_depth,
                self.rng_seed,
                &stats,
            )?),
            Strategy::Quadtree { max_depth } => {
                Cache::Quadtree(quadtree_cache::build(sample, backing, max_depth, &stats)?)
            }
            Strategy::ZOrderRuns { min_run_len } => {
                Cache::ZOrderRuns(zorder_cache::build(sample, backing, min_run_len, &stats))
            }
        };
        log::info!(
            "cache build complete: {}/{} nodes terminal, {} backing NN queries issued",
            stats.terminal_nodes(),
            stats.total_nodes(),
            stats.build_nn_queries()
        );
        Ok((cache, stats))
    }
}

/// The result of [`CacheBuilder::build`]: one of the three strategies,
/// exposed through a single [`Cache::locate`] query surface regardless of
/// which was chosen (spec.md §4.4's query-time descent is strategy-
/// agnostic from the facade's point of view).
#[derive(Debug)]
pub enum Cache<'q> {
    KdTree(KdTree<'q>),
    Quadtree(Quadtree<'q>),
    ZOrderRuns(ZOrderTree<'q>),
}

/// The outcome of a cache descent: the witnessed site, plus any candidate
/// backing-NN sites collected along the way for pre-seeding (spec.md
/// §4.4's "Optional: pre-seeding backing kNN"). Empty for a Z-order run
/// cache hit, which records no intermediate candidates (see
/// [`ZOrderTree::locate`]).
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub site: usize,
    pub candidates: Vec<usize>,
}

impl<'q> Cache<'q> {
    /// `locate(q) -> terminal cell or miss` (spec.md §4.4's query-time
    /// descent): `None` on a miss (outside the cache's coverage, or a
    /// non-terminal fall-through leaf).
    pub fn locate(&self, q: &[f64]) -> Option<CacheHit> {
        match self {
            Cache::KdTree(tree) => {
                kdtree_cache::locate(tree, q).map(|(site, candidates)| CacheHit { site, candidates })
            }
            Cache::Quadtree(tree) => quadtree_cache::locate(tree, q)
                .map(|(site, candidates)| CacheHit { site, candidates }),
            Cache::ZOrderRuns(tree) => tree.locate(q).map(|site| CacheHit {
                site,
                candidates: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kdtree_strategy_is_the_default() {
        let builder = CacheBuilder::new();
        assert!(matches!(builder.strategy, Strategy::KdTree { .. }));
    }

    #[test]
    fn end_to_end_cache_hit_on_a_tight_cluster() {
        let sites = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let sites_ps = PointSet::new(&sites, 2).unwrap();
        let backing = BackingIndex::build_kdtree(sites_ps).unwrap();

        let mut sample = Vec::new();
        for i in 0..64 {
            let jitter = (i as f64 - 32.0) * 0.01;
            sample.push(5.0 + jitter);
            sample.push(5.0 + jitter);
        }
        let sample_ps = PointSet::new(&sample, 2).unwrap();

        let (cache, stats) = CacheBuilder::new()
            .with_rng_seed(0)
            .build(sample_ps, &backing)
            .unwrap();
        assert!(cache.locate(&[5.0, 5.0]).is_some());
        assert!(stats.terminal_nodes() > 0);
    }
}
