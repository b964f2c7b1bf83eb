// SPDX-License-Identifier: Apache-2.0

//! The public entry point (spec.md §4.5): a cache-first `nn`/`knn` surface
//! over a backing exact index, falling through to the backing index on a
//! cache miss.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::backing::BackingIndex;
use crate::cache::Cache;
use crate::point::squared_distance;

/// Hit/query counters (spec.md §5: "implementations should either use
/// atomics or document that counters are approximate"; this crate picks
/// atomics, mirroring `goko`'s preference for atomic counters over locks on
/// simple shared read state).
#[derive(Debug, Default)]
pub struct FacadeStats {
    hits: AtomicU64,
    queries: AtomicU64,
}

impl FacadeStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }
    pub fn queries(&self) -> u64 {
        self.queries.load(AtomicOrdering::Relaxed)
    }
    /// Fraction of queries the cache short-circuited; `0.0` if there have
    /// been no queries yet.
    pub fn hit_ratio(&self) -> f64 {
        let q = self.queries();
        if q == 0 {
            0.0
        } else {
            self.hits() as f64 / q as f64
        }
    }
}

/// Owns a backing index and, optionally, a cache over it; the only stable
/// library surface per spec.md §6.
pub struct Facade<'p> {
    backing: BackingIndex<'p>,
    cache: Option<Cache<'p>>,
    stats: FacadeStats,
}

impl<'p> Facade<'p> {
    pub fn new(backing: BackingIndex<'p>, cache: Option<Cache<'p>>) -> Facade<'p> {
        Facade {
            backing,
            cache,
            stats: FacadeStats::default(),
        }
    }

    pub fn stats(&self) -> &FacadeStats {
        &self.stats
    }

    pub fn backing(&self) -> &BackingIndex<'p> {
        &self.backing
    }

    /// `nn(q, ε) -> (site, sq_dist)`: cache-first (spec.md §4.5). On a cache
    /// hit, the distance is computed directly against the witnessed site's
    /// coordinates rather than re-querying the backing index.
    pub fn nn(&self, q: &[f64], eps: f64) -> Option<(usize, f64)> {
        self.stats.queries.fetch_add(1, AtomicOrdering::Relaxed);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.locate(q) {
                self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
                let site_point = self.backing.points().point(hit.site);
                return Some((hit.site, squared_distance(q, site_point)));
            }
        }
        self.backing.knn(q, 1, eps).into_iter().next()
    }

    /// `knn(q, k, ε) -> list<(site, sq_dist)>` in ascending distance order
    /// (spec.md §4.5). When the cache records pre-seed candidates from its
    /// descent, they seed the backing search's result queue as an initial
    /// lower bound (spec.md §4.4's "Optional: pre-seeding backing kNN").
    pub fn knn(&self, q: &[f64], k: usize, eps: f64) -> Vec<(usize, f64)> {
        self.stats.queries.fetch_add(1, AtomicOrdering::Relaxed);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.locate(q) {
                self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
                if k == 1 {
                    let site_point = self.backing.points().point(hit.site);
                    return vec![(hit.site, squared_distance(q, site_point))];
                }
                let mut seeds = hit.candidates;
                seeds.push(hit.site);
                return self.backing.knn_seeded_sites(q, k, eps, &seeds);
            }
        }
        self.backing.knn(q, k, eps)
    }
}
