// SPDX-License-Identifier: Apache-2.0

//! A single YAML config file tying together the builders' `from_yaml`
//! constructors, grounded on `goko::covertree::builders::
//! CoverTreeBuilder::from_yaml`. This is a convenience for callers that
//! want to externalize `backing`, `D_max`, `rng_seed`, and cache strategy
//! in one file — each builder's own `from_yaml` remains usable standalone.
//! `src/bin/oddson-cli.rs`'s `--config <path>` flag is the consumer.

use std::fs::read_to_string;
use std::path::Path;

use yaml_rust::YamlLoader;

use crate::cache::CacheBuilder;
use crate::errors::{OddsonError, OddsonResult};

/// Which backing structure a config selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingKind {
    KdTree,
    Quadtree,
}

/// Parsed top-level configuration: a `backing:` key (`kdtree` or
/// `quadtree`) and a `cache:` section consumed by [`CacheBuilder::from_yaml`].
#[derive(Debug, Clone)]
pub struct Config {
    pub backing_kind: BackingKind,
    pub cache: CacheBuilder,
}

impl Config {
    /// Reads a YAML document of the shape:
    ///
    /// ```yaml
    /// backing: kdtree
    /// cache:
    ///   strategy: kdtree
    ///   max_depth: 6
    ///   rng_seed: 0
    /// ```
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> OddsonResult<Config> {
        let text = read_to_string(&path)?;
        let docs = YamlLoader::load_from_str(&text).map_err(|e| OddsonError::ParseError {
            line: None,
            message: e.to_string(),
        })?;
        let doc = docs.get(0).ok_or_else(|| OddsonError::ParseError {
            line: None,
            message: "empty yaml document".to_string(),
        })?;

        let backing_kind = match doc["backing"].as_str() {
            Some("quadtree") => BackingKind::Quadtree,
            _ => BackingKind::KdTree,
        };

        Ok(Config {
            backing_kind,
            cache: CacheBuilder::from_yaml(&path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_backing_and_cache_sections() {
        let path = std::env::temp_dir().join("oddson-config-test.yaml");
        fs::write(
            &path,
            "backing: quadtree\ncache:\n  strategy: quadtree\n  max_depth: 4\n  rng_seed: 7\n",
        )
        .unwrap();
        let config = Config::from_yaml(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.backing_kind, BackingKind::Quadtree);
    }
}
