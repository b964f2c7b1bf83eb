// SPDX-License-Identifier: Apache-2.0

//! A thin harness binary (spec.md §6: external interface, not the core):
//! `oddson-cli [--config <path>] <sites-file> <sample-file> [queries-file]`.
//! Reads sites (`P`) and a sample of the query distribution (`Q`), builds
//! the backing index and cache (from `--config`'s YAML document if given,
//! otherwise the k-d tree backing with the cache's own defaults), answers
//! queries from `queries-file` or standard input (one point per line, same
//! format as the sites/sample files minus the header), and prints
//! `site_index sq_dist` per line to standard output. The observability
//! report (spec.md §6) goes to standard error on exit.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;

use oddson::backing::BackingIndex;
use oddson::cache::CacheBuilder;
use oddson::config::{BackingKind, Config};
use oddson::facade::Facade;
use oddson::loader;
use oddson::point::PointSet;

/// Positional file arguments, with an optional leading `--config <path>`
/// pulled out first.
struct Args {
    config_path: Option<String>,
    positional: Vec<String>,
}

fn parse_args(raw: &[String]) -> oddson::OddsonResult<Args> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().ok_or_else(|| oddson::OddsonError::InvalidInput {
                message: "--config requires a path argument".to_string(),
            })?;
            config_path = Some(path.clone());
        } else {
            positional.push(arg.clone());
        }
    }
    Ok(Args {
        config_path,
        positional,
    })
}

fn run() -> oddson::OddsonResult<()> {
    env_logger::init();
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&raw_args)?;
    if args.positional.len() < 2 {
        eprintln!("usage: oddson-cli [--config <path>] <sites-file> <sample-file> [queries-file]");
        return Err(oddson::OddsonError::InvalidInput {
            message: "missing required arguments".to_string(),
        });
    }

    let config = args
        .config_path
        .as_ref()
        .map(Config::from_yaml)
        .transpose()?;

    let sites = loader::load(BufReader::new(File::open(&args.positional[0])?))?;
    let sites_ps = PointSet::new(&sites.data, sites.dim).ok_or_else(|| oddson::OddsonError::InvalidInput {
        message: "sites file produced a ragged point buffer".to_string(),
    })?;
    log::info!("loaded {} sites in {} dimensions", sites_ps.len(), sites_ps.dim());
    let backing = match config.as_ref().map(|c| c.backing_kind) {
        Some(BackingKind::Quadtree) => BackingIndex::build_quadtree(sites_ps)?,
        _ => BackingIndex::build_kdtree(sites_ps)?,
    };

    let sample = loader::load(BufReader::new(File::open(&args.positional[1])?))?;
    let sample_ps = PointSet::new(&sample.data, sample.dim).ok_or_else(|| oddson::OddsonError::InvalidInput {
        message: "sample file produced a ragged point buffer".to_string(),
    })?;
    log::info!("loaded {} sample points", sample_ps.len());
    let cache_builder = config.map(|c| c.cache).unwrap_or_else(CacheBuilder::new);
    let (cache, cache_stats) = cache_builder.build(sample_ps, &backing)?;

    let facade = Facade::new(backing, Some(cache));

    let stdin;
    let queries_reader: Box<dyn BufRead> = if args.positional.len() >= 3 {
        Box::new(BufReader::new(File::open(&args.positional[2])?))
    } else {
        stdin = io::stdin();
        Box::new(stdin.lock())
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in queries_reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = if trimmed.contains(',') {
            trimmed.split(',').map(str::trim).collect()
        } else {
            trimmed.split_whitespace().collect()
        };
        let q: Vec<f64> = fields
            .iter()
            .map(|f| f.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| oddson::OddsonError::ParseError {
                line: None,
                message: format!("malformed query line: {:?}", trimmed),
            })?;
        match facade.nn(&q, 0.0) {
            Some((site, sq_dist)) => writeln!(out, "{} {}", site, sq_dist)?,
            None => writeln!(out, "miss")?,
        }
    }

    let stats = facade.stats();
    eprintln!(
        "queries={} hits={} hit_ratio={:.4} cache_terminal_nodes={}/{} build_nn_queries={}",
        stats.queries(),
        stats.hits(),
        stats.hit_ratio(),
        cache_stats.terminal_nodes(),
        cache_stats.total_nodes(),
        cache_stats.build_nn_queries()
    );
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("oddson-cli: {}", e);
            ExitCode::FAILURE
        }
    }
}
