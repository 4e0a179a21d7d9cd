// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! Search over candidate quorum systems.
//!
//! [search] enumerates duplicate-free read expressions over a node set,
//! builds the quorum system each one induces, and keeps the one whose
//! optimal strategy minimizes the chosen metric. The candidate space grows
//! with the Bell numbers, so shallow (height two) expressions are tried
//! first and a wall-clock budget can cut the enumeration short; the best
//! candidate found so far is returned when the budget runs out.
//!
//! Enumeration is push-style: candidates are fed to a visitor as they are
//! produced, nothing is buffered beyond the partition currently being
//! expanded, and the visitor can abort the walk between candidates.

use crate::expr::Product;
use crate::{Error, Expr, Node, Objective, QuorumSystem, Strategy, StrategyOptions};
use crate::Distribution;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::debug;

/// Options for [search]: the strategy options applied to every candidate,
/// plus a minimum resilience and an optional time budget.
#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    pub optimize: Objective,
    pub load_limit: Option<f64>,
    pub network_limit: Option<f64>,
    pub latency_limit: Option<f64>,
    pub read_fraction: Option<Distribution>,
    pub write_fraction: Option<Distribution>,
    pub f: usize,
    pub resilience: usize,
    pub timeout: Option<Duration>,
}

impl SearchOptions {
    fn strategy_options(&self) -> StrategyOptions {
        StrategyOptions {
            optimize: self.optimize,
            load_limit: self.load_limit,
            network_limit: self.network_limit,
            latency_limit: self.latency_limit,
            read_fraction: self.read_fraction.clone(),
            write_fraction: self.write_fraction.clone(),
            f: self.f,
        }
    }
}

/// The winning quorum system and its optimal strategy.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub quorum_system: QuorumSystem,
    pub strategy: Strategy,
}

/// Finds the quorum system over `nodes` minimizing the chosen metric.
///
/// Candidates failing the resilience requirement, or whose strategy LP is
/// infeasible under the option limits, are skipped; the search only fails
/// with [Error::SearchExhausted] when no candidate ever succeeded. The
/// timeout is honored between candidate evaluations.
pub fn search(nodes: &[Node], options: SearchOptions) -> Result<SearchResult, Error> {
    let start = Instant::now();
    let leaves: Vec<Expr> = nodes.iter().map(Expr::from).collect();

    let mut best: Option<(f64, QuorumSystem, Strategy)> = None;
    let mut evaluated = 0usize;
    let mut consider = |expr: Expr| -> ControlFlow<()> {
        if let Some(timeout) = options.timeout {
            if start.elapsed() >= timeout {
                debug!("search timed out after {} candidates", evaluated);
                return ControlFlow::Break(());
            }
        }
        evaluated += 1;

        let system = QuorumSystem::with_reads(expr);
        if system.resilience() < options.resilience {
            return ControlFlow::Continue(());
        }
        let strategy = match system.strategy(options.strategy_options()) {
            Ok(strategy) => strategy,
            Err(_) => return ControlFlow::Continue(()),
        };
        let metric = match options.optimize {
            Objective::Load => strategy.load(
                options.read_fraction.as_ref(),
                options.write_fraction.as_ref(),
            ),
            Objective::Network => strategy.network_load(
                options.read_fraction.as_ref(),
                options.write_fraction.as_ref(),
            ),
            Objective::Latency => strategy.latency(
                options.read_fraction.as_ref(),
                options.write_fraction.as_ref(),
            ),
        };
        let metric = match metric {
            Ok(metric) => metric,
            Err(_) => return ControlFlow::Continue(()),
        };
        if best.as_ref().map_or(true, |(m, _, _)| metric < *m) {
            debug!(
                "new best {} {} from reads {}",
                options.optimize,
                metric,
                system.reads()
            );
            best = Some((metric, system, strategy));
        }
        ControlFlow::Continue(())
    };

    // Shallow expressions first, then the full space.
    if for_each_dup_free_expr(&leaves, 2, &mut consider).is_continue() {
        let _ = for_each_dup_free_expr(&leaves, i32::MAX, &mut consider);
    }

    match best {
        Some((_, quorum_system, strategy)) => Ok(SearchResult {
            quorum_system,
            strategy,
        }),
        None => Err(Error::SearchExhausted),
    }
}

/// Feeds every expression over the leaves `xs` with height at most
/// `max_height` to `visit`. Singleton inputs yield the leaf itself; at
/// height one the `choose(k, xs)` ladder; otherwise, for every partition of
/// the leaves into two or more groups, the cartesian product of the groups'
/// recursively-built expressions wrapped in `choose(k, ...)` for every k.
/// Distinct partitions can produce equal expressions; consumers tolerate
/// the duplicates.
fn for_each_dup_free_expr(
    xs: &[Expr],
    max_height: i32,
    visit: &mut dyn FnMut(Expr) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if xs.len() == 1 {
        return visit(xs[0].clone());
    }
    if max_height == 1 {
        for k in 1..=xs.len() {
            let expr = Expr::choose(k, xs.to_vec()).expect("k is within [1, len]");
            visit(expr)?;
        }
        return ControlFlow::Continue(());
    }

    for_each_partitioning(xs, &mut |groups| {
        if groups.len() <= 1 {
            return ControlFlow::Continue(());
        }
        let mut group_exprs: Vec<Vec<Expr>> = Vec::with_capacity(groups.len());
        for group in groups {
            let mut collected = Vec::new();
            let flow = for_each_dup_free_expr(group, max_height - 1, &mut |e| {
                collected.push(e);
                ControlFlow::Continue(())
            });
            debug_assert!(flow.is_continue());
            group_exprs.push(collected);
        }
        for combination in Product::new(group_exprs) {
            for k in 1..=combination.len() {
                let expr =
                    Expr::choose(k, combination.clone()).expect("k is within [1, len]");
                visit(expr)?;
            }
        }
        ControlFlow::Continue(())
    })
}

/// Feeds every set-partition of `xs` to `visit`. Recursively: partition the
/// tail, then either open a new singleton group for the head or insert the
/// head into each existing group.
fn for_each_partitioning(
    xs: &[Expr],
    visit: &mut dyn FnMut(&[Vec<Expr>]) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if xs.is_empty() {
        return visit(&[]);
    }
    let head = &xs[0];
    let rest = &xs[1..];
    for_each_partitioning(rest, &mut |partition| {
        let mut with_singleton = Vec::with_capacity(partition.len() + 1);
        with_singleton.push(vec![head.clone()]);
        with_singleton.extend(partition.iter().cloned());
        visit(&with_singleton)?;

        for i in 0..partition.len() {
            let mut merged = partition.to_vec();
            merged[i].insert(0, head.clone());
            visit(&merged)?;
        }
        ControlFlow::Continue(())
    })
}
