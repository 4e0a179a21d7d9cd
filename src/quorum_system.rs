// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! Quorum systems and the strategy optimizer.
//!
//! A [QuorumSystem] pairs a read expression with a write expression such
//! that every read quorum intersects every write quorum. Given a workload
//! (a read-fraction distribution) and per-node capacities and latencies, it
//! computes an optimal [Strategy] by linear programming: one probability
//! variable per quorum on each side, minimizing load, network traffic or
//! latency subject to optional limits on the other two and an optional
//! fault-tolerance requirement.
//!
//! The intersection invariant is the classical one: writes must imply the
//! dual of reads. Constructors that derive one side from the other via
//! [Expr::dual] satisfy it by construction; [QuorumSystem::new] checks it.

use crate::distribution::{canonicalize_reads_writes, mean_read_fraction};
use crate::expr::{format_node_set, Combinations};
use crate::lp::DenseProblem;
use crate::{Distribution, Error, Expr, Node, NodeSet, Sigma, SigmaRecord, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Which workload metric [QuorumSystem::strategy] minimizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    #[default]
    Load,
    Network,
    Latency,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Objective::Load => "load",
            Objective::Network => "network",
            Objective::Latency => "latency",
        })
    }
}

/// Options for [QuorumSystem::strategy].
///
/// Exactly one of `read_fraction` and `write_fraction` must be set. A limit
/// may be set for any metric except the one being optimized. With `f > 0`,
/// only f-resilient quorums participate in the strategy.
#[derive(Clone, Debug, Default)]
pub struct StrategyOptions {
    pub optimize: Objective,
    pub load_limit: Option<f64>,
    pub network_limit: Option<f64>,
    pub latency_limit: Option<f64>,
    pub read_fraction: Option<Distribution>,
    pub write_fraction: Option<Distribution>,
    pub f: usize,
}

/// A pair of intersecting read and write expressions over one set of nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuorumSystem {
    reads: Expr,
    writes: Expr,
    nodes: BTreeMap<String, Node>,
}

impl QuorumSystem {
    /// Builds a quorum system from explicit read and write expressions,
    /// checking that every write quorum intersects every read quorum
    /// (writes must satisfy the dual of reads).
    pub fn new(reads: Expr, writes: Expr) -> Result<QuorumSystem, Error> {
        let dual_reads = reads.dual();
        for quorum in writes.quorums() {
            if !dual_reads.is_quorum(&quorum) {
                return Err(Error::QuorumsDisjoint);
            }
        }
        Ok(QuorumSystem::unchecked(reads, writes))
    }

    /// Uses `dual(reads)` as the write expression; the intersection
    /// invariant holds by construction.
    pub fn with_reads(reads: Expr) -> QuorumSystem {
        let writes = reads.dual();
        QuorumSystem::unchecked(reads, writes)
    }

    /// Uses `dual(writes)` as the read expression.
    pub fn with_writes(writes: Expr) -> QuorumSystem {
        let reads = writes.dual();
        QuorumSystem::unchecked(reads, writes)
    }

    fn unchecked(reads: Expr, writes: Expr) -> QuorumSystem {
        let mut nodes = BTreeMap::new();
        for node in reads.nodes().into_iter().chain(writes.nodes()) {
            nodes.entry(node.name.clone()).or_insert(node);
        }
        QuorumSystem {
            reads,
            writes,
            nodes,
        }
    }

    pub fn reads(&self) -> &Expr {
        &self.reads
    }

    pub fn writes(&self) -> &Expr {
        &self.writes
    }

    /// Enumerates read quorums; same contract as [Expr::quorums].
    pub fn read_quorums(&self) -> Box<dyn Iterator<Item = NodeSet> + '_> {
        self.reads.quorums()
    }

    /// Enumerates write quorums.
    pub fn write_quorums(&self) -> Box<dyn Iterator<Item = NodeSet> + '_> {
        self.writes.quorums()
    }

    pub fn is_read_quorum(&self, s: &NodeSet) -> bool {
        self.reads.is_quorum(s)
    }

    pub fn is_write_quorum(&self, s: &NodeSet) -> bool {
        self.writes.is_quorum(s)
    }

    /// All nodes mentioned by either expression.
    pub fn nodes(&self) -> NodeSet {
        self.nodes.values().cloned().collect()
    }

    /// Looks up the canonical node for a name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// The node names, sorted.
    pub fn elements(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn read_resilience(&self) -> usize {
        self.reads.resilience()
    }

    pub fn write_resilience(&self) -> usize {
        self.writes.resilience()
    }

    /// Failures survivable on both sides at once.
    pub fn resilience(&self) -> usize {
        self.read_resilience().min(self.write_resilience())
    }

    pub fn dup_free(&self) -> bool {
        self.reads.dup_free() && self.writes.dup_free()
    }

    /// Computes the optimal strategy for `options`: minimizes the chosen
    /// metric over per-quorum probabilities, subject to the option limits.
    pub fn strategy(&self, options: StrategyOptions) -> Result<Strategy, Error> {
        match options.optimize {
            Objective::Load if options.load_limit.is_some() => {
                return Err(Error::LimitOnObjective(Objective::Load));
            }
            Objective::Network if options.network_limit.is_some() => {
                return Err(Error::LimitOnObjective(Objective::Network));
            }
            Objective::Latency if options.latency_limit.is_some() => {
                return Err(Error::LimitOnObjective(Objective::Latency));
            }
            _ => {}
        }

        let workload = canonicalize_reads_writes(
            options.read_fraction.as_ref(),
            options.write_fraction.as_ref(),
        )?;

        let (read_quorums, write_quorums) = self.candidate_quorums(options.f)?;
        debug!(
            "optimizing {} over {} read and {} write quorums",
            options.optimize,
            read_quorums.len(),
            write_quorums.len()
        );

        let (read_probs, write_probs) =
            self.solve(&read_quorums, &write_quorums, &workload, &options)?;

        let sigma_r = collect_sigma(read_quorums, read_probs)?;
        let sigma_w = collect_sigma(write_quorums, write_probs)?;
        Strategy::new(self, sigma_r, sigma_w)
    }

    /// The strategy giving equal probability to every minimal quorum on
    /// each side (f = 0), or to every minimal f-resilient quorum.
    pub fn uniform_strategy(&self, f: usize) -> Result<Strategy, Error> {
        let (read_quorums, write_quorums) = self.candidate_quorums(f)?;
        let read_quorums = minimal_quorums(read_quorums);
        let write_quorums = minimal_quorums(write_quorums);

        let uniform = |quorums: Vec<NodeSet>| -> Sigma {
            let p = 1.0 / quorums.len() as f64;
            Sigma::new(
                quorums
                    .into_iter()
                    .map(|q| SigmaRecord::new(q, p))
                    .collect(),
            )
        };
        Strategy::new(self, uniform(read_quorums), uniform(write_quorums))
    }

    /// Builds a strategy from caller-supplied quorum weights. Weights must
    /// be non-negative with a positive total and every quorum must satisfy
    /// the matching expression; each side is normalized to sum to one.
    pub fn make_strategy(&self, sigma_r: Sigma, sigma_w: Sigma) -> Result<Strategy, Error> {
        let sigma_r = self.validate_sigma(sigma_r, &self.reads, true)?;
        let sigma_w = self.validate_sigma(sigma_w, &self.writes, false)?;
        Strategy::new(self, sigma_r, sigma_w)
    }

    fn validate_sigma(&self, sigma: Sigma, expr: &Expr, read_side: bool) -> Result<Sigma, Error> {
        let mut total = 0.0;
        for record in &sigma.values {
            if record.probability < 0.0 {
                return Err(Error::NegativeStrategyWeight);
            }
            total += record.probability;
        }
        if total <= 0.0 {
            return Err(Error::ZeroStrategyWeight);
        }
        for record in &sigma.values {
            if !expr.is_quorum(&record.quorum) {
                let shown = format_node_set(&record.quorum);
                return Err(if read_side {
                    Error::NotAReadQuorum(shown)
                } else {
                    Error::NotAWriteQuorum(shown)
                });
            }
        }
        Ok(Sigma::new(
            sigma
                .values
                .into_iter()
                .map(|r| SigmaRecord::new(r.quorum, r.probability / total))
                .collect(),
        ))
    }

    /// Optimal strategy's expected load under the options' workload.
    pub fn load(&self, options: StrategyOptions) -> Result<f64, Error> {
        let strategy = self.strategy(options.clone())?;
        strategy.load(
            options.read_fraction.as_ref(),
            options.write_fraction.as_ref(),
        )
    }

    /// Optimal strategy's capacity under the options' workload.
    pub fn capacity(&self, options: StrategyOptions) -> Result<f64, Error> {
        let strategy = self.strategy(options.clone())?;
        strategy.capacity(
            options.read_fraction.as_ref(),
            options.write_fraction.as_ref(),
        )
    }

    /// Optimal strategy's network load under the options' workload.
    pub fn network_load(&self, options: StrategyOptions) -> Result<f64, Error> {
        let strategy = self.strategy(options.clone())?;
        strategy.network_load(
            options.read_fraction.as_ref(),
            options.write_fraction.as_ref(),
        )
    }

    /// Optimal strategy's latency under the options' workload.
    pub fn latency(&self, options: StrategyOptions) -> Result<f64, Error> {
        let strategy = self.strategy(options.clone())?;
        strategy.latency(
            options.read_fraction.as_ref(),
            options.write_fraction.as_ref(),
        )
    }

    fn candidate_quorums(&self, f: usize) -> Result<(Vec<NodeSet>, Vec<NodeSet>), Error> {
        if f == 0 {
            return Ok((
                dedup_quorums(self.reads.quorums()),
                dedup_quorums(self.writes.quorums()),
            ));
        }
        let read_quorums = f_resilient_quorums(f, &self.reads);
        if read_quorums.is_empty() {
            return Err(Error::NoResilientReadQuorums { f });
        }
        let write_quorums = f_resilient_quorums(f, &self.writes);
        if write_quorums.is_empty() {
            return Err(Error::NoResilientWriteQuorums { f });
        }
        Ok((read_quorums, write_quorums))
    }

    /// Builds and solves the strategy LP. Variables are one probability per
    /// read quorum, one per write quorum, and — when load is optimized or
    /// limited — a scalar bounding the per-node load at every workload
    /// fraction.
    fn solve(
        &self,
        read_quorums: &[NodeSet],
        write_quorums: &[NodeSet],
        workload: &[(f64, f64)],
        options: &StrategyOptions,
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        let fbar = mean_read_fraction(workload);
        let r = read_quorums.len();
        let w = write_quorums.len();
        let need_load = options.optimize == Objective::Load || options.load_limit.is_some();
        let need_latency =
            options.optimize == Objective::Latency || options.latency_limit.is_some();
        let nvars = r + w + usize::from(need_load);

        let (read_latency, write_latency) = if need_latency {
            (
                read_quorums
                    .iter()
                    .map(|q| self.read_quorum_latency(q))
                    .collect::<Result<Vec<_>, _>>()?,
                write_quorums
                    .iter()
                    .map(|q| self.write_quorum_latency(q))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let mut lp = DenseProblem::new();
        for (i, quorum) in read_quorums.iter().enumerate() {
            let objective = match options.optimize {
                Objective::Load => 0.0,
                Objective::Network => fbar * quorum.len() as f64,
                Objective::Latency => fbar * read_latency[i],
            };
            lp.add_var(objective, 0.0, 1.0);
        }
        for (j, quorum) in write_quorums.iter().enumerate() {
            let objective = match options.optimize {
                Objective::Load => 0.0,
                Objective::Network => (1.0 - fbar) * quorum.len() as f64,
                Objective::Latency => (1.0 - fbar) * write_latency[j],
            };
            lp.add_var(objective, 0.0, 1.0);
        }
        let load_var = if need_load {
            let objective = if options.optimize == Objective::Load {
                workload.iter().map(|&(_, p)| p).sum()
            } else {
                0.0
            };
            let upper = options.load_limit.unwrap_or(f64::INFINITY);
            Some(lp.add_var(objective, 0.0, upper))
        } else {
            None
        };

        // Each side's probabilities form a distribution.
        let mut read_one = vec![0.0; nvars];
        read_one[..r].fill(1.0);
        lp.add_row(1.0, read_one, 1.0);
        let mut write_one = vec![0.0; nvars];
        write_one[r..r + w].fill(1.0);
        lp.add_row(1.0, write_one, 1.0);

        // Per-node load stays below the load scalar, at every fraction in
        // the workload.
        if let Some(load_var) = load_var {
            for &(fr, _) in workload {
                for node in self.nodes.values() {
                    let mut coefs = vec![0.0; nvars];
                    for (i, quorum) in read_quorums.iter().enumerate() {
                        if quorum.contains(node) {
                            coefs[i] = fr / node.read_capacity;
                        }
                    }
                    for (j, quorum) in write_quorums.iter().enumerate() {
                        if quorum.contains(node) {
                            coefs[r + j] = (1.0 - fr) / node.write_capacity;
                        }
                    }
                    coefs[load_var] = -1.0;
                    lp.add_row(f64::NEG_INFINITY, coefs, 0.0);
                }
            }
        }

        if let Some(limit) = options.network_limit {
            let mut coefs = vec![0.0; nvars];
            for (i, quorum) in read_quorums.iter().enumerate() {
                coefs[i] = fbar * quorum.len() as f64;
            }
            for (j, quorum) in write_quorums.iter().enumerate() {
                coefs[r + j] = (1.0 - fbar) * quorum.len() as f64;
            }
            lp.add_row(f64::NEG_INFINITY, coefs, limit);
        }

        if let Some(limit) = options.latency_limit {
            let mut coefs = vec![0.0; nvars];
            for (i, lat) in read_latency.iter().enumerate() {
                coefs[i] = fbar * lat;
            }
            for (j, lat) in write_latency.iter().enumerate() {
                coefs[r + j] = (1.0 - fbar) * lat;
            }
            lp.add_row(f64::NEG_INFINITY, coefs, limit);
        }

        let solution = lp.minimize().map_err(|_| Error::NoOptimalStrategy)?;
        Ok((solution[..r].to_vec(), solution[r..r + w].to_vec()))
    }

    pub(crate) fn read_quorum_latency(&self, quorum: &NodeSet) -> Result<f64, Error> {
        quorum_latency(quorum, &self.reads)
    }

    pub(crate) fn write_quorum_latency(&self, quorum: &NodeSet) -> Result<f64, Error> {
        quorum_latency(quorum, &self.writes)
    }
}

/// The latency contribution of a quorum: walk its nodes from fastest to
/// slowest and stop at the first prefix that satisfies the expression; the
/// contribution is that prefix's slowest node.
fn quorum_latency(quorum: &NodeSet, expr: &Expr) -> Result<f64, Error> {
    let mut by_latency: Vec<&Node> = quorum.iter().collect();
    by_latency.sort_by(|x, y| {
        x.latency
            .partial_cmp(&y.latency)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut prefix = NodeSet::new();
    for node in by_latency {
        prefix.insert(node.clone());
        if expr.is_quorum(&prefix) {
            return Ok(node.latency);
        }
    }
    Err(Error::Internal(format!(
        "latency requested for a set that is not a quorum: {}",
        format_node_set(quorum)
    )))
}

/// Node sets that remain quorums of `expr` after any `min(f, |s|)` of their
/// members fail.
///
/// Depth-first over the expression's nodes in name order; a set that
/// qualifies is recorded and not extended further, so the results are
/// frontier sets rather than the full upward closure. With a candidate
/// smaller than `f` the failure budget degrades to the candidate's size;
/// callers wanting strict f-resilience should filter the results.
fn f_resilient_quorums(f: usize, expr: &Expr) -> Vec<NodeSet> {
    fn go(
        f: usize,
        expr: &Expr,
        nodes: &[Node],
        start: usize,
        current: &mut Vec<Node>,
        out: &mut Vec<NodeSet>,
    ) {
        if !current.is_empty() && is_f_resilient(f, expr, current) {
            out.push(current.iter().cloned().collect());
            return;
        }
        for i in start..nodes.len() {
            current.push(nodes[i].clone());
            go(f, expr, nodes, i + 1, current, out);
            current.pop();
        }
    }

    let nodes: Vec<Node> = expr.nodes().into_iter().collect();
    let mut out = Vec::new();
    go(f, expr, &nodes, 0, &mut Vec::new(), &mut out);
    out
}

fn is_f_resilient(f: usize, expr: &Expr, current: &[Node]) -> bool {
    let budget = f.min(current.len());
    for failed in Combinations::new(current.len(), budget) {
        let mut survivors: NodeSet = current.iter().cloned().collect();
        for &i in &failed {
            survivors.remove(&current[i]);
        }
        if !expr.is_quorum(&survivors) {
            return false;
        }
    }
    true
}

fn dedup_quorums(quorums: impl Iterator<Item = NodeSet>) -> Vec<NodeSet> {
    let mut seen: BTreeSet<NodeSet> = BTreeSet::new();
    quorums.filter(|q| seen.insert(q.clone())).collect()
}

/// Distinct quorums that are not strict supersets of another quorum in the
/// list.
fn minimal_quorums(quorums: Vec<NodeSet>) -> Vec<NodeSet> {
    let unique = dedup_quorums(quorums.into_iter());
    unique
        .iter()
        .filter(|q| {
            !unique
                .iter()
                .any(|other| other.len() < q.len() && other.is_subset(q))
        })
        .cloned()
        .collect()
}

/// Pairs quorums with their solved probabilities, dropping the zeros and
/// renormalizing against solver tolerance.
fn collect_sigma(quorums: Vec<NodeSet>, probabilities: Vec<f64>) -> Result<Sigma, Error> {
    let mut values: Vec<SigmaRecord> = quorums
        .into_iter()
        .zip(probabilities)
        .filter(|(_, p)| *p > 1e-9)
        .map(|(q, p)| SigmaRecord::new(q, p))
        .collect();
    let total: f64 = values.iter().map(|r| r.probability).sum();
    if total <= 0.0 {
        return Err(Error::Internal(
            "lp solution has no positive probabilities".to_string(),
        ));
    }
    for record in &mut values {
        record.probability /= total;
    }
    Ok(Sigma::new(values))
}
