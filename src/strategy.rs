// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! Strategies: probability distributions over quorums.
//!
//! A [Strategy] holds one distribution over read quorums and one over write
//! quorums. Executing an operation under a strategy means sampling a quorum
//! from the matching side and contacting exactly those nodes; the planner's
//! job is to pick the distributions so that the workload metrics below come
//! out well. Strategies are produced by
//! [crate::QuorumSystem::strategy] (LP-optimal),
//! [crate::QuorumSystem::uniform_strategy], and
//! [crate::QuorumSystem::make_strategy] (caller-supplied weights); all three
//! normalize probabilities to sum to one per side.
//!
//! A strategy is self-contained once built: it carries the node set, the
//! per-node marginal probabilities, and each quorum's latency contribution,
//! and no longer references the quorum system it came from.

use crate::distribution::{canonicalize_reads_writes, mean_read_fraction};
use crate::expr::format_node_set;
use crate::{Distribution, Error, Node, NodeSet, QuorumSystem};
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One quorum and the probability of picking it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigmaRecord {
    pub quorum: NodeSet,
    pub probability: f64,
}

impl SigmaRecord {
    pub fn new(quorum: NodeSet, probability: f64) -> SigmaRecord {
        SigmaRecord {
            quorum,
            probability,
        }
    }
}

/// A probability distribution over quorums.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sigma {
    pub values: Vec<SigmaRecord>,
}

impl Sigma {
    pub fn new(values: Vec<SigmaRecord>) -> Sigma {
        Sigma { values }
    }
}

/// A read strategy and a write strategy for one quorum system, with the
/// node marginals and per-quorum latency contributions precomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    sigma_r: Sigma,
    sigma_w: Sigma,
    read_latency: Vec<f64>,
    write_latency: Vec<f64>,
    nodes: NodeSet,
    read_probability: BTreeMap<Node, f64>,
    write_probability: BTreeMap<Node, f64>,
}

impl Strategy {
    /// Builds a strategy over `system`. The sigmas must already be
    /// normalized; quorum members are replaced by the system's canonical
    /// nodes so capacities and latencies are authoritative even when the
    /// caller passed bare name probes.
    pub(crate) fn new(
        system: &QuorumSystem,
        sigma_r: Sigma,
        sigma_w: Sigma,
    ) -> Result<Strategy, Error> {
        let canonicalize = |sigma: Sigma| -> Sigma {
            Sigma {
                values: sigma
                    .values
                    .into_iter()
                    .map(|record| SigmaRecord {
                        quorum: record
                            .quorum
                            .iter()
                            .map(|n| system.node(&n.name).cloned().unwrap_or_else(|| n.clone()))
                            .collect(),
                        probability: record.probability,
                    })
                    .collect(),
            }
        };
        let sigma_r = canonicalize(sigma_r);
        let sigma_w = canonicalize(sigma_w);

        let read_latency = sigma_r
            .values
            .iter()
            .map(|r| system.read_quorum_latency(&r.quorum))
            .collect::<Result<Vec<_>, _>>()?;
        let write_latency = sigma_w
            .values
            .iter()
            .map(|r| system.write_quorum_latency(&r.quorum))
            .collect::<Result<Vec<_>, _>>()?;

        let marginals = |sigma: &Sigma| -> BTreeMap<Node, f64> {
            let mut out = BTreeMap::new();
            for record in &sigma.values {
                for node in &record.quorum {
                    *out.entry(node.clone()).or_insert(0.0) += record.probability;
                }
            }
            out
        };
        let read_probability = marginals(&sigma_r);
        let write_probability = marginals(&sigma_w);

        Ok(Strategy {
            sigma_r,
            sigma_w,
            read_latency,
            write_latency,
            nodes: system.nodes(),
            read_probability,
            write_probability,
        })
    }

    pub fn sigma_r(&self) -> &Sigma {
        &self.sigma_r
    }

    pub fn sigma_w(&self) -> &Sigma {
        &self.sigma_w
    }

    /// Draws a read quorum in proportion to its probability. The caller
    /// owns (and seeds) the generator.
    pub fn sample_read_quorum<R: Rng + ?Sized>(&self, rng: &mut R) -> &NodeSet {
        Self::sample(&self.sigma_r, rng)
    }

    /// Draws a write quorum in proportion to its probability.
    pub fn sample_write_quorum<R: Rng + ?Sized>(&self, rng: &mut R) -> &NodeSet {
        Self::sample(&self.sigma_w, rng)
    }

    fn sample<'a, R: Rng + ?Sized>(sigma: &'a Sigma, rng: &mut R) -> &'a NodeSet {
        let index = WeightedIndex::new(sigma.values.iter().map(|r| r.probability))
            .expect("sigma probabilities are positive and sum to one");
        &sigma.values[index.sample(rng)].quorum
    }

    /// Expected maximum per-node load under the workload: for each read
    /// fraction, the most heavily loaded node's load, weighted by the
    /// fraction's probability.
    pub fn load(
        &self,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        Ok(d.iter().map(|&(fr, p)| p * self.max_load(fr)).sum())
    }

    /// Expected throughput: the reciprocal of the maximum load, in
    /// expectation over the workload.
    pub fn capacity(
        &self,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        Ok(d.iter().map(|&(fr, p)| p / self.max_load(fr)).sum())
    }

    /// Expected number of nodes contacted per operation.
    pub fn network_load(
        &self,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        let fr = mean_read_fraction(&d);
        let reads: f64 = self
            .sigma_r
            .values
            .iter()
            .map(|r| fr * r.quorum.len() as f64 * r.probability)
            .sum();
        let writes: f64 = self
            .sigma_w
            .values
            .iter()
            .map(|r| (1.0 - fr) * r.quorum.len() as f64 * r.probability)
            .sum();
        Ok(reads + writes)
    }

    /// Expected quorum latency per operation.
    pub fn latency(
        &self,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        let fr = mean_read_fraction(&d);
        let reads: f64 = self
            .sigma_r
            .values
            .iter()
            .zip(&self.read_latency)
            .map(|(r, lat)| lat * r.probability)
            .sum();
        let writes: f64 = self
            .sigma_w
            .values
            .iter()
            .zip(&self.write_latency)
            .map(|(r, lat)| lat * r.probability)
            .sum();
        Ok(fr * reads + (1.0 - fr) * writes)
    }

    /// Expected load on one node.
    pub fn node_load(
        &self,
        node: &Node,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        Ok(d.iter().map(|&(fr, p)| p * self.node_load_at(node, fr)).sum())
    }

    /// The node's load relative to the most loaded node, in expectation.
    pub fn node_utilization(
        &self,
        node: &Node,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        Ok(d.iter()
            .map(|&(fr, p)| p * self.node_load_at(node, fr) / self.max_load(fr))
            .sum())
    }

    /// Expected operations per unit time handled by the node when the
    /// system runs at capacity.
    pub fn node_throughput(
        &self,
        node: &Node,
        read_fraction: Option<&Distribution>,
        write_fraction: Option<&Distribution>,
    ) -> Result<f64, Error> {
        let d = canonicalize_reads_writes(read_fraction, write_fraction)?;
        Ok(d.iter()
            .map(|&(fr, p)| {
                let capacity = 1.0 / self.max_load(fr);
                let read_p = self.read_probability.get(node).copied().unwrap_or(0.0);
                let write_p = self.write_probability.get(node).copied().unwrap_or(0.0);
                p * capacity * (fr * read_p + (1.0 - fr) * write_p)
            })
            .sum())
    }

    fn max_load(&self, fr: f64) -> f64 {
        self.nodes
            .iter()
            .map(|n| self.node_load_at(n, fr))
            .fold(0.0, f64::max)
    }

    fn node_load_at(&self, node: &Node, fr: f64) -> f64 {
        let read_p = self.read_probability.get(node).copied().unwrap_or(0.0);
        let write_p = self.write_probability.get(node).copied().unwrap_or(0.0);
        fr * read_p / node.read_capacity + (1.0 - fr) * write_p / node.write_capacity
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_side = |f: &mut fmt::Formatter<'_>, sigma: &Sigma| -> fmt::Result {
            for (i, record) in sigma.values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(
                    f,
                    "{}: {:.4}",
                    format_node_set(&record.quorum),
                    record.probability
                )?;
            }
            Ok(())
        };
        f.write_str("reads: [")?;
        write_side(f, &self.sigma_r)?;
        f.write_str("]; writes: [")?;
        write_side(f, &self.sigma_w)?;
        f.write_str("]")
    }
}
