// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! # Overview
//!
//! `quorate` is a planner for read/write quorum systems. Given a set of
//! named nodes with capacities and latencies, it models quorum systems as
//! pairs of monotone boolean expressions — a read expression and a write
//! expression whose satisfying sets always intersect — and computes
//! _strategies_: probability distributions over read and write quorums that
//! minimize load, network traffic or latency for a given workload mix,
//! subject to optional limits on the other metrics and an optional
//! fault-tolerance requirement. It can also search the space of candidate
//! expressions over a node set and recommend the best quorum system it
//! finds within a time budget.
//!
//! This is a static analyzer: nothing here talks to real servers, replicates
//! data, or manages membership. The output of the planner — an expression
//! and a strategy — is meant to be fed to whatever actually executes quorum
//! operations.
//!
//! ## Example
//!
//! ```
//! use quorate::{Distribution, Expr, Node, Objective, QuorumSystem, StrategyOptions};
//!
//! // A 2x2 grid: reads go to a row, writes to a column.
//! let a = Expr::from(Node::with_capacity_and_latency("a", 2.0, 1.0, 1.0));
//! let b = Expr::from(Node::with_capacity_and_latency("b", 2.0, 1.0, 2.0));
//! let c = Expr::from(Node::with_capacity_and_latency("c", 2.0, 1.0, 3.0));
//! let d = Expr::from(Node::with_capacity_and_latency("d", 2.0, 1.0, 4.0));
//! let system = QuorumSystem::with_reads(a.multiply(&b).add(&c.multiply(&d)));
//!
//! // The load-optimal strategy for a read-only workload.
//! let strategy = system.strategy(StrategyOptions {
//!     optimize: Objective::Load,
//!     read_fraction: Some(Distribution::point(1.0)),
//!     ..Default::default()
//! })?;
//! let rf = Distribution::point(1.0);
//! assert!((strategy.load(Some(&rf), None)? - 0.25).abs() < 1e-9);
//! # Ok::<(), quorate::Error>(())
//! ```
//!
//! ## Reference
//!
//! The model follows the quorum-system planning approach described in:
//!
//! Michael Whittaker, Aleksey Charapko, Joseph M. Hellerstein, Heidi
//! Howard, and Ion Stoica. Read-Write Quorum Systems Made Practical.
//! PaPoC 2021.
//!
//! DOI: <https://doi.org/10.1145/3447865.3457962>

use thiserror::Error;

/// Everything that can go wrong in the planner. All fallible operations
/// return these; nothing is retried or recovered internally, except that
/// [search] skips candidates whose strategies fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("choose requires at least one subexpression")]
    EmptyChoose,
    #[error("choose requires k in [1, {n}], got {k}")]
    ChooseOutOfRange { k: usize, n: usize },
    #[error("either read_fraction or write_fraction must be given")]
    MissingWorkload,
    #[error("only one of read_fraction or write_fraction can be given")]
    AmbiguousWorkload,
    #[error("distribution must not be empty")]
    EmptyDistribution,
    #[error("distribution weights must not be negative")]
    NegativeWeight,
    #[error("distribution must have positive total weight")]
    ZeroTotalWeight,
    #[error("not all read quorums intersect all write quorums")]
    QuorumsDisjoint,
    #[error("a {0} limit cannot be set when optimizing for {0}")]
    LimitOnObjective(Objective),
    #[error("no optimal strategy found")]
    NoOptimalStrategy,
    #[error("strategy weights must not be negative")]
    NegativeStrategyWeight,
    #[error("strategy weights must have positive total weight")]
    ZeroStrategyWeight,
    #[error("{0} is not a read quorum")]
    NotAReadQuorum(String),
    #[error("{0} is not a write quorum")]
    NotAWriteQuorum(String),
    #[error("there are no {f}-resilient read quorums")]
    NoResilientReadQuorums { f: usize },
    #[error("there are no {f}-resilient write quorums")]
    NoResilientWriteQuorums { f: usize },
    #[error("search found no quorum system satisfying the given constraints")]
    SearchExhausted,
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

mod distribution;
mod expr;
mod lp;
mod node;
mod quorum_system;
mod search;
mod strategy;

pub use distribution::Distribution;
pub use expr::{Expr, NodeSet};
pub use node::Node;
pub use quorum_system::{Objective, QuorumSystem, StrategyOptions};
pub use search::{search, SearchOptions, SearchResult};
pub use strategy::{Sigma, SigmaRecord, Strategy};
