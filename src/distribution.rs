// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! Workload descriptions.
//!
//! A workload is a probability distribution over _read fractions_: "80% of
//! operations are reads" is the single-point distribution `{0.8: 1}`, and a
//! planner that is unsure about tomorrow's mix can hedge with several
//! weighted points. Callers hand the planner either a read distribution or a
//! write distribution (never both); write distributions are flipped through
//! `f -> 1 - f` during canonicalization so that everything downstream only
//! ever sees read fractions.

use crate::Error;
use serde::{Deserialize, Serialize};

/// A finite map from value to non-negative weight. Weights need not sum to
/// one; canonicalization normalizes them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    weights: Vec<(f64, f64)>,
}

impl Distribution {
    pub fn new(weights: impl IntoIterator<Item = (f64, f64)>) -> Distribution {
        Distribution {
            weights: weights.into_iter().collect(),
        }
    }

    /// The distribution placing all weight on a single value.
    pub fn point(value: f64) -> Distribution {
        Distribution {
            weights: vec![(value, 1.0)],
        }
    }

    /// Drops zero-weight entries and scales the rest to sum to one.
    /// Duplicate values are merged.
    fn canonicalize(&self) -> Result<Vec<(f64, f64)>, Error> {
        if self.weights.is_empty() {
            return Err(Error::EmptyDistribution);
        }
        let mut total = 0.0;
        for &(_, w) in &self.weights {
            if w < 0.0 {
                return Err(Error::NegativeWeight);
            }
            total += w;
        }
        if total == 0.0 {
            return Err(Error::ZeroTotalWeight);
        }
        let mut out: Vec<(f64, f64)> = Vec::with_capacity(self.weights.len());
        for &(v, w) in &self.weights {
            if w == 0.0 {
                continue;
            }
            match out.iter_mut().find(|(existing, _)| *existing == v) {
                Some((_, p)) => *p += w / total,
                None => out.push((v, w / total)),
            }
        }
        Ok(out)
    }
}

/// Canonicalizes a workload into a read-fraction distribution: pairs of
/// `(fraction, probability)` with probabilities summing to one.
///
/// Exactly one of `read_fraction` and `write_fraction` must be given; a
/// write distribution is mapped through `f -> 1 - f`.
pub(crate) fn canonicalize_reads_writes(
    read_fraction: Option<&Distribution>,
    write_fraction: Option<&Distribution>,
) -> Result<Vec<(f64, f64)>, Error> {
    match (read_fraction, write_fraction) {
        (None, None) => Err(Error::MissingWorkload),
        (Some(_), Some(_)) => Err(Error::AmbiguousWorkload),
        (Some(reads), None) => reads.canonicalize(),
        (None, Some(writes)) => {
            let canonical = writes.canonicalize()?;
            Ok(canonical.into_iter().map(|(f, p)| (1.0 - f, p)).collect())
        }
    }
}

/// The mean read fraction of a canonicalized workload.
pub(crate) fn mean_read_fraction(canonical: &[(f64, f64)]) -> f64 {
    canonical.iter().map(|&(f, p)| f * p).sum()
}
