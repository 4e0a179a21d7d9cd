// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! A thin dense-problem facade over the [minilp] simplex solver.
//!
//! The optimizer builds its programs as concrete numeric matrices: a vector
//! of per-variable objective coefficients and `[lower, upper]` bounds, plus
//! constraint rows of the form `lower <= c . x <= upper` where either bound
//! may be infinite. This module translates that description into a [minilp]
//! problem, solves it in the minimize direction, and hands back the primal
//! column solution. Non-optimal outcomes are reported as values, never
//! panics; callers decide whether infeasibility is an error or an invariant
//! violation.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use tracing::debug;

/// A linear program in dense row form.
pub(crate) struct DenseProblem {
    objective: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    rows: Vec<Row>,
}

struct Row {
    lower: f64,
    coefs: Vec<f64>,
    upper: f64,
}

/// Why a solve produced no usable solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LpError {
    Infeasible,
    Unbounded,
}

impl DenseProblem {
    pub(crate) fn new() -> DenseProblem {
        DenseProblem {
            objective: Vec::new(),
            bounds: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Adds a variable with the given objective coefficient and bounds,
    /// returning its column index.
    pub(crate) fn add_var(&mut self, objective: f64, lower: f64, upper: f64) -> usize {
        self.objective.push(objective);
        self.bounds.push((lower, upper));
        self.objective.len() - 1
    }

    /// Adds the constraint `lower <= coefs . x <= upper`. `coefs` must have
    /// one entry per variable added so far; use `f64::NEG_INFINITY` /
    /// `f64::INFINITY` to leave a side open.
    pub(crate) fn add_row(&mut self, lower: f64, coefs: Vec<f64>, upper: f64) {
        debug_assert_eq!(coefs.len(), self.objective.len());
        self.rows.push(Row {
            lower,
            coefs,
            upper,
        });
    }

    /// Solves in the minimize direction and returns the primal column
    /// solution.
    pub(crate) fn minimize(&self) -> Result<Vec<f64>, LpError> {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<minilp::Variable> = self
            .objective
            .iter()
            .zip(&self.bounds)
            .map(|(&obj, &(lower, upper))| problem.add_var(obj, (lower, upper)))
            .collect();

        for row in &self.rows {
            let terms: Vec<(minilp::Variable, f64)> = row
                .coefs
                .iter()
                .enumerate()
                .filter(|(_, &c)| c != 0.0)
                .map(|(i, &c)| (vars[i], c))
                .collect();
            if terms.is_empty() {
                // A constant row: feasible iff zero lies between the bounds.
                if row.lower > 0.0 || row.upper < 0.0 {
                    return Err(LpError::Infeasible);
                }
                continue;
            }
            let expr = || {
                let mut expr = LinearExpr::empty();
                for &(var, coef) in &terms {
                    expr.add(var, coef);
                }
                expr
            };
            if row.lower == row.upper {
                problem.add_constraint(expr(), ComparisonOp::Eq, row.lower);
                continue;
            }
            if row.lower.is_finite() {
                problem.add_constraint(expr(), ComparisonOp::Ge, row.lower);
            }
            if row.upper.is_finite() {
                problem.add_constraint(expr(), ComparisonOp::Le, row.upper);
            }
        }

        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => LpError::Infeasible,
            minilp::Error::Unbounded => LpError::Unbounded,
        })?;

        debug!(
            "lp solved: {} vars, {} rows, objective {}",
            vars.len(),
            self.rows.len(),
            solution.objective()
        );
        Ok(vars.iter().map(|&v| solution[v]).collect())
    }
}
