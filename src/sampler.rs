//! Draws from cumulative distributions. Tables are built once during
//! initialization and binary-searched in the hot loop; nothing here
//! allocates after construction.

use crate::error::{Result, SimError};
use crate::prelude::Real;
use ndarray::prelude::*;
use rand::prelude::*;

/// Smallest index i such that cum[i] > target, for a non-decreasing
/// array. None when target is at or past the total mass.
#[inline]
pub fn search_cumulative(cum: &[Real], target: Real) -> Option<usize> {
    let idx = cum.partition_point(|&x| x <= target);
    if idx < cum.len() {
        return Some(idx);
    }
    return None;
}

/// Uniform element of a slice. None for an empty slice.
#[inline]
pub fn random_member<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    items.choose(rng)
}

/// Categorical distribution over indexes, backed by a prefix-sum
/// table.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeDist {
    cum: Vec<Real>,
}

impl CumulativeDist {
    pub fn new(weights: &[Real]) -> Result<Self> {
        if weights.is_empty() || weights.iter().any(|&w| w < 0.0 || !w.is_finite()) {
            return Err(SimError::InvalidDistribution(
                "weights must be finite and nonnegative",
            ));
        }
        let mut cum = Vec::with_capacity(weights.len());
        let mut acc = 0.0;
        for &w in weights {
            acc += w;
            cum.push(acc);
        }
        if acc <= 0.0 {
            return Err(SimError::InvalidDistribution("weights sum to zero"));
        }
        return Ok(CumulativeDist { cum });
    }

    pub fn total(&self) -> Real {
        self.cum[self.cum.len() - 1]
    }

    /// Draw an index with probability proportional to its weight.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        let target = rng.gen::<Real>() * self.total();
        search_cumulative(&self.cum, target).unwrap_or(self.cum.len() - 1)
    }
}

/// Joint distribution over index pairs of a square nonnegative
/// matrix, sampled by a row-marginal search followed by a conditional
/// search within the row. Two uniforms per draw.
#[derive(Debug, Clone, PartialEq)]
pub struct JointDist {
    row_cum: Vec<Real>,
    rows: Vec<Vec<Real>>,
}

impl JointDist {
    pub fn new(matrix: &Array2<Real>) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() || matrix.is_empty() {
            return Err(SimError::InvalidDistribution(
                "joint matrix must be square and non-empty",
            ));
        }
        if matrix.iter().any(|&w| w < 0.0 || !w.is_finite()) {
            return Err(SimError::InvalidDistribution(
                "joint matrix entries must be finite and nonnegative",
            ));
        }

        let mut row_cum = Vec::with_capacity(matrix.nrows());
        let mut rows = Vec::with_capacity(matrix.nrows());
        let mut acc = 0.0;
        for row in matrix.rows() {
            let mut row_acc = 0.0;
            let mut cum = Vec::with_capacity(row.len());
            for &w in row {
                row_acc += w;
                cum.push(row_acc);
            }
            acc += row_acc;
            row_cum.push(acc);
            rows.push(cum);
        }
        if acc <= 0.0 {
            return Err(SimError::InvalidDistribution("joint matrix sums to zero"));
        }
        return Ok(JointDist { row_cum, rows });
    }

    pub fn total(&self) -> Real {
        self.row_cum[self.row_cum.len() - 1]
    }

    /// Draw (i, j) with probability M[i, j] / sum(M).
    pub fn sample<R: Rng>(&self, rng: &mut R) -> (usize, usize) {
        let target = rng.gen::<Real>() * self.total();
        let i = search_cumulative(&self.row_cum, target).unwrap_or(self.row_cum.len() - 1);

        let row = &self.rows[i];
        let target = rng.gen::<Real>() * row[row.len() - 1];
        let j = search_cumulative(row, target).unwrap_or(row.len() - 1);
        return (i, j);
    }
}
