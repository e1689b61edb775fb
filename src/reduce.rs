use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::matrix::DistanceMatrix;

/// One candidate for the globally closest pair: a materialized matrix cell
/// (`col < row`) and its distance.
///
/// The total order is distance first, then row, then col, all ascending. The
/// index tie-breaks matter: with them the reduction result is reproducible
/// across runs and across worker counts even when several pairs share the
/// minimum distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinCandidate {
    pub row: usize,
    pub col: usize,
    pub distance: f64,
}

impl MinCandidate {
    pub fn new(row: usize, col: usize, distance: f64) -> Self {
        debug_assert!(col < row, "candidate ({row}, {col}) is not lower triangular");
        Self { row, col, distance }
    }
}

impl Eq for MinCandidate {}

impl Ord for MinCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.row.cmp(&other.row))
            .then_with(|| self.col.cmp(&other.col))
    }
}

impl PartialOrd for MinCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scan a worker's own rows for its local minimum.
///
/// Returns `None` when the worker owns no materialized entry at all (a plan
/// consisting solely of row 0), so that a worker with nothing to offer stays
/// out of the combine entirely instead of injecting a sentinel that could
/// win by accident.
pub fn local_min(matrix: &DistanceMatrix, rows: &[usize]) -> Option<MinCandidate> {
    let mut best: Option<MinCandidate> = None;
    for &row in rows {
        for (col, &distance) in matrix.row(row).iter().enumerate() {
            let candidate = MinCandidate::new(row, col, distance);
            best = Some(match best {
                Some(current) => combine(current, candidate),
                None => candidate,
            });
        }
    }
    best
}

/// Associative, commutative min under the candidate total order.
#[inline]
pub fn combine(a: MinCandidate, b: MinCandidate) -> MinCandidate {
    if b < a {
        b
    } else {
        a
    }
}
