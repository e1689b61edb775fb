use rayon::prelude::*;

use crate::points::PointStore;
use crate::HacError;

/// Strictly lower triangular pairwise distance matrix.
///
/// Only entries with `col < row` exist; the diagonal and upper triangle are
/// never materialized. Storage is row-major over the triangle, so row `row`
/// starts at `row * (row - 1) / 2` and holds `row` entries. The matrix is
/// rebuilt from scratch every iteration because a merge compaction shifts
/// every index above the removed position.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    entries: Vec<f64>,
    n: usize,
}

impl DistanceMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            entries: vec![0.0; Self::triangle_len(n)],
            n,
        }
    }

    #[inline]
    fn triangle_len(n: usize) -> usize {
        n * n.saturating_sub(1) / 2
    }

    /// Active point count this matrix is sized for.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Resize to hold distances for `n` points. The run only ever shrinks
    /// the matrix, so the startup allocation is reused across iterations.
    pub fn resize_for(&mut self, n: usize) {
        self.entries.resize(Self::triangle_len(n), 0.0);
        self.n = n;
    }

    #[inline]
    fn offset(row: usize, col: usize) -> usize {
        debug_assert!(col < row, "entry ({row}, {col}) is not materialized");
        row * (row - 1) / 2 + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.entries[Self::offset(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, distance: f64) {
        self.entries[Self::offset(row, col)] = distance;
    }

    /// The defined entries of one row as a slice (`row` entries, columns
    /// `0..row`). Row 0 has no materialized entry and yields an empty slice;
    /// the saturating arithmetic in `triangle_len` keeps it from underflowing.
    pub fn row(&self, row: usize) -> &[f64] {
        let start = Self::triangle_len(row);
        &self.entries[start..start + row]
    }
}

/// Fill the assigned rows of the matrix from the replicated point store.
///
/// Each row is independent of every other, so the rows a worker owns are
/// computed with a parallel iterator and written back in one pass. A worker
/// writes only rows it owns; disjoint plans across workers mean disjoint
/// cells, which is what makes the compute phase contention-free.
pub fn build_rows(
    matrix: &mut DistanceMatrix,
    rows: &[usize],
    store: &PointStore,
    iteration: usize,
) -> Result<(), HacError> {
    if matrix.n() != store.len() {
        return Err(HacError::Compute {
            iteration,
            store_len: store.len(),
            matrix_len: matrix.n(),
        });
    }

    let computed: Vec<(usize, Vec<f64>)> = rows
        .par_iter()
        .map(|&row| {
            let anchor = store.point(row);
            let distances = (0..row).map(|col| anchor.distance(store.point(col))).collect();
            (row, distances)
        })
        .collect();

    for (row, distances) in computed {
        for (col, distance) in distances.into_iter().enumerate() {
            matrix.set(row, col, distance);
        }
    }
    Ok(())
}
