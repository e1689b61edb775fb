pub mod config;
pub mod engine;
pub mod io;

mod collective;
mod matrix;
mod merge;
mod partition;
mod points;
mod reduce;

pub use config::HacConfig;
pub use engine::{ClusterReport, HacOutcome, HierarchicalClustering, Phase};
pub use merge::MergeRecord;
pub use points::{ActiveCluster, ClusterId, Point, PointStore};
pub use reduce::MinCandidate;


/// Errors that can occur while running the distributed clustering engine.
///
/// Every variant is fatal to the whole run; the bulk-synchronous model has no
/// partial state that could be retried without risking divergence between
/// worker replicas.
#[derive(thiserror::Error, Debug)]
pub enum HacError {
    /// Returned when the coordinate source cannot be read.
    #[error("i/o error while reading coordinates: {0}")]
    Io(#[from] std::io::Error),
    /// Returned when the coordinate source contains a malformed record.
    #[error("malformed input at line {line}: {detail}")]
    InvalidInput { line: usize, detail: String },
    /// Returned when rows cannot be assigned to workers, or the computed
    /// plan fails the exact-coverage check.
    #[error("partition failure (n={n}, workers={workers}): {detail}")]
    Partition {
        n: usize,
        workers: usize,
        detail: &'static str,
    },
    /// Returned when the point store and matrix buffer disagree in size.
    #[error("compute failure at iteration {iteration}: store holds {store_len} points but matrix is sized for {matrix_len}")]
    Compute {
        iteration: usize,
        store_len: usize,
        matrix_len: usize,
    },
    /// Returned when the configured target cluster count is invalid.
    #[error("unreachable target cluster count {target} for {starting_points} starting points")]
    Convergence {
        target: usize,
        starting_points: usize,
    },
    /// Returned when a barrier, broadcast, or combine could not complete
    /// because a peer worker failed first.
    #[error("collective aborted in phase {phase:?} at iteration {iteration}: worker {failed_rank} failed")]
    Collective {
        phase: engine::Phase,
        iteration: usize,
        failed_rank: usize,
    },
}
