use serde::{Deserialize, Serialize};

use crate::HacError;

/// Run configuration for the clustering engine.
///
/// `worker_count` is fixed for the lifetime of a run; there is no dynamic
/// membership. `target_cluster_count` is the terminal condition: iteration
/// stops as soon as the number of active clusters reaches it (or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HacConfig {
    pub worker_count: usize,
    pub target_cluster_count: usize,
}

impl Default for HacConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            target_cluster_count: 1,
        }
    }
}

impl HacConfig {
    pub fn new(worker_count: usize, target_cluster_count: usize) -> Self {
        Self {
            worker_count,
            target_cluster_count,
        }
    }

    /// Check this configuration against the starting point count.
    pub fn validate(&self, starting_points: usize) -> Result<(), HacError> {
        if self.worker_count == 0 {
            return Err(HacError::Partition {
                n: starting_points,
                workers: 0,
                detail: "worker count must be positive",
            });
        }
        if self.target_cluster_count == 0 || self.target_cluster_count > starting_points {
            return Err(HacError::Convergence {
                target: self.target_cluster_count,
                starting_points,
            });
        }
        Ok(())
    }
}
