use std::thread;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::collective::Collective;
use crate::config::HacConfig;
use crate::matrix::{build_rows, DistanceMatrix};
use crate::merge::{apply_merge, MergeRecord};
use crate::partition::full_plan;
use crate::points::{ClusterId, Point, PointStore};
use crate::reduce::local_min;
use crate::HacError;

/// Phase of the bulk-synchronous iteration, in execution order. Used for
/// error and log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Partition,
    ComputeDistances,
    ReduceMin,
    Merge,
    Publish,
}

/// One final cluster, in stable-id vocabulary, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub id: ClusterId,
    /// Original point indices merged into this cluster, in absorption order.
    pub members: Vec<usize>,
    pub centroid: Point,
}

/// Terminal output of a successful run: the surviving clusters plus the
/// ordered log of every merge performed. There is no partial variant; a
/// failed run yields an error and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HacOutcome {
    pub clusters: Vec<ClusterReport>,
    pub merges: Vec<MergeRecord>,
}

/// Distributed hierarchical agglomerative clustering driver.
///
/// Runs a fixed group of SPMD worker threads in lockstep: partition the
/// matrix rows, compute assigned distances, all-reduce the closest pair,
/// apply the merge on every replica, publish, repeat until the active count
/// reaches the configured target (or 1). Phase barriers are the only
/// synchronization; there is no fine-grained locking on the clustering state
/// because no two workers ever write the same cell.
#[derive(Debug, Clone)]
pub struct HierarchicalClustering {
    config: HacConfig,
}

struct WorkerResult {
    store: PointStore,
    merges: Vec<MergeRecord>,
}

impl HierarchicalClustering {
    pub fn new(config: HacConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HacConfig {
        &self.config
    }

    /// Run the full iteration to convergence.
    pub fn run(&self, points: &[Point]) -> Result<HacOutcome, HacError> {
        self.config.validate(points.len())?;

        let store = PointStore::from_points(points);
        let target = self.config.target_cluster_count;
        let workers = self.config.worker_count;

        info!(
            "clustering {} points down to {} clusters on {} workers",
            store.len(),
            target,
            workers
        );

        if store.len() <= target {
            // Already converged; no partition or merge ever happens.
            return Ok(outcome_from(store, Vec::new()));
        }

        let collective = Collective::new(workers);
        let results: Vec<Result<WorkerResult, HacError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|rank| {
                    let collective = &collective;
                    let replica = store.clone();
                    scope.spawn(move || worker_loop(rank, workers, target, replica, collective))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("worker thread panicked"))
                .collect()
        });

        finish(results)
    }
}

/// The SPMD body executed by every worker. All ranks run the identical phase
/// sequence over their own replica; rank-dependent behavior is confined to
/// which rows a rank owns.
fn worker_loop(
    rank: usize,
    workers: usize,
    target: usize,
    mut store: PointStore,
    collective: &Collective,
) -> Result<WorkerResult, HacError> {
    let mut matrix = DistanceMatrix::new(store.len());
    let mut merges = Vec::with_capacity(store.len() - target);
    let mut iteration = 0usize;

    // Replicas are identical between phases, so every rank evaluates the
    // same loop condition and executes the same number of iterations.
    while store.len() > target && store.len() > 1 {
        let n = store.len();

        // PARTITION: every rank derives (and verifies) the full plan, then
        // keeps its own row list.
        let planned = full_plan(n, workers).map(|mut plans| std::mem::take(&mut plans[rank]));
        let rows = collective.checkpoint(rank, Phase::Partition, iteration, planned)?;

        // COMPUTE_DISTANCES: write only the owned rows.
        matrix.resize_for(n);
        let built = build_rows(&mut matrix, &rows, &store, iteration);
        collective.checkpoint(rank, Phase::ComputeDistances, iteration, built)?;

        // REDUCE_MIN: local scan of owned rows, then an all-reduce that
        // leaves every rank holding the identical winning candidate.
        let local = local_min(&matrix, &rows);
        let winner = collective.reduce_min(rank, iteration, local)?;

        // MERGE: deterministic replay of the same candidate on every
        // replica keeps the replicas bit-identical without shipping state.
        let record = apply_merge(&mut store, &winner);
        merges.push(record);
        collective.checkpoint(rank, Phase::Merge, iteration, Ok(()))?;

        // PUBLISH: the post-merge store becomes the authoritative input of
        // the next iteration only once every rank has finished merging.
        collective.checkpoint(rank, Phase::Publish, iteration, Ok(()))?;

        if rank == 0 {
            debug!(
                "iteration {iteration}: merged ({}, {}) at distance {:.6}, {} clusters remain",
                winner.row,
                winner.col,
                winner.distance,
                store.len()
            );
        }
        iteration += 1;
    }

    Ok(WorkerResult { store, merges })
}

/// Collapse the per-rank results into the single terminal outcome.
///
/// On failure the originating worker's error is preferred over the
/// `Collective` errors its peers were released with.
fn finish(results: Vec<Result<WorkerResult, HacError>>) -> Result<HacOutcome, HacError> {
    let mut first_collective = None;
    let mut published = None;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(worker) => {
                if rank == 0 {
                    published = Some(worker);
                }
            }
            Err(err @ HacError::Collective { .. }) => {
                first_collective.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    if let Some(err) = first_collective {
        return Err(err);
    }
    let worker = published.expect("rank 0 produced neither result nor error");

    info!(
        "converged: {} clusters after {} merges",
        worker.store.len(),
        worker.merges.len()
    );
    Ok(outcome_from(worker.store, worker.merges))
}

fn outcome_from(store: PointStore, merges: Vec<MergeRecord>) -> HacOutcome {
    let clusters = store
        .clusters()
        .iter()
        .map(|cluster| ClusterReport {
            id: cluster.id,
            members: cluster.members.clone(),
            centroid: cluster.representative,
        })
        .collect();
    HacOutcome { clusters, merges }
}
