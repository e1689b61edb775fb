use std::sync::Barrier;

use parking_lot::Mutex;

use crate::engine::Phase;
use crate::reduce::{combine, MinCandidate};
use crate::HacError;

/// First failure observed anywhere in the worker group.
#[derive(Debug, Clone, Copy)]
struct Failure {
    rank: usize,
    phase: Phase,
    iteration: usize,
}

/// Shared synchronization state for a fixed group of worker threads.
///
/// Every phase boundary is a [`Collective::checkpoint`]: each worker deposits
/// the outcome of its local phase work, waits at the barrier, and then the
/// whole group either proceeds or aborts together. A failing worker never
/// walks away from the barrier protocol, so peers are released rather than
/// deadlocked, and no worker can enter phase `k + 1` before every worker
/// finished phase `k`.
pub struct Collective {
    barrier: Barrier,
    slots: Mutex<Vec<Option<MinCandidate>>>,
    failure: Mutex<Option<Failure>>,
}

impl Collective {
    pub fn new(workers: usize) -> Self {
        Self {
            barrier: Barrier::new(workers),
            slots: Mutex::new(vec![None; workers]),
            failure: Mutex::new(None),
        }
    }

    /// Phase barrier with fail-fast semantics.
    ///
    /// All workers must call this at the same point in the phase sequence.
    /// The checkpoint is two barriers wide: a deposit barrier after which
    /// every rank's verdict for this window is recorded, and a release
    /// barrier that holds every rank inside the checkpoint until all of them
    /// have read that verdict. The group therefore observes a single
    /// consistent result: everyone's `Ok` values, or abort for everyone.
    /// The worker whose phase failed keeps its own error; its peers report
    /// the checkpoint that released them under a poisoned group.
    pub fn checkpoint<T>(
        &self,
        rank: usize,
        phase: Phase,
        iteration: usize,
        result: Result<T, HacError>,
    ) -> Result<T, HacError> {
        if result.is_err() {
            let mut failure = self.failure.lock();
            // First failure wins; later ones in the same window lose the race
            // but still abort below.
            failure.get_or_insert(Failure {
                rank,
                phase,
                iteration,
            });
        }

        self.barrier.wait();

        let poisoned = *self.failure.lock();

        // Without this second barrier a rank could sprint into the next
        // phase, fail there, and have that poison read by a slower peer
        // still inside this checkpoint. The slow peer would abort without
        // ever reaching the fast rank's barrier, leaving it parked forever.
        // Holding every rank here until all have read the verdict pins the
        // poison to the window it was deposited in.
        self.barrier.wait();

        match (result, poisoned) {
            (Err(err), _) => Err(err),
            (Ok(_), Some(failure)) => Err(HacError::Collective {
                phase: failure.phase,
                iteration: failure.iteration,
                failed_rank: failure.rank,
            }),
            (Ok(value), None) => Ok(value),
        }
    }

    /// All-reduce of the per-worker local minima.
    ///
    /// Each worker deposits its `Option<MinCandidate>` (workers owning no
    /// materialized entry deposit `None` and thereby sit out the fold), the
    /// group synchronizes, and then every worker folds the full slot vector
    /// with the same associative combine. The winner is thus broadcast: all
    /// workers hold an identical candidate and can derive the merge locally.
    ///
    /// Slots are overwritten in place on the next call; the surrounding
    /// phase barriers guarantee all reads of this round complete first.
    pub fn reduce_min(
        &self,
        rank: usize,
        iteration: usize,
        local: Option<MinCandidate>,
    ) -> Result<MinCandidate, HacError> {
        {
            let mut slots = self.slots.lock();
            slots[rank] = local;
        }

        self.barrier.wait();

        let winner = {
            let slots = self.slots.lock();
            slots
                .iter()
                .flatten()
                .copied()
                .reduce(combine)
        };
        // Every worker computes the same fold over the same slots, so this
        // error (an empty combine) is taken by all workers symmetrically.
        winner.ok_or(HacError::Collective {
            phase: Phase::ReduceMin,
            iteration,
            failed_rank: rank,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn checkpoint_releases_all_ranks_on_success() {
        let workers = 4;
        let coll = Collective::new(workers);
        thread::scope(|scope| {
            for rank in 0..workers {
                let coll = &coll;
                scope.spawn(move || {
                    let value = coll
                        .checkpoint(rank, Phase::Partition, 0, Ok(rank * 10))
                        .unwrap();
                    assert_eq!(value, rank * 10);
                });
            }
        });
    }

    #[test]
    fn one_failing_rank_poisons_the_group() {
        let workers = 3;
        let coll = Collective::new(workers);
        thread::scope(|scope| {
            let mut handles = Vec::new();
            for rank in 0..workers {
                let coll = &coll;
                handles.push(scope.spawn(move || {
                    let result: Result<(), HacError> = if rank == 1 {
                        Err(HacError::Compute {
                            iteration: 4,
                            store_len: 5,
                            matrix_len: 6,
                        })
                    } else {
                        Ok(())
                    };
                    coll.checkpoint(rank, Phase::ComputeDistances, 4, result)
                }));
            }
            for (rank, handle) in handles.into_iter().enumerate() {
                let err = handle.join().unwrap().unwrap_err();
                if rank == 1 {
                    assert!(matches!(err, HacError::Compute { iteration: 4, .. }));
                } else {
                    assert!(matches!(
                        err,
                        HacError::Collective {
                            phase: Phase::ComputeDistances,
                            iteration: 4,
                            failed_rank: 1,
                        }
                    ));
                }
            }
        });
    }

    #[test]
    fn poison_from_a_later_phase_does_not_leak_into_an_earlier_checkpoint() {
        let workers = 2;
        let coll = Collective::new(workers);
        // Rank 1 clears the first checkpoint and fails at the next one while
        // rank 0 is still on its way there. Rank 0 must pass the first
        // checkpoint clean and see the failure only at the second, instead of
        // aborting early and stranding rank 1 at its barrier.
        thread::scope(|scope| {
            let slow = {
                let coll = &coll;
                scope.spawn(move || {
                    let first = coll.checkpoint(0, Phase::Publish, 2, Ok(()));
                    thread::sleep(Duration::from_millis(20));
                    let second = coll.checkpoint(0, Phase::Partition, 3, Ok(()));
                    (first, second)
                })
            };
            let fast = {
                let coll = &coll;
                scope.spawn(move || {
                    let first = coll.checkpoint(1, Phase::Publish, 2, Ok(()));
                    let second = coll.checkpoint(
                        1,
                        Phase::Partition,
                        3,
                        Err::<(), _>(HacError::Partition {
                            n: 3,
                            workers: 2,
                            detail: "fewer active clusters than workers",
                        }),
                    );
                    (first, second)
                })
            };

            let (first, second) = slow.join().unwrap();
            assert!(first.is_ok());
            assert!(matches!(
                second,
                Err(HacError::Collective {
                    phase: Phase::Partition,
                    iteration: 3,
                    failed_rank: 1,
                })
            ));

            let (first, second) = fast.join().unwrap();
            assert!(first.is_ok());
            assert!(matches!(second, Err(HacError::Partition { .. })));
        });
    }

    #[test]
    fn reduce_min_broadcasts_the_same_winner_to_every_rank() {
        let workers = 4;
        let coll = Collective::new(workers);
        let locals = [
            Some(MinCandidate::new(3, 1, 2.5)),
            None,
            Some(MinCandidate::new(5, 0, 0.75)),
            Some(MinCandidate::new(2, 1, 0.75)),
        ];
        thread::scope(|scope| {
            let mut handles = Vec::new();
            for rank in 0..workers {
                let coll = &coll;
                let local = locals[rank];
                handles.push(scope.spawn(move || coll.reduce_min(rank, 0, local)));
            }
            for handle in handles {
                let winner = handle.join().unwrap().unwrap();
                // Equal distances break on the smaller row.
                assert_eq!((winner.row, winner.col), (2, 1));
            }
        });
    }

    #[test]
    fn reduce_min_with_no_candidates_aborts_symmetrically() {
        let workers = 2;
        let coll = Collective::new(workers);
        thread::scope(|scope| {
            let mut handles = Vec::new();
            for rank in 0..workers {
                let coll = &coll;
                handles.push(scope.spawn(move || coll.reduce_min(rank, 7, None)));
            }
            for handle in handles {
                assert!(matches!(
                    handle.join().unwrap(),
                    Err(HacError::Collective {
                        phase: Phase::ReduceMin,
                        iteration: 7,
                        ..
                    })
                ));
            }
        });
    }
}
