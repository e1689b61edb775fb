use serde::{Deserialize, Serialize};

use crate::points::{ClusterId, PointStore};
use crate::reduce::MinCandidate;

/// One applied merge, in the stable-id vocabulary of the audit log.
///
/// `surviving` is the cluster that absorbed the other and kept its id;
/// `absorbed` no longer exists after this record. Records are appended in
/// merge order, so the log replays the full dendrogram bottom-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub absorbed: ClusterId,
    pub surviving: ClusterId,
    pub distance: f64,
}

/// Apply the winning candidate to a replica store.
///
/// The candidate's `col < row` ordering fixes the merge direction: the lower
/// position absorbs the higher one, the survivor's representative becomes
/// the pairwise midpoint, and the higher position is compacted away. Every
/// worker runs this on its own replica with the same broadcast candidate;
/// the operation is deterministic, so the replicas stay bit-identical
/// without shipping the store itself.
pub fn apply_merge(store: &mut PointStore, candidate: &MinCandidate) -> MergeRecord {
    let (absorbed, surviving) = store.merge(candidate.col, candidate.row);
    MergeRecord {
        absorbed,
        surviving,
        distance: candidate.distance,
    }
}
