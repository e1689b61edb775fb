use serde::{Deserialize, Serialize};

/// A 2-D coordinate. Double precision throughout: representative points are
/// recomputed as running averages across many merge iterations, so the error
/// accumulation of f32 would be visible in deep hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unweighted midpoint of two representative points. This is the exact
    /// centroid policy of the algorithm: the average of the two merging
    /// representatives, not a size-weighted centroid of all absorbed members.
    #[inline]
    pub fn midpoint(&self, other: &Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Stable identifier for a cluster, assigned once at creation.
///
/// Active positions in the [`PointStore`] shift on every merge compaction, so
/// positions cannot name clusters across iterations. Ids can: the singleton
/// built from original point `i` gets id `i`, and a merge keeps the absorbing
/// side's id. External consumers (the merge audit log) reference these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

/// One active cluster: its stable id, current representative point, and the
/// ordered set of original point indices that have merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCluster {
    pub id: ClusterId,
    pub representative: Point,
    pub members: Vec<usize>,
}

/// The replicated, authoritative sequence of active clusters.
///
/// Every worker holds an identical replica between phases. Positions are
/// volatile: merging removes one position and shifts everything above it down
/// by one, so the store is only ever addressed by position within a single
/// iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct PointStore {
    active: Vec<ActiveCluster>,
    starting_points: usize,
}

impl PointStore {
    /// Build the initial store: every point in its own singleton cluster,
    /// id equal to its original index.
    pub fn from_points(points: &[Point]) -> Self {
        let active = points
            .iter()
            .enumerate()
            .map(|(i, &p)| ActiveCluster {
                id: ClusterId(i as u32),
                representative: p,
                members: vec![i],
            })
            .collect();
        Self {
            active,
            starting_points: points.len(),
        }
    }

    /// Number of active clusters.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Original point count `N0`; constant across the run.
    pub fn starting_points(&self) -> usize {
        self.starting_points
    }

    pub fn point(&self, position: usize) -> &Point {
        &self.active[position].representative
    }

    pub fn cluster(&self, position: usize) -> &ActiveCluster {
        &self.active[position]
    }

    pub fn clusters(&self) -> &[ActiveCluster] {
        &self.active
    }

    /// Merge the cluster at `absorbed_pos` into the cluster at
    /// `surviving_pos` (which must be the lower position), replace the
    /// survivor's representative with the pairwise midpoint, and compact the
    /// absorbed position away. Returns the ids involved.
    ///
    /// Deterministic: identical inputs produce bit-identical stores, which is
    /// what lets every worker apply the merge to its own replica instead of
    /// shipping the whole store around.
    pub fn merge(&mut self, surviving_pos: usize, absorbed_pos: usize) -> (ClusterId, ClusterId) {
        assert!(
            surviving_pos < absorbed_pos,
            "lower position absorbs higher: {surviving_pos} !< {absorbed_pos}"
        );
        assert!(absorbed_pos < self.active.len());

        let absorbed = self.active.remove(absorbed_pos);
        let survivor = &mut self.active[surviving_pos];
        survivor.representative = survivor.representative.midpoint(&absorbed.representative);
        survivor.members.extend(absorbed.members);
        (absorbed.id, survivor.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_store_has_identity_ids_and_members() {
        let store = PointStore::from_points(&[Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.starting_points(), 2);
        assert_eq!(store.cluster(1).id, ClusterId(1));
        assert_eq!(store.cluster(1).members, vec![1]);
    }

    #[test]
    fn distance_matches_hand_computation() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
        assert!((b.distance(&a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn merge_averages_representatives_and_compacts() {
        let mut store = PointStore::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(9.0, 9.0),
        ]);
        let (absorbed, surviving) = store.merge(0, 1);
        assert_eq!(absorbed, ClusterId(1));
        assert_eq!(surviving, ClusterId(0));
        assert_eq!(store.len(), 2);
        assert_eq!(store.point(0), &Point::new(1.0, 1.0));
        assert_eq!(store.cluster(0).members, vec![0, 1]);
        // Position 2 shifted down to 1.
        assert_eq!(store.cluster(1).id, ClusterId(2));
    }

    #[test]
    #[should_panic(expected = "lower position absorbs higher")]
    fn merge_rejects_inverted_positions() {
        let mut store = PointStore::from_points(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        store.merge(1, 0);
    }
}
