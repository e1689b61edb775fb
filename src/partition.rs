use crate::HacError;

/// Assign distance-matrix rows to workers.
///
/// Row `i` of the strictly lower triangle holds `i` entries, so contiguous
/// blocks give the last worker almost all of the work. Instead the rows are
/// laid out in zig-zag order, walking both ends of `[0, n)` toward the
/// middle (`0, n-1, 1, n-2, ...`), and that sequence is dealt to the workers
/// in snake order (`0..p` one round, `p..0` the next). The snake matters: a
/// plain round-robin deal would hand every even-rank worker only front rows
/// when `p` is even, recreating the imbalance the zig-zag exists to fix.
///
/// Remainder rows when `p` does not divide `n` stay in the deal; nothing is
/// dropped. Fails if `n < p`, since some worker would own no row at all.
pub fn plan_rows(n: usize, p: usize, r: usize) -> Result<Vec<usize>, HacError> {
    check_shape(n, p)?;
    assert!(r < p, "worker rank {r} out of range for {p} workers");

    let mut rows = Vec::with_capacity(n / p + 1);
    for round in 0.. {
        let offset = if round % 2 == 0 { r } else { p - 1 - r };
        let slot = round * p + offset;
        if slot >= n {
            // Later rounds of an odd-length tail can still reach this rank.
            if round * p >= n {
                break;
            }
            continue;
        }
        rows.push(zigzag(slot, n));
    }
    Ok(rows)
}

/// Build the plans for every worker and verify exact coverage: the union of
/// all plans must be `{0, .., n-1}` with no gap and no overlap. The check is
/// cheap relative to the distance pass and guards the invariant every later
/// phase silently relies on.
pub fn full_plan(n: usize, p: usize) -> Result<Vec<Vec<usize>>, HacError> {
    check_shape(n, p)?;
    let plans: Vec<Vec<usize>> = (0..p)
        .map(|r| plan_rows(n, p, r))
        .collect::<Result<_, _>>()?;

    let mut seen = vec![false; n];
    for plan in &plans {
        for &row in plan {
            if row >= n || seen[row] {
                return Err(HacError::Partition {
                    n,
                    workers: p,
                    detail: "row plans overlap or exceed bounds",
                });
            }
            seen[row] = true;
        }
    }
    if seen.iter().any(|&s| !s) {
        return Err(HacError::Partition {
            n,
            workers: p,
            detail: "row plans leave a gap",
        });
    }
    Ok(plans)
}

fn check_shape(n: usize, p: usize) -> Result<(), HacError> {
    if p == 0 {
        return Err(HacError::Partition {
            n,
            workers: p,
            detail: "worker count must be positive",
        });
    }
    if n < p {
        return Err(HacError::Partition {
            n,
            workers: p,
            detail: "fewer rows than workers",
        });
    }
    Ok(())
}

/// Position `k` of the zig-zag walk over `[0, n)`: even positions count up
/// from the front, odd positions count down from the back.
#[inline]
fn zigzag(k: usize, n: usize) -> usize {
    if k % 2 == 0 {
        k / 2
    } else {
        n - 1 - k / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_walk_is_a_permutation() {
        let n = 7;
        let mut walk: Vec<usize> = (0..n).map(|k| zigzag(k, n)).collect();
        assert_eq!(walk, vec![0, 6, 1, 5, 2, 4, 3]);
        walk.sort_unstable();
        assert_eq!(walk, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn coverage_holds_across_shapes() {
        // Includes n == p, n % p != 0, and p == 1.
        for &(n, p) in &[
            (1, 1),
            (4, 1),
            (4, 2),
            (4, 4),
            (5, 2),
            (7, 3),
            (10, 4),
            (50, 7),
            (51, 7),
            (100, 8),
        ] {
            let plans = full_plan(n, p).unwrap();
            assert_eq!(plans.len(), p);
            for plan in &plans {
                assert!(!plan.is_empty(), "empty plan for n={n} p={p}");
            }
        }
    }

    #[test]
    fn workload_is_roughly_balanced() {
        // Entry count of row i is i; worker totals should stay well within
        // 2x of each other for non-trivial shapes.
        let n = 100;
        for p in [2, 3, 4, 7, 8] {
            let plans = full_plan(n, p).unwrap();
            let totals: Vec<usize> = plans
                .iter()
                .map(|plan| plan.iter().copied().sum())
                .collect();
            let min = *totals.iter().min().unwrap();
            let max = *totals.iter().max().unwrap();
            assert!(max <= min * 2, "unbalanced totals for p={p}: {totals:?}");
        }
    }

    #[test]
    fn fewer_rows_than_workers_errors() {
        assert!(matches!(
            plan_rows(3, 4, 0),
            Err(HacError::Partition { n: 3, workers: 4, .. })
        ));
    }

    #[test]
    fn zero_workers_errors() {
        assert!(matches!(
            full_plan(5, 0),
            Err(HacError::Partition { workers: 0, .. })
        ));
    }
}
