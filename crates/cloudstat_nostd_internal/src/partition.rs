//! Divides the conceptual pairwise-distance matrix into tasks for parallel
//! evaluation.
//!
//! For a cross calculation, the matrix is just the full `N_A x N_B` grid and
//! tiling it is straightforward. The interesting case is the auto
//! calculation over a single set of `N` points, where the matrix is upper
//! triangular (there are `N - 1` conceptual rows and columns; column `k`
//! corresponds to point `k + 1`). Splitting each axis into `S` segments
//! yields `S` "triangle" tiles along the diagonal and `S*(S-1)/2`
//! off-diagonal "rectangle" tiles:
//!
//! ```text
//!     [[  ab  ac  ad | ae  af  ag ]      2 triangles (auto tiles)
//!      [   0  bc  bd | be  bf  bg ]      1 rectangle (cross tile)
//!      [   0   0  cd | ce  cf  cg ]
//!       --------------------------
//!      [   0   0   0 | ef  eg  eh ]
//!      [   0   0   0 |  0  fg  fh ]
//!      [   0   0   0 |  0   0  gh ]]
//! ```
//!
//! A triangle tile is itself a small auto calculation over a contiguous run
//! of points; a rectangle tile is a cross calculation between two disjoint
//! runs. Every pair of points lands in exactly one tile, so per-tile
//! accumulators can be merged without double counting.

/// Compute the start and stop indices of chunk `chunk_index` when `[0,
/// array_len)` is split into `num_chunks` contiguous chunks whose sizes
/// differ by at most one (the leading `array_len % num_chunks` chunks get
/// the extra element).
pub fn chunk_slice(chunk_index: usize, array_len: usize, num_chunks: usize) -> (usize, usize) {
    assert!(
        array_len >= num_chunks && chunk_index < num_chunks,
        "chunk_index = {chunk_index}, array_len = {array_len}, num_chunks = {num_chunks}",
    );
    let chunk_size = array_len / num_chunks;
    let remainder = array_len % num_chunks;
    let start = chunk_index * chunk_size + chunk_index.min(remainder);
    let stop = start + chunk_size + usize::from(chunk_index < remainder);
    (start, stop)
}

/// One tile of the conceptual distance matrix: the unit of parallel work.
///
/// When `start_b == stop_b == 0` the task denotes an auto computation over
/// the point range `[start_a, stop_a)` (unique pairs with `i < j`).
/// Otherwise it denotes a cross computation over
/// `[start_a, stop_a) x [start_b, stop_b)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatTask {
    pub start_a: usize,
    pub stop_a: usize,
    pub start_b: usize,
    pub stop_b: usize,
}

impl StatTask {
    #[inline]
    pub fn is_auto(&self) -> bool {
        (self.start_b == self.stop_b) && (self.stop_b == 0)
    }
}

/// tile count when a triangular matrix is split into `segments` per axis
fn n_auto_tiles(segments: usize) -> usize {
    let num_triangles = segments;
    let num_rect = (segments - 1) * segments / 2;
    num_rect + num_triangles
}

/// Tiling of the (triangular) distance matrix of a single point set.
#[derive(Clone, Copy, Debug)]
pub struct AutoPartition {
    n_points: usize,
    n_segments: usize,
}

impl AutoPartition {
    /// Pick a tiling for `n_points` points that keeps `nproc` workers busy.
    ///
    /// `skip_small_check` disables the heuristic that refuses to subdivide
    /// problems too small to be worth the overhead (it exists so tests can
    /// exercise partitioning on conveniently small inputs).
    pub fn create(
        nproc: usize,
        n_points: usize,
        skip_small_check: bool,
    ) -> Result<Self, &'static str> {
        if nproc == 0 {
            return Err("nproc can't be zero");
        } else if n_points <= 1 {
            return Err("n_points must exceed 1");
        } else if nproc > 60 {
            return Err("the tiling strategy should be rethought for this many workers");
        }

        // the minimum number of points per segment is 2. For n_points == 5,
        // that means max_segments = 2. For fewer points, force 1.
        let max_segments = if n_points <= 4 { 1 } else { (n_points - 1) / 2 };

        let is_small_problem = !skip_small_check && (n_points <= 1000);
        if is_small_problem || nproc == 1 || max_segments == 1 {
            return Ok(Self {
                n_points,
                n_segments: 1,
            });
        }

        // pick the smallest segment count that yields enough tiles to give
        // each worker a few of them (the load per tile is uneven, so a few
        // tiles per worker evens things out)
        let mut n_segments = max_segments;
        for cur_n_segments in 2..max_segments {
            if n_auto_tiles(cur_n_segments) >= 3 * nproc {
                n_segments = cur_n_segments;
                break;
            }
        }

        if (n_segments * 2 + 1) > n_points {
            return Err("too many segments");
        }

        Ok(Self {
            n_points,
            n_segments,
        })
    }

    fn n_partitions(&self) -> usize {
        n_auto_tiles(self.n_segments)
    }

    /// advance a 2D tile index in row-major order over `j >= i`
    fn increment_2d_index(&self, index: &mut [usize; 2]) {
        index[1] += 1;
        if index[1] == self.n_segments {
            index[0] += 1;
            index[1] = index[0];
        }
    }

    fn build_task(&self, index_2d: [usize; 2]) -> StatTask {
        // the distance matrix has one fewer entry per axis than n_points
        let n_dist_matrix_elements = self.n_points - 1;

        if index_2d[0] == index_2d[1] {
            // a diagonal tile: an auto computation over one segment. The
            // `+ 1` on the stop converts a run of matrix rows into the run
            // of points that participates in those rows' unique pairs.
            let (start, stop) =
                chunk_slice(index_2d[0], n_dist_matrix_elements, self.n_segments);
            StatTask {
                start_a: start,
                stop_a: stop + 1,
                start_b: 0,
                stop_b: 0,
            }
        } else {
            // an off-diagonal tile: a cross computation between 2 disjoint
            // segments. Axis 0 (rows) supplies the B range directly; axis 1
            // (columns) supplies the A range shifted by +1, because column
            // k of the triangular matrix corresponds to point k + 1.
            let (start_ax0, stop_ax0) =
                chunk_slice(index_2d[0], n_dist_matrix_elements, self.n_segments);
            let (start_ax1, stop_ax1) =
                chunk_slice(index_2d[1], n_dist_matrix_elements, self.n_segments);
            StatTask {
                start_a: start_ax1 + 1,
                stop_a: stop_ax1 + 1,
                start_b: start_ax0,
                stop_b: stop_ax0,
            }
        }
    }
}

/// Tiling of the full distance matrix between two point sets.
#[derive(Clone, Copy, Debug)]
pub struct CrossPartition {
    n_points_a: usize,
    n_segments_a: usize,
    n_points_b: usize,
    n_segments_b: usize,
}

impl CrossPartition {
    pub fn create(
        nproc: usize,
        n_points_a: usize,
        n_points_b: usize,
        skip_small_check: bool,
    ) -> Result<Self, &'static str> {
        if nproc == 0 {
            return Err("nproc can't be zero");
        } else if n_points_a == 0 || n_points_b == 0 {
            return Err("both point sets must be non-empty");
        }

        const SMALL_NPAIRS: usize = 1000;
        // phrased to dodge overflow in the product
        let exceeds_small_npairs = (n_points_a * n_points_b > SMALL_NPAIRS)
            || (n_points_a >= SMALL_NPAIRS && n_points_b > 0)
            || (n_points_b >= SMALL_NPAIRS && n_points_a > 0);
        let is_small_problem = !exceeds_small_npairs && !skip_small_check;

        if is_small_problem || (nproc > n_points_a && nproc > n_points_b) {
            return Ok(Self {
                n_points_a,
                n_segments_a: 1,
                n_points_b,
                n_segments_b: 1,
            });
        }

        let builder = |partition_a: bool| -> Self {
            Self {
                n_points_a,
                n_segments_a: if partition_a { nproc } else { 1 },
                n_points_b,
                n_segments_b: if partition_a { 1 } else { nproc },
            }
        };

        // prefer the axis that divides evenly across the workers; otherwise
        // partition whichever axis is longer
        let smaller_than_both = (nproc <= n_points_a) && (nproc <= n_points_b);
        if (nproc <= n_points_a) && (n_points_a % nproc == 0) {
            Ok(builder(true))
        } else if (nproc <= n_points_b) && (n_points_b % nproc == 0) {
            Ok(builder(false))
        } else if smaller_than_both && (n_points_b > n_points_a) {
            Ok(builder(false))
        } else if smaller_than_both {
            Ok(builder(true))
        } else if nproc < n_points_b {
            Ok(builder(false))
        } else {
            Ok(builder(true))
        }
    }

    fn n_partitions(&self) -> usize {
        self.n_segments_a * self.n_segments_b
    }

    fn increment_2d_index(&self, index: &mut [usize; 2]) {
        index[1] += 1;
        if index[1] == self.n_segments_b {
            index[0] += 1;
            index[1] = 0;
        }
    }

    fn build_task(&self, index_2d: [usize; 2]) -> StatTask {
        assert!(
            index_2d[0] < self.n_segments_a && index_2d[1] < self.n_segments_b,
            "the 2D tile index is out of range",
        );
        let (start_a, stop_a) = chunk_slice(index_2d[0], self.n_points_a, self.n_segments_a);
        let (start_b, stop_b) = chunk_slice(index_2d[1], self.n_points_b, self.n_segments_b);
        StatTask {
            start_a,
            stop_a,
            start_b,
            stop_b,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum PartitionStrategy {
    Auto(AutoPartition),
    Cross(CrossPartition),
}

impl PartitionStrategy {
    fn n_partitions(&self) -> usize {
        match self {
            Self::Auto(strat) => strat.n_partitions(),
            Self::Cross(strat) => strat.n_partitions(),
        }
    }

    fn increment_2d_index(&self, index: &mut [usize; 2]) {
        match self {
            Self::Auto(strat) => strat.increment_2d_index(index),
            Self::Cross(strat) => strat.increment_2d_index(index),
        }
    }

    fn build_task(&self, index_2d: [usize; 2]) -> StatTask {
        match self {
            Self::Auto(strat) => strat.build_task(index_2d),
            Self::Cross(strat) => strat.build_task(index_2d),
        }
    }
}

/// Yields the tasks with 1D indices in `[index_start_1d, index_stop_1d)`,
/// following the canonical row-major tile enumeration.
pub struct TaskIter {
    index_stop_1d: usize,
    strategy: PartitionStrategy,
    next_index_1d: usize,
    next_index_2d: [usize; 2],
}

impl TaskIter {
    fn new(index_start_1d: usize, index_stop_1d: usize, strategy: PartitionStrategy) -> Self {
        assert!(
            index_start_1d < index_stop_1d,
            "index_stop_1d must exceed index_start_1d",
        );
        // fast-forward to the starting tile (a closed form is possible, but
        // this runs a handful of times per calculation)
        let mut next_index_2d = [0, 0];
        for _ in 0..index_start_1d {
            strategy.increment_2d_index(&mut next_index_2d);
        }
        Self {
            index_stop_1d,
            strategy,
            next_index_1d: index_start_1d,
            next_index_2d,
        }
    }
}

impl Iterator for TaskIter {
    type Item = StatTask;

    fn next(&mut self) -> Option<StatTask> {
        if self.next_index_1d >= self.index_stop_1d {
            return None;
        }
        let out = self.strategy.build_task(self.next_index_2d);
        self.next_index_1d += 1;
        self.strategy.increment_2d_index(&mut self.next_index_2d);
        Some(out)
    }
}

/// Holds a partitioning strategy and doles out each worker's share of the
/// tasks (by chunk-slicing the 1D tile-index range across the workers).
#[derive(Clone, Copy, Debug)]
pub struct PartitionPlan {
    nproc: usize,
    strategy: PartitionStrategy,
}

impl PartitionPlan {
    /// Build a plan. Pass `n_points_b = None` for an auto calculation.
    pub fn new(
        nproc: usize,
        n_points: usize,
        n_points_b: Option<usize>,
        skip_small_check: bool,
    ) -> Result<Self, &'static str> {
        let strategy = match n_points_b {
            None => PartitionStrategy::Auto(AutoPartition::create(
                nproc,
                n_points,
                skip_small_check,
            )?),
            Some(n_points_b) => PartitionStrategy::Cross(CrossPartition::create(
                nproc,
                n_points,
                n_points_b,
                skip_small_check,
            )?),
        };
        Ok(Self { nproc, strategy })
    }

    /// the total number of tasks the problem was broken into
    pub fn n_partitions(&self) -> usize {
        self.strategy.n_partitions()
    }

    /// the number of workers that will receive a non-empty share
    pub fn effective_nproc(&self) -> usize {
        self.nproc.min(self.n_partitions())
    }

    /// Construct the task iterator for the given worker.
    pub fn task_iter(&self, worker_id: usize) -> TaskIter {
        assert!(worker_id < self.effective_nproc(), "worker_id is too large");
        let (start, stop) = chunk_slice(worker_id, self.n_partitions(), self.effective_nproc());
        TaskIter::new(start, stop, self.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use std::collections::HashSet;

    #[test]
    fn chunk_slices_are_balanced_and_tile() {
        for array_len in 1..40usize {
            for num_chunks in 1..=array_len {
                let mut next_start = 0;
                let mut sizes = Vec::new();
                for i in 0..num_chunks {
                    let (start, stop) = chunk_slice(i, array_len, num_chunks);
                    assert_eq!(start, next_start, "chunks must be contiguous");
                    assert!(stop > start);
                    sizes.push(stop - start);
                    next_start = stop;
                }
                assert_eq!(next_start, array_len, "chunks must cover the range");
                let min = sizes.iter().min().unwrap();
                let max = sizes.iter().max().unwrap();
                assert!(max - min <= 1, "chunk sizes must differ by at most 1");
            }
        }
    }

    /// expand a task into the set of (i, j) point pairs it enumerates
    fn task_pairs(task: &StatTask) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        if task.is_auto() {
            for i in task.start_a..task.stop_a {
                for j in (i + 1)..task.stop_a {
                    out.push((i, j));
                }
            }
        } else {
            for i in task.start_a..task.stop_a {
                for j in task.start_b..task.stop_b {
                    out.push((i, j));
                }
            }
        }
        out
    }

    /// For the auto strategies, tasks mix "A" ranges (upper point index) and
    /// "B" ranges (lower point index). Normalize every enumerated pair into
    /// an unordered (low, high) form.
    fn normalized_task_pairs(task: &StatTask) -> Vec<(usize, usize)> {
        task_pairs(task)
            .into_iter()
            .map(|(i, j)| (i.min(j), i.max(j)))
            .collect()
    }

    #[test]
    fn auto_tasks_cover_all_pairs_exactly_once() {
        for n_points in [2usize, 5, 9, 23, 57, 101] {
            for nproc in [1usize, 2, 3, 7, 12] {
                let plan = PartitionPlan::new(nproc, n_points, None, true).unwrap();
                let mut seen: HashSet<(usize, usize)> = HashSet::new();
                for worker_id in 0..plan.effective_nproc() {
                    for task in plan.task_iter(worker_id) {
                        for pair in normalized_task_pairs(&task) {
                            assert!(
                                seen.insert(pair),
                                "pair {pair:?} enumerated twice (n_points={n_points}, nproc={nproc})",
                            );
                        }
                    }
                }
                let expected_n_pairs = n_points * (n_points - 1) / 2;
                assert_eq!(
                    seen.len(),
                    expected_n_pairs,
                    "missing pairs (n_points={n_points}, nproc={nproc})",
                );
                // no diagonal or out-of-range entries
                assert!(seen.iter().all(|&(i, j)| i < j && j < n_points));
            }
        }
    }

    #[test]
    fn cross_tasks_cover_the_full_product() {
        for (n_a, n_b) in [(3usize, 4usize), (10, 7), (25, 25), (64, 3)] {
            for nproc in [1usize, 2, 5, 8] {
                let plan = PartitionPlan::new(nproc, n_a, Some(n_b), true).unwrap();
                let mut seen: HashSet<(usize, usize)> = HashSet::new();
                for worker_id in 0..plan.effective_nproc() {
                    for task in plan.task_iter(worker_id) {
                        assert!(!task.is_auto());
                        for pair in task_pairs(&task) {
                            assert!(seen.insert(pair), "pair {pair:?} enumerated twice");
                        }
                    }
                }
                assert_eq!(seen.len(), n_a * n_b);
            }
        }
    }

    #[test]
    fn auto_partition_task_count_is_triangular() {
        // big enough that the small-problem heuristic doesn't kick in
        let n_points = 5000;
        for nproc in 2..=16usize {
            let plan = PartitionPlan::new(nproc, n_points, None, false).unwrap();
            let n = plan.n_partitions();
            // must be a triangle number: S * (S + 1) / 2
            let s = (0..).find(|s: &usize| s * (s + 1) / 2 >= n).unwrap();
            assert_eq!(s * (s + 1) / 2, n, "{n} isn't a triangle number");
            assert!(n >= 3 * nproc || s == (n_points - 1) / 2);
        }
    }

    #[test]
    fn small_problems_stay_whole() {
        let plan = PartitionPlan::new(8, 1000, None, false).unwrap();
        assert_eq!(plan.n_partitions(), 1);
        assert_eq!(plan.effective_nproc(), 1);

        let plan = PartitionPlan::new(8, 20, Some(30), false).unwrap();
        assert_eq!(plan.n_partitions(), 1);
    }

    #[test]
    fn rejects_degenerate_requests() {
        assert!(PartitionPlan::new(0, 100, None, false).is_err());
        assert!(PartitionPlan::new(4, 1, None, false).is_err());
        assert!(PartitionPlan::new(61, 5000, None, false).is_err());
        assert!(PartitionPlan::new(4, 0, Some(10), false).is_err());
        assert!(PartitionPlan::new(4, 10, Some(0), false).is_err());
    }

    #[test]
    fn cross_partition_prefers_divisible_axis() {
        let plan = PartitionPlan::new(4, 1003, Some(1024), true).unwrap();
        // 1024 divides evenly by 4; 1003 doesn't
        assert_eq!(plan.n_partitions(), 4);
        let tasks: Vec<StatTask> = plan.task_iter(0).collect();
        assert_eq!(plan.effective_nproc(), 4);
        // every task covers all of axis A and a quarter of axis B
        assert!(tasks.iter().all(|t| t.start_a == 0 && t.stop_a == 1003));
    }
}
