use crate::worker::WorkerResult;

/// Aggregated statistics for one lock algorithm's run: per-worker iteration
/// counts are folded into mean/stdev/min/max/sum, and every worker's
/// latency samples are merged and sorted to derive p50/p99.
#[derive(Debug, Clone)]
pub struct LockResult {
    /// The algorithm's [`RawLock::name`](lockbench_locks::RawLock::name).
    pub name: &'static str,
    /// Mean iteration count across workers.
    pub mean: f64,
    /// Population standard deviation of iteration counts across workers.
    pub stdev: f64,
    /// Minimum iteration count across workers.
    pub min: u64,
    /// Maximum iteration count across workers.
    pub max: u64,
    /// Sum of iteration counts across all workers.
    pub sum: u64,
    /// 50th percentile acquire latency, in nanoseconds.
    pub lat_p50_ns: u64,
    /// 99th percentile acquire latency, in nanoseconds.
    pub lat_p99_ns: u64,
}

impl LockResult {
    /// Builds the aggregate record for one lock algorithm from every
    /// worker's raw result.
    pub fn aggregate(name: &'static str, workers: &[WorkerResult]) -> LockResult {
        let counts: Vec<u64> = workers.iter().map(|w| w.iterations).collect();
        let sum: u64 = counts.iter().sum();
        let n = counts.len().max(1) as f64;
        let mean = sum as f64 / n;

        let variance = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n;
        let stdev = variance.sqrt();

        let min = counts.iter().copied().min().unwrap_or(0);
        let max = counts.iter().copied().max().unwrap_or(0);

        let mut latencies: Vec<u64> = workers.iter().flat_map(|w| w.latencies_ns.iter().copied()).collect();
        latencies.sort_unstable();

        LockResult {
            name,
            mean,
            stdev,
            min,
            max,
            sum,
            lat_p50_ns: percentile(&latencies, 0.50),
            lat_p99_ns: percentile(&latencies, 0.99),
        }
    }
}

/// Returns the element at index `ceil(p * N) - 1` of a sorted slice, the
/// percentile convention the spec calls for.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(iterations: u64, latencies_ns: Vec<u64>) -> WorkerResult {
        WorkerResult { iterations, latencies_ns }
    }

    #[test]
    fn single_worker_has_zero_stdev() {
        let result = LockResult::aggregate("spin", &[worker(100, vec![10, 20, 30])]);
        assert_eq!(result.stdev, 0.0);
        assert_eq!(result.sum, 100);
        assert_eq!(result.min, result.max);
    }

    #[test]
    fn sum_equals_sum_of_worker_iterations() {
        let result = LockResult::aggregate("spin", &[worker(10, vec![]), worker(20, vec![]), worker(30, vec![])]);
        assert_eq!(result.sum, 60);
        assert!(result.min <= result.mean && result.mean <= result.max as f64);
    }

    #[test]
    fn p50_never_exceeds_p99() {
        let result = LockResult::aggregate(
            "spin",
            &[worker(3, vec![50, 10, 200]), worker(3, vec![5, 400, 30])],
        );
        assert!(result.lat_p50_ns <= result.lat_p99_ns);
    }

    #[test]
    fn percentile_of_empty_latencies_is_zero() {
        let result = LockResult::aggregate("spin", &[worker(5, vec![])]);
        assert_eq!(result.lat_p50_ns, 0);
        assert_eq!(result.lat_p99_ns, 0);
    }
}
