//! Deterministic partitioning of work into a fixed number of jobs.
//!
//! Which job processes which item only depends on the item's position and the
//! number of jobs. Jobs never share mutable state, so the result of a phase
//! does not depend on the order in which jobs run.

/// Distributes the items over `jobs` buckets, item `i` going to bucket
/// `i % jobs`.
pub(crate) fn partition<T>(items: impl IntoIterator<Item = T>, jobs: usize) -> Vec<Vec<T>> {
    debug_assert!(jobs > 0);
    let mut buckets: Vec<Vec<T>> = (0..jobs).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        buckets[i % jobs].push(item);
    }
    buckets
}

/// Runs every bucket as one job and returns once all of them are done.
///
/// With the `rayon` feature, jobs run on the global thread pool. Otherwise,
/// they run one after another on the calling thread.
pub(crate) fn run<T: Send>(buckets: Vec<Vec<T>>, work: impl Fn(T) + Sync + Send) {
    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        if buckets.len() > 1 {
            buckets
                .into_par_iter()
                .for_each(|bucket| bucket.into_iter().for_each(&work));
            return;
        }
    }

    for bucket in buckets {
        bucket.into_iter().for_each(&work);
    }
}
