use crate::api::error::{QuantError, QuantResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Smallest number of dense elements a single rayon task should cover.
pub(crate) static MIN_ELEMENTS_PER_TASK: AtomicUsize = AtomicUsize::new(4096);

/// Runtime configuration for kernel parallelism.
pub struct RuntimeConfig {
    /// Number of threads for the rayon pool.
    /// 0 means auto-detect (use all available cores).
    pub num_threads: usize,
    /// Element count below which a task is not split further (default 4096).
    pub min_elements_per_task: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            min_elements_per_task: 4096,
        }
    }
}

impl RuntimeConfig {
    /// Apply this runtime configuration globally.
    ///
    /// Configures rayon's global thread pool when `num_threads` is set and
    /// writes the task granularity to a global atomic. The global pool can be
    /// configured only once per process.
    pub fn apply(&self) -> QuantResult<()> {
        if self.num_threads != 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .build_global()
                .map_err(|e| QuantError::ThreadPool(
                    format!("Failed to set rayon thread pool: {}", e)
                ))?;
        }

        MIN_ELEMENTS_PER_TASK.store(self.min_elements_per_task.max(1), Ordering::Relaxed);

        log::info!("[runtime] blockq4 rayon threads: {}", rayon::current_num_threads());
        Ok(())
    }

    /// Build a dedicated pool; kernels run on it inside `pool.install(..)`.
    pub fn build_pool(&self) -> QuantResult<rayon::ThreadPool> {
        MIN_ELEMENTS_PER_TASK.store(self.min_elements_per_task.max(1), Ordering::Relaxed);
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("blockq4-{}", i))
            .build()
            .map_err(|e| QuantError::ThreadPool(format!("Failed to build rayon thread pool: {}", e)))
    }
}

/// Minimum number of work items per rayon task when each item covers
/// `elements_per_item` dense elements.
pub(crate) fn min_items_per_task(elements_per_item: usize) -> usize {
    let min_elements = MIN_ELEMENTS_PER_TASK.load(Ordering::Relaxed);
    (min_elements / elements_per_item.max(1)).max(1)
}
