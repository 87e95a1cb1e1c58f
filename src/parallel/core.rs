use crate::error::ReportError;
use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, bounded};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Output of a batch: successful results in input order plus the number of
/// units that failed or panicked
#[derive(Debug)]
pub struct Completed<R> {
    pub results: Vec<R>,
    pub failures: usize,
}

impl<R> Completed<R> {
    fn from_outcomes(mut outcomes: Vec<(usize, Option<R>)>) -> Self {
        outcomes.sort_by_key(|(index, _)| *index);
        let total = outcomes.len();
        let results: Vec<R> = outcomes.into_iter().filter_map(|(_, r)| r).collect();
        Self {
            failures: total - results.len(),
            results,
        }
    }
}

/// Bounded pool of scoped worker threads fed through crossbeam channels
pub struct ParallelExecutor {
    max_workers: usize,
    buffer_size: usize,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, T, R, F> {
    worker_id: usize,
    work_rx: Receiver<(usize, T)>,
    result_tx: Sender<(usize, Option<R>)>,
    progress_counter: &'a AtomicUsize,
    total_items: usize,
    processor: &'a F,
    label: &'a str,
}

impl ParallelExecutor {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            buffer_size: max_workers * 2,
        }
    }

    /// Execute work items in parallel using a producer-consumer pattern.
    ///
    /// Each item runs to completion on one worker. A unit that returns an
    /// error or panics yields no result; its siblings are unaffected.
    pub fn execute<T, R, F>(&self, work_items: Vec<T>, processor: F, label: &str) -> Result<Completed<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&T, usize) -> Result<R> + Sync,
    {
        if work_items.is_empty() {
            return Ok(Completed {
                results: Vec::new(),
                failures: 0,
            });
        }

        let actual_workers = std::cmp::min(self.max_workers, work_items.len());
        let (work_tx, work_rx): (Sender<(usize, T)>, Receiver<(usize, T)>) = bounded(self.buffer_size);
        let (result_tx, result_rx): (Sender<(usize, Option<R>)>, Receiver<(usize, Option<R>)>) =
            bounded(self.buffer_size * 2);

        let progress_counter = AtomicUsize::new(0);
        let total_items = work_items.len();

        let outcomes = crossbeam::thread::scope(|s| {
            for worker_id in 0..actual_workers {
                let ctx = WorkerContext {
                    worker_id,
                    work_rx: work_rx.clone(),
                    result_tx: result_tx.clone(),
                    progress_counter: &progress_counter,
                    total_items,
                    processor: &processor,
                    label,
                };
                s.spawn(move |_| Self::worker_thread(ctx));
            }

            // Producer thread: send work to workers
            s.spawn(move |_| {
                for item in work_items.into_iter().enumerate() {
                    if work_tx.send(item).is_err() {
                        break; // Workers dropped
                    }
                }
            });

            // Drop our copies so the channels close once the threads are done
            drop(work_rx);
            drop(result_tx);

            Self::collect_results(result_rx, total_items)
        })
        .map_err(|_| ReportError::WorkerPool(label.to_string()))?;

        Ok(Completed::from_outcomes(outcomes))
    }

    fn worker_thread<T, R, F>(ctx: WorkerContext<'_, T, R, F>)
    where
        F: Fn(&T, usize) -> Result<R>,
    {
        while let Ok((index, work_item)) = ctx.work_rx.recv() {
            let result = run_unit(ctx.processor, &work_item, ctx.worker_id, ctx.label);

            if ctx.result_tx.send((index, result)).is_err() {
                break; // Receiver dropped
            }

            let current = ctx.progress_counter.fetch_add(1, Ordering::Relaxed) + 1;
            if current % 5 == 0 || current == ctx.total_items {
                tracing::trace!(
                    "{}: {}/{} items [worker-{}]",
                    ctx.label,
                    current,
                    ctx.total_items,
                    ctx.worker_id
                );
            }
        }
    }

    fn collect_results<R>(result_rx: Receiver<(usize, Option<R>)>, total_items: usize) -> Vec<(usize, Option<R>)> {
        let mut results = Vec::with_capacity(total_items);

        while let Ok(result) = result_rx.recv() {
            results.push(result);
            if results.len() >= total_items {
                break;
            }
        }

        results
    }
}

/// Sequential execution for small batches
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn execute<T, R, F>(work_items: Vec<T>, processor: F, label: &str) -> Completed<R>
    where
        F: Fn(&T, usize) -> Result<R>,
    {
        let outcomes = work_items
            .iter()
            .enumerate()
            .map(|(index, item)| (index, run_unit(&processor, item, 0, label)))
            .collect();
        Completed::from_outcomes(outcomes)
    }
}

/// Runs one unit, converting errors and panics into "no output"
fn run_unit<T, R, F>(processor: &F, item: &T, worker_id: usize, label: &str) -> Option<R>
where
    F: Fn(&T, usize) -> Result<R>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| processor(item, worker_id))) {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => {
            tracing::warn!("{label}: {e:#}");
            None
        }
        Err(_) => {
            tracing::warn!("{label}: unit panicked on worker-{worker_id}");
            None
        }
    }
}

/// Execution strategy enum for choosing between parallel and sequential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    pub fn execute<T, R, F>(&self, work_items: Vec<T>, processor: F, label: &str) -> Result<Completed<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&T, usize) -> Result<R> + Sync,
    {
        match self {
            ExecutionStrategy::Sequential => Ok(SequentialExecutor::execute(work_items, processor, label)),
            ExecutionStrategy::Parallel { workers } => {
                ParallelExecutor::new(*workers).execute(work_items, processor, label)
            }
        }
    }

    /// Threshold decision between sequential and parallel execution
    pub fn auto(work_items_count: usize, min_items_for_parallel: usize, optimal_workers: usize) -> Self {
        if work_items_count >= min_items_for_parallel && optimal_workers > 1 {
            ExecutionStrategy::Parallel {
                workers: optimal_workers,
            }
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// Maximum workers from available cores and configuration limits.
    ///
    /// `max_threads_config` of 0 means no explicit limit.
    pub fn calculate_optimal_workers(max_threads_config: usize, thread_percentage: u8) -> usize {
        let available_cores = num_cpus::get();

        let workers_by_percentage = std::cmp::max(1, (available_cores * thread_percentage as usize) / 100);

        if max_threads_config > 0 {
            std::cmp::min(max_threads_config, workers_by_percentage)
        } else {
            workers_by_percentage
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_executor() {
        let completed = SequentialExecutor::execute(vec![1, 2, 3, 4, 5], |x, _| Ok(x * 2), "test");
        assert_eq!(completed.results, vec![2, 4, 6, 8, 10]);
        assert_eq!(completed.failures, 0);
    }

    #[test]
    fn test_parallel_executor_preserves_order() {
        let executor = ParallelExecutor::new(4);
        let items: Vec<u32> = (0..50).collect();
        let completed = executor.execute(items, |x, _| Ok(x * 2), "test").unwrap();
        let expected: Vec<u32> = (0..50).map(|x| x * 2).collect();
        assert_eq!(completed.results, expected);
    }

    #[test]
    fn test_failures_are_isolated() {
        let parallel = ExecutionStrategy::Parallel { workers: 3 };
        let completed = parallel
            .execute(
                vec![1, 2, 3, 4, 5],
                |x, _| {
                    if *x == 3 {
                        Err(anyhow::anyhow!("Error at 3"))
                    } else {
                        Ok(x * 2)
                    }
                },
                "test with errors",
            )
            .unwrap();
        assert_eq!(completed.results, vec![2, 4, 8, 10]);
        assert_eq!(completed.failures, 1);
    }

    #[test]
    fn test_panics_are_isolated() {
        let parallel = ExecutionStrategy::Parallel { workers: 2 };
        let completed = parallel
            .execute(
                vec![1, 2, 3],
                |x, _| {
                    if *x == 2 {
                        panic!("boom");
                    }
                    Ok(*x)
                },
                "test with panic",
            )
            .unwrap();
        assert_eq!(completed.results, vec![1, 3]);
        assert_eq!(completed.failures, 1);
    }

    #[test]
    fn test_auto_strategy() {
        assert_eq!(ExecutionStrategy::auto(5, 10, 8), ExecutionStrategy::Sequential);
        assert_eq!(ExecutionStrategy::auto(50, 10, 8), ExecutionStrategy::Parallel { workers: 8 });
        assert_eq!(ExecutionStrategy::auto(50, 10, 1), ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_optimal_workers_respects_limit() {
        assert!(ExecutionStrategy::calculate_optimal_workers(0, 75) >= 1);
        assert!(ExecutionStrategy::calculate_optimal_workers(2, 100) <= 2);
    }
}
