//! Generic parallel execution framework
//!
//! Provides the bounded worker pool used by every data-parallel stage of the
//! report pipeline (extraction, rendering, assembly).
//!
//! The module only manages system resources and execution strategy:
//! - **Resource discovery**: available CPU cores via `num_cpus::get()`
//! - **Resource calculation**: applies thread percentage and max-thread limits
//! - **Execution strategy**: sequential vs parallel with crossbeam workers
//! - **Unit isolation**: a failing or panicking unit yields no output and is counted
//!
//! It knows nothing about artifacts or reports; callers decide how many
//! workers a workload deserves.
//!
//! ```rust
//! use matchreport::parallel::ExecutionStrategy;
//!
//! let workers = ExecutionStrategy::calculate_optimal_workers(0, 100);
//! let strategy = ExecutionStrategy::auto(100, 2, workers);
//! let completed = strategy.execute(vec![1, 2, 3], |x, _worker| Ok(x * 2), "double").unwrap();
//! assert_eq!(completed.results, vec![2, 4, 6]);
//! ```

pub mod core;

pub use self::core::{Completed, ExecutionStrategy, ParallelExecutor, SequentialExecutor};
