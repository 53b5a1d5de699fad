//! # Controller
//!
//! Core scheduling modules for the Metadata Injector Controller.
//!
//! - `selector`: Selector resolution (resource type, namespaces, names)
//! - `merge`: Label/annotation overlay
//! - `interval`: Control annotations, interval and next-run calculation
//! - `job`: Reconcile job definition
//! - `processor`: Executes one job and records its status
//! - `scheduler`: Batch dispatcher, worker pool and lifecycle
//! - `trigger`: Immediate, watch-driven runs
//! - `backoff`: Fibonacci backoff for failed watch-driven runs

pub mod backoff;
pub mod error;
pub mod interval;
pub mod job;
pub mod merge;
pub mod processor;
pub mod scheduler;
pub mod selector;
pub mod trigger;

pub use error::SchedulerError;
pub use job::{JobSource, ReconcileJob};
pub use processor::{JobProcessor, JobReport};
pub use scheduler::{BatchScheduler, SchedulerConfig, TickOutcome};
