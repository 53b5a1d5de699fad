//! # Runtime
//!
//! Process-level wiring around the batch scheduler.
//!
//! - `context`: Shared state handed to every watch-triggered reconciliation
//! - `initialization`: Tracing, metrics, HTTP server, Kubernetes client and scheduler startup
//! - `watch_loop`: kube-runtime controller that triggers immediate runs
//! - `error_policy`: Per-resource backoff for failed watch-triggered runs

pub mod context;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use context::{ReconcilerError, TriggerSource, WatchContext};
