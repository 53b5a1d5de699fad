//! # Configuration
//!
//! Controller-level configuration loaded from environment variables.
//!
//! - `controller.rs` - `ControllerConfig` and the derived `SchedulerConfig`

mod controller;

pub use controller::{ControllerConfig, LogFormat};
