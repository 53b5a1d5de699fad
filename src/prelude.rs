//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use metadata_injector_controller::prelude::*;
//! ```

pub use crate::crd::*;

pub use crate::client::{DeclarationStore, ResourceClient, ResourceTarget, StoreError};

pub use crate::controller::{
    BatchScheduler, JobProcessor, JobReport, JobSource, ReconcileJob, SchedulerConfig,
    SchedulerError,
};

pub use crate::config::ControllerConfig;

pub use crate::runtime::{ReconcilerError, TriggerSource, WatchContext};
