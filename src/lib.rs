//! Metadata Injector Controller Library
//!
//! Core functionality for the Metadata Injector Controller: the
//! `MetadataInjector` CRD, the batch reconciliation scheduler and the
//! Kubernetes clients it runs against.
//!
//! ## Quick Start
//!
//! ```rust
//! use metadata_injector_controller::prelude::*;
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
