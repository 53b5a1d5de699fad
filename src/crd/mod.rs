//! # Custom Resource Definitions
//!
//! CRD types for the Metadata Injector Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `MetadataInjector` specification, selectors and the injected metadata
//! - `status.rs` - Status types for tracking scheduling state

mod spec;
mod status;

pub use spec::{MetadataInjection, MetadataInjector, MetadataInjectorSpec, ResourceSelector};
pub use status::{Condition, MetadataInjectorStatus};
