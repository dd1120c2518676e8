//! Domain layer: pure types, validation and error kinds.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod bootstrap;
pub mod config;
pub mod dns;
pub mod error;
pub mod instance;
pub mod report;
pub mod retry;

pub use bootstrap::{BootstrapOutcome, Stage, StageReport, StageStatus};
pub use config::{LocalInputs, ProvisionConfig, RawConfig};
pub use dns::PublishedName;
pub use error::{ProvisionError, SessionError};
pub use instance::{
    ImageFilter, ImageSummary, InstanceRecord, InstanceSpec, LifecycleState, Vnic, VnicAttachment,
};
pub use report::ProvisionReport;
pub use retry::RetryPolicy;
