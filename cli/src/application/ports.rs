//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`; never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{
    ImageFilter, ImageSummary, InstanceRecord, InstanceSpec, PublishedName, SessionError, Vnic,
    VnicAttachment,
};

// ── Compute Provider Ports ────────────────────────────────────────────────────

/// The four compute operations the provisioning flow depends on.
#[allow(async_fn_in_trait)]
pub trait ComputeApi {
    /// Launch an instance and return its provider-assigned record.
    async fn launch_instance(&self, spec: &InstanceSpec) -> Result<InstanceRecord>;
    /// Fetch a fresh snapshot of an instance.
    async fn get_instance(&self, instance_id: &str) -> Result<InstanceRecord>;
    /// List the VNIC attachments of an instance (possibly empty).
    async fn list_vnic_attachments(&self, instance_id: &str) -> Result<Vec<VnicAttachment>>;
    /// Fetch a VNIC by id.
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic>;
}

/// Placement lookup.
#[allow(async_fn_in_trait)]
pub trait IdentityApi {
    /// List availability domain names in the compartment.
    async fn list_availability_domains(&self, compartment_id: &str) -> Result<Vec<String>>;
}

/// Boot image catalog.
#[allow(async_fn_in_trait)]
pub trait ImageCatalog {
    /// List images matching `filter`, newest first.
    async fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ImageSummary>>;
}

/// Composite trait: everything the provisioning driver needs from the cloud.
pub trait CloudProvider: ComputeApi + IdentityApi + ImageCatalog {}

/// Blanket implementation: any type implementing all three sub-traits is a `CloudProvider`.
impl<T> CloudProvider for T where T: ComputeApi + IdentityApi + ImageCatalog {}

// ── Name Publishing Port ──────────────────────────────────────────────────────

/// External DNS write. Idempotency and conflicts are the implementation's concern.
#[allow(async_fn_in_trait)]
pub trait NamePublisher {
    /// Create the record.
    async fn create_record(&self, record: &PublishedName) -> Result<()>;
}

// ── Remote Shell Ports ────────────────────────────────────────────────────────

/// Whether a remote command runs as the login user or elevated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    Ordinary,
    Privileged,
}

/// Captured output of a successful remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A single command or file transfer against one host.
///
/// Every call is a fresh logical connection. Failures are split into
/// `SessionError::Connectivity` and `SessionError::Remote`.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Target host.
    fn host(&self) -> &str;
    /// Run `command` through the remote login shell.
    async fn exec(&self, command: &str, elevation: Elevation) -> Result<RemoteOutput, SessionError>;
    /// Copy a local file to `remote` on the host.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), SessionError>;
}

/// Opens a `RemoteShell` for a host that is only known at run time.
pub trait SessionFactory {
    type Session: RemoteShell;
    /// Open a session description for `host`. No connection is made here.
    fn open(&self, host: &str) -> Self::Session;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
