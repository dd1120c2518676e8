//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Callers that need the kind back use `downcast_ref`.

use thiserror::Error;

use crate::domain::instance::LifecycleState;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Terminal failures of a provisioning run.
///
/// Every variant carries the diagnostics an operator needs to decide what to
/// clean up: the last observation, how many attempts were made, how long the
/// loop waited in total.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(
        "Instance {instance_id} did not reach {target} after {attempts} attempts \
         ({waited}s waited). Last observed state: {last}"
    )]
    ProvisionTimeout {
        instance_id: String,
        target: LifecycleState,
        last: LifecycleStateDisplay,
        attempts: u32,
        waited: u64,
    },

    #[error(
        "No public address found for instance {instance_id} after {attempts} attempts \
         ({waited}s waited)"
    )]
    AddressUnavailable {
        instance_id: String,
        attempts: u32,
        waited: u64,
    },

    #[error("Host {host} did not become reachable after {attempts} attempts ({waited}s waited)")]
    ConnectivityTimeout {
        host: String,
        attempts: u32,
        waited: u64,
    },

    #[error("Remote command failed during {stage}: {source}")]
    RemoteCommandFailure {
        stage: String,
        #[source]
        source: SessionError,
    },

    #[error(
        "Validation failed: `{command}` did not report '{marker}' after {attempts} attempts \
         ({waited}s waited). Last output: {last_output}"
    )]
    ValidationFailure {
        command: String,
        marker: String,
        attempts: u32,
        waited: u64,
        last_output: String,
    },

    #[error("Missing required configuration: {field}\n\n{hint}")]
    ConfigurationMissing { field: String, hint: String },
}

impl ProvisionError {
    /// Stable machine-readable code for `--json` output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProvisionTimeout { .. } => "provision_timeout",
            Self::AddressUnavailable { .. } => "address_unavailable",
            Self::ConnectivityTimeout { .. } => "connectivity_timeout",
            Self::RemoteCommandFailure { .. } => "remote_command_failure",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::ConfigurationMissing { .. } => "configuration_missing",
        }
    }

    /// Process exit code for this failure kind.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ProvisionTimeout { .. } => 3,
            Self::AddressUnavailable { .. } => 4,
            Self::ConnectivityTimeout { .. } => 5,
            Self::RemoteCommandFailure { .. } => 6,
            Self::ValidationFailure { .. } => 7,
            Self::ConfigurationMissing { .. } => 8,
        }
    }

    /// Shorthand for a `ConfigurationMissing` error.
    #[must_use]
    pub fn missing(field: &str, hint: &str) -> Self {
        Self::ConfigurationMissing {
            field: field.to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Last observed lifecycle state, or `none` when no observation was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStateDisplay(pub Option<LifecycleState>);

impl std::fmt::Display for LifecycleStateDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(state) => write!(f, "{state}"),
            None => f.write_str("none"),
        }
    }
}

// ── Remote session errors ─────────────────────────────────────────────────────

/// The two failure classes of a remote shell invocation.
///
/// `Connectivity` is retryable and, right after a self-triggered reboot,
/// expected. `Remote` means the transport worked and the command itself
/// failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("host unreachable: {reason}")]
    Connectivity { reason: String },

    #[error("remote command exited with {}: {stderr}", exit_display(.code))]
    Remote { code: Option<i32>, stderr: String },
}

impl SessionError {
    /// Returns `true` for the retryable transport class.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

#[allow(clippy::ref_option)]
fn exit_display(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}
