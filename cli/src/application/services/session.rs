//! Connectivity probe and small remote queries built on `RemoteShell`.

use anyhow::Result;

use crate::application::ports::{Elevation, RemoteShell};
use crate::application::services::retry::{PollOutcome, Probe, poll};
use crate::domain::{ProvisionError, RetryPolicy, SessionError};

/// No-op command used to detect that the host accepts logins again.
pub const PROBE_COMMAND: &str = "true";

/// Kernel boot identifier; changes on every boot.
pub const BOOT_ID_COMMAND: &str = "cat /proc/sys/kernel/random/boot_id";

/// Issue [`PROBE_COMMAND`] until it succeeds.
///
/// Every failure, connectivity or remote, counts as "not yet": sshd may
/// accept the connection before the login user's session can start.
///
/// # Errors
///
/// Returns `ProvisionError::ConnectivityTimeout` once `policy` is exhausted.
pub async fn wait_online(shell: &impl RemoteShell, policy: RetryPolicy) -> Result<u32> {
    let outcome = poll(policy, "connectivity", move |attempt| async move {
        match shell.exec(PROBE_COMMAND, Elevation::Ordinary).await {
            Ok(_) => Ok(Probe::Ready(attempt)),
            Err(err) => {
                tracing::debug!(host = shell.host(), attempt, error = %err, "host not reachable yet");
                Ok(Probe::Pending(err))
            }
        }
    })
    .await?;

    match outcome {
        PollOutcome::Ready { value, .. } => Ok(value),
        PollOutcome::Exhausted {
            last,
            attempts,
            waited,
        } => {
            if let Some(err) = last {
                tracing::warn!(host = shell.host(), error = %err, "last probe failure");
            }
            Err(ProvisionError::ConnectivityTimeout {
                host: shell.host().to_string(),
                attempts,
                waited: waited.as_secs(),
            }
            .into())
        }
    }
}

/// Read the kernel boot id, trimmed.
///
/// # Errors
///
/// Returns the session error unchanged.
pub async fn read_boot_id(shell: &impl RemoteShell) -> Result<String, SessionError> {
    let output = shell.exec(BOOT_ID_COMMAND, Elevation::Ordinary).await?;
    Ok(output.stdout.trim().to_string())
}
