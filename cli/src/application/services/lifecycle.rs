//! Lifecycle poller: wait for an instance to reach a target state.
//!
//! Imports only from `crate::domain` and `crate::application`.

use anyhow::{Context, Result};

use crate::application::ports::ComputeApi;
use crate::application::services::retry::{PollOutcome, Probe, poll};
use crate::domain::error::LifecycleStateDisplay;
use crate::domain::{InstanceRecord, LifecycleState, ProvisionError, RetryPolicy};

/// Poll `instance_id` until the provider reports `target`.
///
/// # Errors
///
/// Returns `ProvisionError::ProvisionTimeout` (with the last observed state)
/// when the budget runs out, or the provider error if a lookup fails.
pub async fn wait_for_state(
    compute: &impl ComputeApi,
    instance_id: &str,
    target: LifecycleState,
    policy: RetryPolicy,
) -> Result<InstanceRecord> {
    let outcome = poll(policy, "lifecycle", move |attempt| async move {
        let record = compute
            .get_instance(instance_id)
            .await
            .with_context(|| format!("fetching instance {instance_id}"))?;
        tracing::info!(
            instance_id,
            state = %record.state,
            attempt,
            max_attempts = policy.attempts,
            "instance state"
        );
        Ok(if record.state == target {
            Probe::Ready(record)
        } else {
            Probe::Pending(record.state)
        })
    })
    .await?;

    match outcome {
        PollOutcome::Ready { value, .. } => Ok(value),
        PollOutcome::Exhausted {
            last,
            attempts,
            waited,
        } => Err(ProvisionError::ProvisionTimeout {
            instance_id: instance_id.to_string(),
            target,
            last: LifecycleStateDisplay(last),
            attempts,
            waited: waited.as_secs(),
        }
        .into()),
    }
}
