//! Address resolver: wait for a public address on the instance's first VNIC.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::ComputeApi;
use crate::application::services::retry::{PollOutcome, Probe, poll};
use crate::domain::RetryPolicy;

/// Why an attempt did not yield an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPending {
    /// No VNIC attachment listed yet.
    NoAttachment,
    /// The attachment exists but has no VNIC id yet.
    AttachmentPending,
    /// The VNIC exists but has no public address.
    NoPublicIp,
}

/// Result of resolving an instance's public address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    /// Budget exhausted. Whether this is fatal is up to the caller.
    NotFound {
        last: Option<AddressPending>,
        attempts: u32,
        waited: Duration,
    },
}

/// Enumerate attachments, fetch the first one's VNIC and read its public
/// address, retrying the whole sequence under `policy`.
///
/// # Errors
///
/// Returns the provider error if a listing or lookup fails.
pub async fn resolve_public_ip(
    compute: &impl ComputeApi,
    instance_id: &str,
    policy: RetryPolicy,
) -> Result<Resolution> {
    let outcome = poll(policy, "address", move |_| async move {
        let attachments = compute
            .list_vnic_attachments(instance_id)
            .await
            .with_context(|| format!("listing VNIC attachments of {instance_id}"))?;
        let Some(attachment) = attachments.first() else {
            return Ok(Probe::Pending(AddressPending::NoAttachment));
        };
        let Some(vnic_id) = attachment.vnic_id.as_deref() else {
            return Ok(Probe::Pending(AddressPending::AttachmentPending));
        };
        let vnic = compute
            .get_vnic(vnic_id)
            .await
            .with_context(|| format!("fetching VNIC {vnic_id}"))?;
        Ok(match vnic.public_ip.filter(|ip| !ip.is_empty()) {
            Some(ip) => Probe::Ready(ip),
            None => Probe::Pending(AddressPending::NoPublicIp),
        })
    })
    .await?;

    Ok(match outcome {
        PollOutcome::Ready { value, .. } => Resolution::Found(value),
        PollOutcome::Exhausted {
            last,
            attempts,
            waited,
        } => {
            tracing::warn!(instance_id, attempts, ?last, "no public address");
            Resolution::NotFound {
                last,
                attempts,
                waited,
            }
        }
    })
}
