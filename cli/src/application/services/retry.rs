//! Bounded polling primitive shared by every wait loop.
//!
//! The lifecycle poller, the address resolver, the connectivity probe and the
//! validation step all run through [`poll`]. Each caller supplies a check
//! that says "ready" or "not yet"; the primitive owns attempt counting and
//! sleeping, and hands back enough to build a diagnostic error.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::domain::RetryPolicy;

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T, S> {
    /// The condition holds; stop polling.
    Ready(T),
    /// Not yet; `S` is what was observed instead.
    Pending(S),
}

/// Terminal result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, S> {
    Ready {
        value: T,
        attempts: u32,
        waited: Duration,
    },
    Exhausted {
        /// Last pending observation.
        last: Option<S>,
        attempts: u32,
        waited: Duration,
    },
}

/// Run `check` until it returns [`Probe::Ready`] or the policy is exhausted.
///
/// The first attempt runs immediately. Between two attempts the loop sleeps
/// for exactly `policy.delay`; it never sleeps after the last attempt. An
/// `Err` from `check` aborts the loop at once and is returned as-is.
///
/// # Errors
///
/// Returns the first error produced by `check`.
pub async fn poll<T, S, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut check: F,
) -> Result<PollOutcome<T, S>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Probe<T, S>>>,
{
    let mut waited = Duration::ZERO;
    let mut last = None;

    for attempt in 1..=policy.attempts {
        match check(attempt).await? {
            Probe::Ready(value) => {
                tracing::debug!(label, attempt, ?waited, "condition met");
                return Ok(PollOutcome::Ready {
                    value,
                    attempts: attempt,
                    waited,
                });
            }
            Probe::Pending(observed) => last = Some(observed),
        }

        if let Some(delay) = policy.delay_after(attempt) {
            tracing::debug!(
                label,
                attempt,
                max_attempts = policy.attempts,
                delay_secs = delay.as_secs_f64(),
                "not ready, retrying"
            );
            tokio::time::sleep(delay).await;
            waited += delay;
        }
    }

    tracing::debug!(
        label,
        attempts = policy.attempts,
        ?waited,
        "retry budget exhausted"
    );
    Ok(PollOutcome::Exhausted {
        last,
        attempts: policy.attempts,
        waited,
    })
}
