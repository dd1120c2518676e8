//! Bounded retry policy shared by every polling loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum attempts and the fixed delay between two consecutive attempts.
///
/// The first attempt is always immediate. A loop that never succeeds makes
/// exactly `attempts` attempts and sleeps exactly `(attempts - 1) * delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRetryPolicy")]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least 1).
    pub attempts: u32,
    /// Delay between attempts, in seconds.
    #[serde(rename = "delay_secs", with = "secs")]
    pub delay: Duration,
}

/// Wire shape of a policy; converted through `RetryPolicy::new`.
#[derive(Deserialize)]
struct RawRetryPolicy {
    attempts: u32,
    #[serde(rename = "delay_secs", with = "secs")]
    delay: Duration,
}

impl From<RawRetryPolicy> for RetryPolicy {
    fn from(raw: RawRetryPolicy) -> Self {
        Self::new(raw.attempts, raw.delay)
    }
}

impl RetryPolicy {
    /// Build a policy; an attempt count of zero is raised to one.
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            delay,
        }
    }

    /// Delay to sleep after the failed attempt number `attempt` (1-based),
    /// or `None` when that was the last attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.attempts).then_some(self.delay)
    }

    /// Total time slept when every attempt fails.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.delay.saturating_mul(self.attempts.saturating_sub(1))
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
