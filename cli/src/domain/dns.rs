//! Published DNS name for the provisioned instance.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // compile-time constant pattern
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").expect("valid regex")
});

/// An A record pointing `name` at `address`. Written once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedName {
    pub name: String,
    pub address: String,
    /// Time-to-live in seconds; `1` lets the provider choose.
    pub ttl: u32,
    pub proxied: bool,
}

/// Build the record name `<label>.<domain>`.
///
/// # Errors
///
/// Returns an error if the result is not a valid lowercase hostname.
pub fn record_name(label: &str, domain: &str) -> Result<String> {
    let name = format!(
        "{}.{}",
        label.trim().to_ascii_lowercase(),
        domain.trim().trim_end_matches('.').to_ascii_lowercase()
    );
    anyhow::ensure!(HOSTNAME_RE.is_match(&name), "invalid DNS name: {name}");
    Ok(name)
}
