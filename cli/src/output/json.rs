//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails, and the machine-readable renderer for command results.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{BootstrapOutcome, ImageSummary, ProvisionReport};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

#[derive(Serialize)]
struct ReportEnvelope<'a> {
    success: bool,
    #[serde(flatten)]
    report: &'a ProvisionReport,
}

/// Renders command results as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        let out = serde_json::to_string_pretty(&serde_json::json!({ "version": version }))
            .context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_report(report: &ProvisionReport, success: bool) -> Result<()> {
        println!("{}", format_report(report, success)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_bootstrap(outcome: &BootstrapOutcome) -> Result<()> {
        println!("{}", format_bootstrap(outcome)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_images(images: &[ImageSummary]) -> Result<()> {
        let out = serde_json::to_string_pretty(&serde_json::json!({ "images": images }))
            .context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }
}

/// The report with a top-level `success` flag.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn format_report(report: &ProvisionReport, success: bool) -> Result<String> {
    serde_json::to_string_pretty(&ReportEnvelope { success, report })
        .context("JSON serialization failed")
}

/// A standalone bootstrap outcome; `success` is false once any stage failed.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn format_bootstrap(outcome: &BootstrapOutcome) -> Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "success": outcome.succeeded(),
        "bootstrap": outcome,
    }))
    .context("JSON serialization failed")
}
