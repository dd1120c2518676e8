//! Human-readable terminal renderer.

use std::time::Duration;

use owo_colors::OwoColorize as _;

use crate::domain::{BootstrapOutcome, ImageSummary, ProvisionReport, StageReport, StageStatus};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("zapbox {version}");
    }

    /// Render the run report. Printed after failures too, so every field
    /// the run never reached is shown as `-`.
    pub fn render_report(&self, report: &ProvisionReport) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header("Run report:");
        for (key, value) in report_rows(report) {
            self.ctx.kv(key, &value);
        }
        if !report.bootstrap.stages.is_empty() {
            self.render_bootstrap(&report.bootstrap);
        }
    }

    /// Render one line per bootstrap stage and the total.
    pub fn render_bootstrap(&self, outcome: &BootstrapOutcome) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header("Bootstrap:");
        for line in self.stage_lines(outcome) {
            println!("    {line}");
        }
        self.ctx
            .kv("  Total:", &format_duration(outcome.total()));
    }

    /// Render a catalog listing, newest first.
    pub fn render_images(&self, images: &[ImageSummary]) {
        if images.is_empty() {
            self.ctx.warn("No matching images found.");
            return;
        }
        for image in images {
            println!(
                "  {}  {}",
                image.display_name.style(self.ctx.styles.bold),
                image.id.style(self.ctx.styles.dim)
            );
        }
    }

    /// One marked line per recorded stage, in execution order.
    #[must_use]
    pub fn stage_lines(&self, outcome: &BootstrapOutcome) -> Vec<String> {
        outcome
            .stages
            .iter()
            .map(|stage| format!("{} {}", self.marker(stage.status), format_stage_line(stage)))
            .collect()
    }

    fn marker(&self, status: StageStatus) -> String {
        let s = &self.ctx.styles;
        match status {
            StageStatus::Ok | StageStatus::Disconnected => "✓".style(s.success).to_string(),
            StageStatus::Warning => "⚠".style(s.warning).to_string(),
            StageStatus::Failed => "✗".style(s.error).to_string(),
            StageStatus::Skipped | StageStatus::NotRun => "·".style(s.dim).to_string(),
        }
    }
}

/// Key/value rows of the run report; fields the run never reached show `-`.
#[must_use]
pub fn report_rows(report: &ProvisionReport) -> Vec<(&'static str, String)> {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    vec![
        ("Started:       ", report.started_at.to_rfc3339()),
        ("Zone:          ", show(&report.availability_domain)),
        ("Image:         ", show(&report.image_id)),
        ("Instance:      ", show(&report.instance_id)),
        ("Public IP:     ", show(&report.public_ip)),
        ("DNS name:      ", show(&report.dns_name)),
        ("Script sha256: ", show(&report.script_sha256)),
    ]
}

/// `"upgrade            1m 05s  disconnected"`, plus the note if any.
#[must_use]
pub fn format_stage_line(report: &StageReport) -> String {
    let mut line = format!(
        "{:<18} {:>8}  {}",
        report.stage.label(),
        format_duration(report.duration),
        status_display(report.status)
    );
    if let Some(note) = &report.note {
        line.push_str(&format!("  ({note})"));
    }
    line
}

#[must_use]
pub fn status_display(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Ok => "ok",
        StageStatus::Disconnected => "disconnected",
        StageStatus::Warning => "warning",
        StageStatus::Skipped => "skipped",
        StageStatus::Failed => "failed",
        StageStatus::NotRun => "not run",
    }
}

/// Format a duration as `"Xm YYs"` from one minute up, otherwise `"X.Ys"`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
