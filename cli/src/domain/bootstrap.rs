//! Bootstrap stages and the per-stage outcome record.

use std::time::Duration;

use serde::Serialize;

/// The seven bootstrap stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upgrade,
    WaitOnline,
    Upload,
    Execute,
    SecondReboot,
    WaitOnlineAgain,
    Validate,
}

impl Stage {
    /// All stages in the order the sequencer runs them.
    pub const ALL: [Stage; 7] = [
        Stage::Upgrade,
        Stage::WaitOnline,
        Stage::Upload,
        Stage::Execute,
        Stage::SecondReboot,
        Stage::WaitOnlineAgain,
        Stage::Validate,
    ];

    /// Short human label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Upgrade => "upgrade",
            Self::WaitOnline => "wait-online",
            Self::Upload => "upload",
            Self::Execute => "execute",
            Self::SecondReboot => "second-reboot",
            Self::WaitOnlineAgain => "wait-online-again",
            Self::Validate => "validate",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Completed normally.
    Ok,
    /// Completed, but the transport dropped as expected during a reboot.
    Disconnected,
    /// Completed with a warning (e.g. the host did not actually reboot).
    Warning,
    /// Disabled by configuration.
    Skipped,
    /// Failed; the sequencer stopped here.
    Failed,
    /// Never reached because an earlier stage failed.
    NotRun,
}

/// Duration and status of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(rename = "duration_ms", serialize_with = "millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn millis<S: serde::Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Ordered record of every bootstrap stage. Reporting only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapOutcome {
    pub stages: Vec<StageReport>,
}

impl BootstrapOutcome {
    /// Record a finished (or skipped) stage.
    pub fn record(&mut self, stage: Stage, status: StageStatus, duration: Duration) {
        self.stages.push(StageReport {
            stage,
            status,
            duration,
            note: None,
        });
    }

    /// Attach a note to the most recently recorded stage.
    pub fn annotate(&mut self, note: impl Into<String>) {
        if let Some(last) = self.stages.last_mut() {
            last.note = Some(note.into());
        }
    }

    /// Mark every stage not yet recorded as `NotRun`, keeping the order.
    pub fn fill_not_run(&mut self) {
        for stage in Stage::ALL {
            if !self.stages.iter().any(|r| r.stage == stage) {
                self.record(stage, StageStatus::NotRun, Duration::ZERO);
            }
        }
    }

    /// Report for `stage`, if recorded.
    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// `true` when no recorded stage failed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.stages
            .iter()
            .all(|r| !matches!(r.status, StageStatus::Failed | StageStatus::NotRun))
    }

    /// Sum of all stage durations.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|r| r.duration).sum()
    }
}

/// Quote `value` for a POSIX shell.
#[must_use]
pub fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
