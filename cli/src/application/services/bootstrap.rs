//! Bootstrap sequencer: bring a freshly booted host into a usable state.
//!
//! Seven strictly ordered stages over one host. The only tolerated failures
//! are the transport drops caused by the reboots this sequencer requests
//! itself; everything else halts the run at the failing stage.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

use crate::application::ports::{Elevation, ProgressReporter, RemoteShell};
use crate::application::services::retry::{PollOutcome, Probe, poll};
use crate::application::services::session::{read_boot_id, wait_online};
use crate::domain::bootstrap::sh_quote;
use crate::domain::config::BootstrapConfig;
use crate::domain::{BootstrapOutcome, ProvisionError, SessionError, Stage, StageStatus};

/// Non-interactive full upgrade that ends by rebooting the host.
pub const UPGRADE_COMMAND: &str = "bash -c 'set -e; export DEBIAN_FRONTEND=noninteractive; \
     apt-get update -yq; apt-get full-upgrade -yq; apt-get autoremove -yq; apt-get clean; reboot'";

pub const REBOOT_COMMAND: &str = "reboot";

/// Output of the validation command once it reported the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub output: String,
    pub attempts: u32,
    pub waited: Duration,
}

struct StageDone {
    status: StageStatus,
    note: Option<String>,
}

impl StageDone {
    fn ok() -> Self {
        Self::with(StageStatus::Ok)
    }

    fn with(status: StageStatus) -> Self {
        Self { status, note: None }
    }

    fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Record the result of one stage, returning the error when it failed.
fn finish<T>(
    outcome: &mut BootstrapOutcome,
    stage: Stage,
    started: Instant,
    result: Result<(StageDone, T)>,
) -> Result<T> {
    let elapsed = started.elapsed();
    match result {
        Ok((done, value)) => {
            tracing::info!(
                %stage,
                status = ?done.status,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "stage finished"
            );
            outcome.record(stage, done.status, elapsed);
            if let Some(note) = done.note {
                outcome.annotate(note);
            }
            Ok(value)
        }
        Err(err) => {
            tracing::error!(%stage, error = %err, "stage failed");
            outcome.record(stage, StageStatus::Failed, elapsed);
            outcome.annotate(err.to_string());
            Err(err)
        }
    }
}

fn fatal(stage: Stage, source: SessionError) -> anyhow::Error {
    ProvisionError::RemoteCommandFailure {
        stage: stage.label().to_string(),
        source,
    }
    .into()
}

/// Run a command that ends by rebooting the host.
///
/// A dropped transport is the expected result. A non-zero remote exit is not:
/// it means the command failed before the reboot was issued.
async fn trigger_reboot(
    shell: &impl RemoteShell,
    stage: Stage,
    command: &str,
) -> Result<StageDone> {
    match shell.exec(command, Elevation::Privileged).await {
        Ok(_) => Ok(StageDone::ok()),
        Err(err) if err.is_connectivity() => {
            tracing::debug!(%stage, error = %err, "transport dropped by reboot");
            Ok(StageDone::with(StageStatus::Disconnected))
        }
        Err(err) => Err(fatal(stage, err)),
    }
}

/// Boot id before a reboot, if the host answers.
async fn boot_id_before(shell: &impl RemoteShell) -> Option<String> {
    match read_boot_id(shell).await {
        Ok(id) if !id.is_empty() => Some(id),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "boot id unavailable; reboot will not be verified");
            None
        }
    }
}

/// Wait for the host, then compare its boot id with the one read before
/// the reboot. An unchanged id is reported as a warning.
async fn come_back(
    shell: &impl RemoteShell,
    cfg: &BootstrapConfig,
    before: Option<&str>,
) -> Result<StageDone> {
    let attempts = wait_online(shell, cfg.connectivity).await?;
    let done = StageDone::ok().note(format!("online after {attempts} probe(s)"));
    let Some(before) = before else {
        return Ok(done);
    };
    match read_boot_id(shell).await {
        Ok(after) if after == before => Ok(StageDone::with(StageStatus::Warning)
            .note("host answered but did not reboot (boot id unchanged)")),
        Ok(_) => Ok(done),
        Err(err) => {
            tracing::debug!(error = %err, "boot id unavailable after reboot");
            Ok(done)
        }
    }
}

async fn validate(shell: &impl RemoteShell, cfg: &BootstrapConfig) -> Result<Validated> {
    let command = cfg.validate_command.as_str();
    let marker = cfg.validate_marker.as_str();
    let outcome = poll(cfg.validation, "validation", move |_| async move {
        Ok(match shell.exec(command, Elevation::Ordinary).await {
            Ok(out) if out.stdout.contains(marker) => Probe::Ready(out.stdout.trim().to_string()),
            Ok(out) => Probe::Pending(format!("{}{}", out.stdout, out.stderr).trim().to_string()),
            Err(err) => Probe::Pending(err.to_string()),
        })
    })
    .await?;

    match outcome {
        PollOutcome::Ready {
            value,
            attempts,
            waited,
        } => Ok(Validated {
            output: value,
            attempts,
            waited,
        }),
        PollOutcome::Exhausted {
            last,
            attempts,
            waited,
        } => Err(ProvisionError::ValidationFailure {
            command: command.to_string(),
            marker: marker.to_string(),
            attempts,
            waited: waited.as_secs(),
            last_output: last.unwrap_or_default(),
        }
        .into()),
    }
}

/// Run every stage in order, recording each into `outcome`.
///
/// Stages after the first fatal one are recorded as `NotRun`, so `outcome`
/// always lists all seven stages when this returns.
///
/// # Errors
///
/// Returns the first fatal stage error: `RemoteCommandFailure`,
/// `ConnectivityTimeout` or `ValidationFailure`.
pub async fn run_bootstrap(
    shell: &impl RemoteShell,
    cfg: &BootstrapConfig,
    reporter: &impl ProgressReporter,
    outcome: &mut BootstrapOutcome,
) -> Result<Validated> {
    let result = run_stages(shell, cfg, reporter, outcome).await;
    outcome.fill_not_run();
    result
}

async fn run_stages(
    shell: &impl RemoteShell,
    cfg: &BootstrapConfig,
    reporter: &impl ProgressReporter,
    outcome: &mut BootstrapOutcome,
) -> Result<Validated> {
    // 1. Upgrade
    reporter.step("upgrading system packages (the host will reboot)...");
    let started = Instant::now();
    let first_boot = boot_id_before(shell).await;
    let result = trigger_reboot(shell, Stage::Upgrade, UPGRADE_COMMAND).await;
    finish(outcome, Stage::Upgrade, started, result.map(|d| (d, ())))?;

    // 2. WaitOnline
    reporter.step("waiting for the host to come back...");
    let started = Instant::now();
    let result = come_back(shell, cfg, first_boot.as_deref()).await;
    let warned = warn_if_needed(reporter, result.as_ref().ok());
    finish(outcome, Stage::WaitOnline, started, result.map(|d| (d, ())))?;
    if !warned {
        reporter.success("host is back online");
    }

    // 3. Upload
    reporter.step("uploading provisioning script...");
    let started = Instant::now();
    let result = shell
        .upload(&cfg.script_path, &cfg.remote_script_path)
        .await
        .map(|()| (StageDone::ok(), ()))
        .map_err(|e| fatal(Stage::Upload, e));
    finish(outcome, Stage::Upload, started, result)?;

    // 4. Execute
    reporter.step("running provisioning script...");
    let started = Instant::now();
    let remote = sh_quote(&cfg.remote_script_path);
    let result = async {
        shell
            .exec(&format!("chmod +x {remote}"), Elevation::Ordinary)
            .await
            .map_err(|e| fatal(Stage::Execute, e))?;
        shell
            .exec(&remote, Elevation::Privileged)
            .await
            .map_err(|e| fatal(Stage::Execute, e))?;
        Ok::<_, anyhow::Error>((StageDone::ok(), ()))
    }
    .await;
    finish(outcome, Stage::Execute, started, result)?;
    reporter.success("provisioning script completed");

    // 5. SecondReboot
    let started = Instant::now();
    let second_boot = if cfg.second_reboot {
        reporter.step("rebooting...");
        let before = boot_id_before(shell).await;
        let result = trigger_reboot(shell, Stage::SecondReboot, REBOOT_COMMAND).await;
        finish(outcome, Stage::SecondReboot, started, result.map(|d| (d, ())))?;
        before
    } else {
        let done = StageDone::with(StageStatus::Skipped).note("disabled by configuration");
        finish(outcome, Stage::SecondReboot, started, Ok((done, ())))?;
        None
    };

    // 6. WaitOnlineAgain
    reporter.step("waiting for the host to come back...");
    let started = Instant::now();
    let result = come_back(shell, cfg, second_boot.as_deref()).await;
    let warned = warn_if_needed(reporter, result.as_ref().ok());
    finish(outcome, Stage::WaitOnlineAgain, started, result.map(|d| (d, ())))?;
    if !warned {
        reporter.success("host is online");
    }

    // 7. Validate
    reporter.step(&format!("validating with `{}`...", cfg.validate_command));
    let started = Instant::now();
    let result = validate(shell, cfg).await;
    let validated = finish(
        outcome,
        Stage::Validate,
        started,
        result.map(|v| {
            let note = format!("{} (attempt {})", v.output, v.attempts);
            (StageDone::ok().note(note), v)
        }),
    )?;
    reporter.success(&validated.output);
    Ok(validated)
}

fn warn_if_needed(reporter: &impl ProgressReporter, done: Option<&StageDone>) -> bool {
    match done {
        Some(StageDone {
            status: StageStatus::Warning,
            note: Some(note),
        }) => {
            reporter.warn(note);
            true
        }
        _ => false,
    }
}
