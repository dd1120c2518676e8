//! `zapbox bootstrap <HOST>`: run only the bootstrap stages against an
//! existing host, e.g. after a failed `zapbox provision`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::SessionFactory;
use crate::application::services::bootstrap::run_bootstrap;
use crate::domain::BootstrapOutcome;
use crate::infra::config::fingerprint_script;
use crate::infra::ssh::OpenSshFactory;

/// Arguments for the bootstrap command.
#[derive(Args)]
pub struct BootstrapArgs {
    /// Public address or hostname of the instance
    pub host: String,

    /// Provisioning script to upload and run (overrides `script` in the config)
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Do not reboot after the provisioning script
    #[arg(long)]
    pub no_second_reboot: bool,
}

/// Run `zapbox bootstrap`.
///
/// # Errors
///
/// Returns the first fatal stage error, or `ConfigurationMissing` if the
/// script does not exist.
pub async fn run(args: &BootstrapArgs, app: &AppContext) -> Result<()> {
    let mut raw = app.load_config()?;
    if let Some(script) = &args.script {
        raw.script = Some(script.clone());
    }
    if args.no_second_reboot {
        raw.second_reboot = Some(false);
    }
    let ssh = raw.validate_ssh(dirs::home_dir().as_deref());
    let cfg = raw.validate_bootstrap();
    let sha = fingerprint_script(&cfg.script_path)?;
    app.output.kv("Script:", &format!("{} ({sha})", cfg.script_path.display()));

    let sessions = OpenSshFactory::new(app.runner(), ssh);
    let session = sessions.open(&args.host);
    let mut outcome = BootstrapOutcome::default();
    let result = {
        let reporter = app.terminal_reporter();
        let result = run_bootstrap(&session, &cfg, &reporter, &mut outcome).await;
        reporter.abandon();
        result
    };

    app.renderer().render_bootstrap(&outcome)?;
    result.map(|_| ())
}
