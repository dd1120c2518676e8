//! `zapbox provision`: launch, wait, resolve, publish and bootstrap one instance.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::provision::provision;
use crate::domain::ProvisionReport;
use crate::infra::cloudflare::CloudflareDns;
use crate::infra::config::load_local_inputs;
use crate::infra::oci::OciCli;
use crate::infra::ssh::OpenSshFactory;
use crate::output::OutputContext;

/// Arguments for the provision command.
#[derive(Args, Default)]
pub struct ProvisionArgs {
    /// Provisioning script to upload and run (overrides `script` in the config)
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Do not publish a DNS record, even if `dns_domain` is configured
    #[arg(long)]
    pub skip_dns: bool,

    /// Do not reboot after the provisioning script
    #[arg(long)]
    pub no_second_reboot: bool,

    /// Skip the launch confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Run `zapbox provision`.
///
/// Configuration and local files are checked before the first provider
/// call. The report is rendered whether the run succeeds or not.
///
/// # Errors
///
/// Returns the first unrecovered `ProvisionError` (or provider error).
pub async fn run(args: &ProvisionArgs, app: &AppContext) -> Result<()> {
    let mut raw = app.load_config()?;
    if let Some(script) = &args.script {
        raw.script = Some(script.clone());
    }
    if args.no_second_reboot {
        raw.second_reboot = Some(false);
    }
    let cfg = raw.validate_provision(dirs::home_dir().as_deref(), args.skip_dns)?;
    let inputs = load_local_inputs(&cfg.ssh, &cfg.bootstrap)?;

    print_plan(
        &app.output,
        &cfg.cloud.display_name,
        &cfg.cloud.shape,
        cfg.dns.as_ref().map(|d| d.record_name.as_str()),
    );
    let consented = args.yes
        || app.non_interactive
        || app.confirm("Launch this instance? It will be billed.", false)?;
    if !consented {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let runner = app.runner();
    let cloud = OciCli::for_cloud(runner.clone(), &cfg.cloud);
    let sessions = OpenSshFactory::new(runner, cfg.ssh.clone());
    let publisher = cfg.dns.as_ref().map(CloudflareDns::new).transpose()?;

    let mut report = ProvisionReport::new(chrono::Utc::now());
    let result = {
        let reporter = app.terminal_reporter();
        let result = provision(
            &cloud,
            &sessions,
            publisher.as_ref(),
            &cfg,
            &inputs,
            &reporter,
            &mut report,
        )
        .await;
        reporter.abandon();
        result
    };

    if let Err(err) = &result {
        tracing::error!(error = %err, "provisioning stopped");
        if let Some(id) = &report.instance_id {
            app.output
                .warn(&format!("Instance {id} was left running; terminate it if unwanted."));
        }
    }
    app.renderer().render_report(&report, result.is_ok())?;
    if result.is_ok() {
        app.output.success("Instance ready.");
    }
    result
}

fn print_plan(ctx: &OutputContext, name: &str, shape: &str, dns: Option<&str>) {
    if ctx.quiet {
        return;
    }
    ctx.header("Launching:");
    ctx.kv("Name: ", name);
    ctx.kv("Shape:", shape);
    ctx.kv("DNS:  ", dns.unwrap_or("-"));
    println!();
}
