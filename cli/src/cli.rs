//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Provision and bootstrap a single cloud instance
#[derive(Parser)]
#[command(
    name = "zapbox",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Config file (default: ~/.zapbox/config.yaml)
    #[arg(long, global = true, env = "ZAPBOX_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Launch an instance, publish its address and bootstrap it
    Provision(commands::provision::ProvisionArgs),

    /// List catalog images matching the configured filter
    Images,

    /// Run the bootstrap stages against an existing host
    Bootstrap(commands::bootstrap::BootstrapArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
            verbose: _,
            command,
        } = self;
        let yes = matches!(&command, Command::Provision(args) if args.yes);
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes, config },
        });

        match command {
            Command::Provision(args) => commands::provision::run(&args, &app).await,
            Command::Images => commands::images::run(&app).await,
            Command::Bootstrap(args) => commands::bootstrap::run(&args, &app).await,
            Command::Version => commands::version::run(&app),
        }
    }
}
