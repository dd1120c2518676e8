//! Zapbox CLI - provision and bootstrap a single cloud instance

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zapbox_cli::cli::Cli;
use zapbox_cli::domain::ProvisionError;
use zapbox_cli::output::json::format_error;

fn init_tracing(verbose: bool) {
    let default = if verbose { "zapbox_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;
    if let Err(e) = cli.run().await {
        let kind = e.downcast_ref::<ProvisionError>();
        let code = kind.map_or(1, ProvisionError::exit_code);
        if json {
            let tag = kind.map_or("error", ProvisionError::code);
            match format_error(&format!("{e:#}"), tag) {
                Ok(obj) => eprintln!("{obj}"),
                Err(_) => eprintln!("Error: {e:#}"),
            }
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(code);
    }
}
