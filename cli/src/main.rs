//! hostkit - idempotent SSH provisioning for single-host web stacks

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostkit_cli::cli::Cli;
use hostkit_cli::output::json;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if json_mode {
                match json::format_error(&format!("{e:#}"), json::error_code(&e)) {
                    Ok(doc) => println!("{doc}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "hostkit_cli=info",
        2 => "hostkit_cli=debug",
        _ => "hostkit_cli=trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}
