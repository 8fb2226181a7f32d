//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Idempotent SSH provisioning for single-host web stacks
#[derive(Parser)]
#[command(
    name = "hostkit",
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

    /// Skip confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Configuration file (default: nearest config.toml)
    #[arg(long, global = true, env = "HOSTKIT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision the configured host with a playbook
    Deploy(commands::deploy::DeployArgs),

    /// Check local tools, configuration and remote reachability
    Doctor(commands::doctor::DoctorArgs),

    /// Run a command on the configured host
    Exec(commands::exec::ExecArgs),

    /// List playbooks and their phases
    Playbooks,

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            config,
            verbose,
            command,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
                verbose,
            },
            behaviour: BehaviourFlags { yes, config },
        });

        match command {
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::Doctor(args) => commands::doctor::run(&app, &args).await,
            Command::Exec(args) => commands::exec::run(&app, &args).await,
            Command::Playbooks => commands::playbooks::run(&app),
            Command::Config(cmd) => commands::config::run(&app, &cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
