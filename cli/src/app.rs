//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags; command handlers take
//! `&AppContext` instead of loose output and configuration parameters.

use std::path::PathBuf;

use anyhow::Result;

use crate::infra::config::TomlConfigStore;
use crate::output::OutputContext;
use crate::output::human::HumanRenderer;
use crate::output::reporter::TerminalReporter;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
    /// `-v` count.
    pub verbose: u8,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `HOSTKIT_YES` env vars).
    pub yes: bool,
    /// Explicit configuration file from `--config` / `HOSTKIT_CONFIG`.
    pub config: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Where `config.toml` is loaded from.
    pub config_store: TomlConfigStore,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `HOSTKIT_YES`
    /// environment variables are present.
    pub non_interactive: bool,
    /// Verbosity from `-v`; `doctor` prints error details when non-zero.
    pub verbose: u8,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var_os("CI").is_some() || std::env::var_os("HOSTKIT_YES").is_some();
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config_store: TomlConfigStore::new(flags.behaviour.config),
            non_interactive: flags.behaviour.yes || ci_env,
            verbose: flags.output.verbose,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn human(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    /// Progress reporter for long-running commands. In JSON mode progress
    /// goes to stderr so stdout carries only the JSON document.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        match self.mode {
            OutputMode::Human => TerminalReporter::new(&self.output),
            OutputMode::Json => TerminalReporter::stderr(&self.output),
        }
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `HOSTKIT_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
