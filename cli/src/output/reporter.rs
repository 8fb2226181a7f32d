//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` so application services can emit progress events
//! without depending on any presentation type directly.

use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` prints `"  → {message}"`
/// - `success()` prints `"  ✓ {message}"`
/// - `warn()` prints `"  ! {message}"`
/// - `remote_output()` prints each line dimmed behind a `│` gutter
///
/// Everything is suppressed when `ctx.quiet`. With `to_stderr` the
/// reporter writes to stderr, leaving stdout to a JSON document.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    to_stderr: bool,
}

impl<'a> TerminalReporter<'a> {
    /// Create a reporter writing to stdout.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            to_stderr: false,
        }
    }

    /// Create a reporter writing to stderr.
    #[must_use]
    pub fn stderr(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            to_stderr: true,
        }
    }

    fn emit(&self, line: &str) {
        if self.ctx.quiet {
            return;
        }
        if self.to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.emit(&format!("  {} {message}", "→".style(self.ctx.styles.step)));
    }

    fn success(&self, message: &str) {
        self.emit(&format!("  {} {message}", "✓".style(self.ctx.styles.success)));
    }

    fn warn(&self, message: &str) {
        self.emit(&format!("  {} {message}", "!".style(self.ctx.styles.warning)));
    }

    fn remote_output(&self, text: &str) {
        for line in text.lines() {
            self.emit(&format!(
                "    {} {}",
                "│".style(self.ctx.styles.dim),
                line.style(self.ctx.styles.dim)
            ));
        }
    }
}
