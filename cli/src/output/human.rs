//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::domain::health::{DoctorReport, SSH_MIN_VERSION, RSYNC_MIN_VERSION, ToolCheck};
use crate::domain::playbook::PlaybookKind;
use crate::domain::summary::{RunSummary, StepRecord};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("hostkit v{version}"));
    }

    /// Render the playbook catalogue.
    pub fn render_playbooks(&self) {
        if self.ctx.quiet {
            return;
        }
        println!();
        for kind in PlaybookKind::ALL {
            println!(
                "  {:<12} {}",
                kind.name().style(self.ctx.styles.bold),
                kind.description()
            );
            println!(
                "  {:<12} {}",
                "",
                format!("phases: {}", kind.phases().join(", ")).style(self.ctx.styles.dim)
            );
        }
        println!();
    }

    /// Render flattened configuration entries.
    pub fn render_config(&self, entries: &[(String, String)], path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;
        for (key, value) in entries {
            println!("  {:<width$} {}", format!("{key}:"), value, width = width + 1);
        }
        println!();
    }

    /// Render doctor results.
    pub fn render_doctor(&self, report: &DoctorReport, verbose: bool) {
        println!();
        println!("  {}", "hostkit health check".style(self.ctx.styles.header));
        println!();

        println!("  Local tools:");
        self.print_tool(&report.local.ssh, &SSH_MIN_VERSION.to_string());
        self.print_tool(&report.local.rsync, &RSYNC_MIN_VERSION.to_string());
        println!();

        println!("  Configuration:");
        if report.local.missing_keys.is_empty() {
            self.print_check(true, "required keys present");
        }
        for key in &report.local.missing_keys {
            self.print_check(false, &format!("missing key '{key}'"));
        }
        println!();

        println!("  Remote:");
        match &report.remote {
            None => self.print_check(false, "not checked (remote/user missing)"),
            Some(remote) if remote.reachable => {
                self.print_check(true, &format!("{} reachable", remote.host));
                if let Some(os) = &remote.distribution {
                    println!("      {}", os.style(self.ctx.styles.dim));
                }
            }
            Some(remote) => {
                self.print_check(false, &format!("{} unreachable", remote.host));
                if verbose && let Some(error) = &remote.error {
                    println!("      {}", error.style(self.ctx.styles.dim));
                }
            }
        }

        println!();
        if report.is_healthy() {
            println!(
                "  {} Everything looks good!",
                "\u{2713}".style(self.ctx.styles.success)
            );
        } else {
            let issues = report.local.issues().len()
                + usize::from(report.remote.as_ref().is_none_or(|r| !r.reachable));
            let hint = if verbose {
                ""
            } else {
                " Run with -v for details."
            };
            println!(
                "  {} Found {issues} issue(s).{hint}",
                "\u{2717}".style(self.ctx.styles.error),
            );
        }
        println!();
    }

    /// Render the end-of-run summary.
    pub fn render_summary(&self, summary: &RunSummary) {
        if self.ctx.quiet {
            return;
        }
        let tally = summary.tally();
        println!();
        println!(
            "  {}",
            format!("{} on {}", summary.playbook, summary.host).style(self.ctx.styles.header)
        );
        self.ctx.kv("Phases:", &summary.phases.join(", "));
        self.ctx.kv(
            "Steps:",
            &format!(
                "{} applied, {} already satisfied, {} failed",
                tally.applied, tally.already_satisfied, tally.failed
            ),
        );
        for record in &summary.records {
            if let StepRecord::Wait { name, result } = record {
                self.ctx.kv(
                    "Wait:",
                    &format!("{name}: {}", format_wait(result.is_ready(), result.attempts())),
                );
            }
        }
        if let Some(finished) = summary.finished_at {
            let secs = (finished - summary.started_at).num_seconds().max(0);
            self.ctx.kv("Duration:", &format_duration(secs.unsigned_abs()));
        }
        for warning in &summary.warnings {
            self.ctx.warn(warning);
        }
        println!();
    }

    fn print_tool(&self, tool: &ToolCheck, min: &str) {
        if !tool.found {
            self.print_check(false, &format!("{} not found", tool.name));
            return;
        }
        let version = tool.version.as_deref().unwrap_or("unknown version");
        self.print_check(
            tool.version_ok,
            &format!("{} {version} (need \u{2265} {min})", tool.name),
        );
    }

    fn print_check(&self, ok: bool, msg: &str) {
        if ok {
            println!("    {} {msg}", "\u{2713}".style(self.ctx.styles.success));
        } else {
            println!("    {} {msg}", "\u{2717}".style(self.ctx.styles.error));
        }
    }
}

// ── Display helpers (used by tests and output layer) ─────────────────────────

#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[must_use]
pub fn format_wait(ready: bool, attempts: u32) -> String {
    if ready {
        format!("ready after {attempts} attempt(s)")
    } else {
        format!("timed out after {attempts} attempt(s)")
    }
}
