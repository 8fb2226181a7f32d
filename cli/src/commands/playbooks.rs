//! `hostkit playbooks`: list the playbook catalogue.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use crate::app::AppContext;
use crate::domain::playbook::PlaybookKind;
use crate::output::json;

#[derive(Serialize)]
struct PlaybookEntry {
    name: PlaybookKind,
    description: &'static str,
    phases: &'static [&'static str],
    required_keys: &'static [&'static str],
}

/// Run the playbooks command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    if app.is_json() {
        let entries: Vec<_> = PlaybookKind::ALL
            .into_iter()
            .map(|kind| PlaybookEntry {
                name: kind,
                description: kind.description(),
                phases: kind.phases(),
                required_keys: kind.required_keys(),
            })
            .collect();
        println!(
            "{}",
            json::format_value(&serde_json::json!({ "playbooks": entries }))?
        );
    } else {
        app.human().render_playbooks();
    }
    Ok(ExitCode::SUCCESS)
}
