//! Record of one provisioning run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::poll::PollResult;
use crate::domain::step::StepOutcome;

/// One recorded idempotent step or wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRecord {
    Step { name: String, outcome: StepOutcome },
    Wait { name: String, result: PollResult },
}

/// Everything a run did, in order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub playbook: String,
    pub host: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub phases: Vec<String>,
    pub records: Vec<StepRecord>,
    pub warnings: Vec<String>,
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub applied: usize,
    pub already_satisfied: usize,
    pub failed: usize,
    pub waits_timed_out: usize,
}

impl RunSummary {
    #[must_use]
    pub fn new(playbook: &str, host: &str) -> Self {
        Self {
            playbook: playbook.to_string(),
            host: host.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            phases: Vec::new(),
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_step(&mut self, name: &str, outcome: StepOutcome) {
        self.records.push(StepRecord::Step {
            name: name.to_string(),
            outcome,
        });
    }

    pub fn record_wait(&mut self, name: &str, result: PollResult) {
        self.records.push(StepRecord::Wait {
            name: name.to_string(),
            result,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for record in &self.records {
            match record {
                StepRecord::Step { outcome, .. } => match outcome {
                    StepOutcome::Applied => tally.applied += 1,
                    StepOutcome::AlreadySatisfied => tally.already_satisfied += 1,
                    StepOutcome::Failed { .. } => tally.failed += 1,
                },
                StepRecord::Wait { result, .. } => {
                    if !result.is_ready() {
                        tally.waits_timed_out += 1;
                    }
                }
            }
        }
        tally
    }
}
