//! Domain layer: pure provisioning types, validation and text transforms.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod edit;
pub mod error;
pub mod health;
pub mod playbook;
pub mod poll;
pub mod remote;
pub mod shell;
pub mod ssh;
pub mod step;
pub mod summary;
pub mod template;

pub use config::{ConfigSupplier, DeployConfig};
pub use error::{
    ConfigError, EditError, PrerequisiteError, SessionError, StepError, TemplateError,
};
pub use playbook::PlaybookKind;
pub use poll::{PollResult, PollSpec};
pub use remote::{RemoteCommandResult, RunOptions, WriteMode};
pub use step::{Action, Probe, Step, StepOutcome};
pub use summary::RunSummary;
