//! tls-bringup library
//!
//! Provisioning of a Debian-family host with nginx and a Let's Encrypt
//! certificate: package installs, a configuration backup, templated site
//! configuration, the certificate request and a renewal schedule.

pub mod backup;
pub mod cli;
pub mod console;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod process_guard;
pub mod runner;
pub mod sanity;
pub mod settings;
pub mod templater;
pub mod tool_traits;
pub mod tools;

pub use backup::{BackupError, BackupManager, FsBackup, Snapshot};
pub use console::{Confirmation, Console, Message, MessageKind, TerminalConsole};
pub use domain::{Contact, Domain};
pub use error::ProvisionError;
pub use pipeline::{ExitReason, Pipeline, RunReport, StepId};
pub use process_guard::{ChildRegistry, CommandProcessGroup, SharedRegistry};
pub use runner::{Markers, ProcessRunner, RunnerError, SystemRunner, WatchOutcome};
pub use settings::Settings;
pub use templater::{ConfigTemplater, FsTemplater, TemplateError};
pub use tool_traits::{Invocation, ToolArgs};
