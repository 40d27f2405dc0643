//! Error handling module for tls-bringup
//!
//! Component errors (`TemplateError`, `BackupError`, `RunnerError`) live next to
//! their components; this module holds the pipeline-level error they fold into.
//! Operator cancellations and environment problems are not errors here: the
//! pipeline maps them straight to an `ExitReason`.

use thiserror::Error;

use crate::backup::BackupError;
use crate::runner::RunnerError;
use crate::templater::TemplateError;

/// Main error type for the provisioning pipeline
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// An external tool exited non-zero or reported a failure marker
    #[error("External tool failed: {0}")]
    ExternalTool(String),

    /// Template rendering or writing failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Snapshot of the server configuration failed
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// An external tool could not be started or watched
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create an external tool failure
    pub fn external_tool(msg: impl Into<String>) -> Self {
        Self::ExternalTool(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProvisionError::external_tool("apt-get update exited with 100");
        assert_eq!(
            err.to_string(),
            "External tool failed: apt-get update exited with 100"
        );
    }

    #[test]
    fn test_component_error_conversion() {
        let err: ProvisionError = TemplateError::PlaceholderOutOfRange { index: 3, available: 1 }.into();
        assert!(matches!(err, ProvisionError::Template(_)));
        assert!(err.to_string().contains("{3}"));

        let err: ProvisionError = BackupError::Declined.into();
        assert!(matches!(err, ProvisionError::Backup(_)));

        let err: ProvisionError = RunnerError::Capture {
            program: "nginx".to_string(),
        }
        .into();
        assert!(err.to_string().contains("nginx"));
    }
}
