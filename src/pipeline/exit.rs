//! Reserved process exit codes, one per abort point.

use strum::{Display, EnumIter};

/// Why a run ended. Every failure point has its own code; 0 is full success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum ExitReason {
    #[strum(serialize = "completed")]
    Completed = 0,
    #[strum(serialize = "HOME is not set")]
    MissingHome = 1,
    #[strum(serialize = "operator did not confirm")]
    NotConfirmed = 2,
    #[strum(serialize = "no domain given")]
    DomainCancelled = 3,
    #[strum(serialize = "no contact e-mail given")]
    ContactCancelled = 4,
    #[strum(serialize = "package index update failed")]
    PackageIndexFailed = 5,
    #[strum(serialize = "web server install failed")]
    WebServerInstallFailed = 6,
    #[strum(serialize = "certificate tool install failed")]
    CertificateToolInstallFailed = 7,
    #[strum(serialize = "configuration backup failed")]
    BackupFailed = 8,
    #[strum(serialize = "challenge configuration failed")]
    ChallengeConfigFailed = 9,
    #[strum(serialize = "challenge configuration test failed")]
    ChallengeConfigTestFailed = 10,
    #[strum(serialize = "server reload for challenge failed")]
    ChallengeReloadFailed = 11,
    #[strum(serialize = "certificate request failed")]
    CertificateRequestFailed = 12,
    #[strum(serialize = "DH parameter generation failed")]
    DhparamFailed = 13,
    #[strum(serialize = "SSL snippet generation failed")]
    SslSnippetsFailed = 14,
    #[strum(serialize = "final configuration failed")]
    FinalConfigFailed = 15,
    #[strum(serialize = "final configuration test failed")]
    FinalConfigTestFailed = 16,
    #[strum(serialize = "server reload with TLS failed")]
    FinalReloadFailed = 17,
    /// Reserved for the soft renewal step; never returned
    #[strum(serialize = "renewal schedule failed")]
    RenewalScheduleFailed = 18,
    /// Reserved for the soft scheduler reload; never returned
    #[strum(serialize = "scheduler reload failed")]
    SchedulerReloadFailed = 19,
    #[strum(serialize = "preflight checks failed")]
    PreflightFailed = 20,
    #[strum(serialize = "settings could not be loaded")]
    SettingsInvalid = 21,
}

impl ExitReason {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<ExitReason> for std::process::ExitCode {
    fn from(reason: ExitReason) -> Self {
        std::process::ExitCode::from(reason.code())
    }
}
