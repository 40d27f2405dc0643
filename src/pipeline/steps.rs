//! The provisioning step table.
//!
//! Order matters: each step is a prerequisite for the next. The certificate
//! request needs a running server answering the HTTP challenge, and the
//! final configuration needs the certificate and the snippets on disk, so
//! it is validated and reloaded a second time.

use super::exit::ExitReason;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum StepId {
    UpdatePackageIndex,
    InstallWebServer,
    InstallCertificateTool,
    BackupConfig,
    WriteChallengeConfig,
    TestChallengeConfig,
    ReloadForChallenge,
    RequestCertificate,
    GenerateDhparam,
    WriteSslSnippets,
    WriteFinalConfig,
    TestFinalConfig,
    ReloadWithTls,
    ScheduleRenewal,
    ReloadScheduler,
}

/// External commands a step can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    UpdateIndex,
    InstallWebServer,
    InstallCertificateTool,
    TestConfig,
    RestartWebServer,
    RequestCertificate,
    GenerateDhparam,
    RestartScheduler,
}

/// Files generated from templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    ChallengeSite,
    SslDomainSnippet,
    SslParamsSnippet,
    FinalSite,
    RenewalSchedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Run and trust the exit status
    Invoke(Tool),
    /// Run and resolve on output markers
    Watch(Tool),
    Template(&'static [Artifact]),
    Backup,
    /// Write the renewal schedule file
    Schedule,
}

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub id: StepId,
    pub label: &'static str,
    pub action: StepAction,
    pub exit: ExitReason,
    /// Failure is reported but the run continues
    pub soft_fail: bool,
    pub failure: &'static str,
    pub done: Option<&'static str>,
}

const fn hard(
    id: StepId,
    label: &'static str,
    action: StepAction,
    exit: ExitReason,
    failure: &'static str,
    done: Option<&'static str>,
) -> Step {
    Step {
        id,
        label,
        action,
        exit,
        soft_fail: false,
        failure,
        done,
    }
}

pub const STEPS: &[Step] = &[
    hard(
        StepId::UpdatePackageIndex,
        "Running apt-get update...",
        StepAction::Invoke(Tool::UpdateIndex),
        ExitReason::PackageIndexFailed,
        "Failed to run apt-get update command! Do you run this configurator as root?",
        Some("apt-get update command finished!"),
    ),
    hard(
        StepId::InstallWebServer,
        "Installing nginx...",
        StepAction::Invoke(Tool::InstallWebServer),
        ExitReason::WebServerInstallFailed,
        "Failed to install nginx package! Do you run this configurator as root?",
        Some("nginx package installed!"),
    ),
    hard(
        StepId::InstallCertificateTool,
        "Installing Let's Encrypt...",
        StepAction::Invoke(Tool::InstallCertificateTool),
        ExitReason::CertificateToolInstallFailed,
        "Failed to install Let's Encrypt package! Do you run this configurator as root?",
        Some("Let's Encrypt package installed!"),
    ),
    hard(
        StepId::BackupConfig,
        "Backing up nginx configuration...",
        StepAction::Backup,
        ExitReason::BackupFailed,
        "Failed to back up nginx configuration!",
        None,
    ),
    hard(
        StepId::WriteChallengeConfig,
        "Creating nginx sites-available configuration...",
        StepAction::Template(&[Artifact::ChallengeSite]),
        ExitReason::ChallengeConfigFailed,
        "Failed to create nginx sites-available configuration!",
        Some("Configuration file created!"),
    ),
    hard(
        StepId::TestChallengeConfig,
        "Checking nginx configuration...",
        StepAction::Watch(Tool::TestConfig),
        ExitReason::ChallengeConfigTestFailed,
        "Failed nginx configuration checker test!",
        Some("nginx configuration checker test is passed!"),
    ),
    hard(
        StepId::ReloadForChallenge,
        "Restarting nginx...",
        StepAction::Invoke(Tool::RestartWebServer),
        ExitReason::ChallengeReloadFailed,
        "Failed to restart nginx service!",
        Some("nginx restarted!"),
    ),
    hard(
        StepId::RequestCertificate,
        "Requesting SSL certificate...",
        StepAction::Invoke(Tool::RequestCertificate),
        ExitReason::CertificateRequestFailed,
        "Failed to obtain SSL certificate from Let's Encrypt!",
        Some("SSL certificate obtained!"),
    ),
    hard(
        StepId::GenerateDhparam,
        "Generating strong Diffie-Hellman group...",
        StepAction::Invoke(Tool::GenerateDhparam),
        ExitReason::DhparamFailed,
        "Failed to generate strong Diffie-Hellman group!",
        Some("Diffie-Hellman group generated!"),
    ),
    hard(
        StepId::WriteSslSnippets,
        "Copying nginx SSL configuration files...",
        StepAction::Template(&[Artifact::SslDomainSnippet, Artifact::SslParamsSnippet]),
        ExitReason::SslSnippetsFailed,
        "Failed to copy nginx SSL configuration file!",
        None,
    ),
    hard(
        StepId::WriteFinalConfig,
        "Generating new nginx sites-available configuration...",
        StepAction::Template(&[Artifact::FinalSite]),
        ExitReason::FinalConfigFailed,
        "Failed to generate new nginx sites-available configuration!",
        Some("Configuration file created!"),
    ),
    hard(
        StepId::TestFinalConfig,
        "Checking nginx configuration...",
        StepAction::Watch(Tool::TestConfig),
        ExitReason::FinalConfigTestFailed,
        "Failed nginx configuration checker test!",
        Some("nginx configuration checker test is passed!"),
    ),
    hard(
        StepId::ReloadWithTls,
        "Restarting nginx...",
        StepAction::Invoke(Tool::RestartWebServer),
        ExitReason::FinalReloadFailed,
        "Failed to restart nginx service!",
        Some("nginx restarted!"),
    ),
    Step {
        id: StepId::ScheduleRenewal,
        label: "Scheduling Let's Encrypt to auto renew the certificate...",
        action: StepAction::Schedule,
        exit: ExitReason::RenewalScheduleFailed,
        soft_fail: true,
        failure: "Failed to schedule the auto renewal of the certificate! \
                  Please do this manually using crontab -e command.",
        done: Some("Renewal schedule created!"),
    },
    Step {
        id: StepId::ReloadScheduler,
        label: "Restarting cron...",
        action: StepAction::Invoke(Tool::RestartScheduler),
        exit: ExitReason::SchedulerReloadFailed,
        soft_fail: true,
        failure: "Failed to restart cron service!",
        done: Some("cron restarted!"),
    },
];

/// Look up a step's table entry
pub fn step_def(id: StepId) -> &'static Step {
    STEPS
        .iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| unreachable!("every StepId has a table entry"))
}
