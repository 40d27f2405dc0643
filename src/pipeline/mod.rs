//! Provisioning pipeline
//!
//! A run is a short interactive prelude followed by the fixed step table in
//! `steps`. The prelude checks the environment, takes the operator's
//! go-ahead and collects the domain and contact address. Steps then run in
//! order; the first hard failure stops the run with that step's exit code.
//! Soft steps report their failure and the run continues, except that a soft
//! step is skipped once an earlier soft step has failed.
//!
//! All side effects go through the collaborator traits, so the pipeline can
//! be driven end to end against fakes.
//!
//! Every template is rendered with the same positional substitutions:
//!
//! | Placeholder | Value                                   |
//! |-------------|-----------------------------------------|
//! | `{0}`       | domain as entered                       |
//! | `{1}`       | certificate names, space separated      |
//! | `{2}`       | DH parameter file                       |
//! | `{3}`       | per-domain SSL snippet                  |
//! | `{4}`       | shared SSL parameters snippet           |
//! | `{5}`       | ACME webroot                            |
//! | `{6}`       | snippets directory                      |
//! | `{7}`       | certificate tool                        |
//! | `{8}`       | web server reload command               |

pub mod exit;
pub mod steps;

pub use exit::ExitReason;
pub use steps::{step_def, Artifact, StepAction, StepId, Step, Tool, STEPS};

use crate::backup::{BackupManager, Snapshot};
use crate::console::{ask_confirmation, ask_text, Confirmation, Console, Message};
use crate::domain::{Contact, Domain};
use crate::error::{ProvisionError, Result};
use crate::runner::{Markers, ProcessRunner};
use crate::settings::Settings;
use crate::templater::ConfigTemplater;
use crate::tool_traits::{Invocation, ToolArgs};
use crate::tools::certificate::{CertonlyArgs, DhparamArgs};
use crate::tools::packages::{InstallPackageArgs, UpdateIndexArgs};
use crate::tools::server::{ConfigTestArgs, RestartServiceArgs};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, error, info, warn};

/// What happened during a run, for callers that need more than the exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub exit: ExitReason,
    /// Steps that were started, in order
    pub executed: Vec<StepId>,
    pub soft_failures: Vec<StepId>,
    /// Soft steps not attempted because an earlier soft step failed
    pub skipped: Vec<StepId>,
    pub backup: Option<PathBuf>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            exit: ExitReason::Completed,
            executed: Vec::new(),
            soft_failures: Vec::new(),
            skipped: Vec::new(),
            backup: None,
        }
    }
}

/// Values collected by the prelude
#[derive(Debug, Clone)]
struct RunContext {
    home: PathBuf,
    domain: Domain,
    contact: Contact,
}

/// One provisioning run over a set of collaborators
pub struct Pipeline<'a> {
    settings: &'a Settings,
    home: Option<PathBuf>,
    runner: &'a dyn ProcessRunner,
    templater: &'a dyn ConfigTemplater,
    backup: &'a dyn BackupManager,
    console: &'a mut dyn Console,
    step_counter: usize,
}

impl<'a> Pipeline<'a> {
    /// `home` is the operator's home directory, usually `$HOME`
    pub fn new(
        settings: &'a Settings,
        home: Option<PathBuf>,
        runner: &'a dyn ProcessRunner,
        templater: &'a dyn ConfigTemplater,
        backup: &'a dyn BackupManager,
        console: &'a mut dyn Console,
    ) -> Self {
        Self {
            settings,
            home,
            runner,
            templater,
            backup,
            console,
            step_counter: 0,
        }
    }

    pub fn run(&mut self) -> ExitReason {
        self.run_with_report().exit
    }

    pub fn run_with_report(&mut self) -> RunReport {
        let mut report = RunReport::new();

        let ctx = match self.prelude() {
            Ok(ctx) => ctx,
            Err(exit) => {
                info!("Run ended before any step: {}", exit);
                report.exit = exit;
                return report;
            }
        };
        info!(
            "Provisioning {} (names: {}) for {}",
            ctx.domain,
            ctx.domain.domains_arg(),
            ctx.contact
        );

        let mut soft_failed = false;
        for step in STEPS {
            if step.soft_fail && soft_failed {
                warn!("Skipping {} after an earlier soft failure", step.id);
                report.skipped.push(step.id);
                continue;
            }

            self.announce(step.label);
            report.executed.push(step.id);

            match self.perform(step, &ctx, &mut report) {
                Ok(()) => {
                    if let Some(done) = step.done {
                        self.console.print(Message::done(done));
                    }
                }
                Err(err) => {
                    error!("Step {} failed: {}", step.id, err);
                    if step.soft_fail {
                        self.console.print(Message::error(step.failure));
                        report.soft_failures.push(step.id);
                        soft_failed = true;
                        continue;
                    }

                    self.console
                        .print(Message::error(failure_text(step, &err, report.backup.as_deref())));
                    report.exit = step.exit;
                    return report;
                }
            }
        }

        self.console.print(Message::success(format!(
            "nginx is now serving {} over HTTPS. Add any location blocks as \
             {}/*.location.conf files; the site configuration includes them.",
            ctx.domain,
            self.settings.snippets_dir.display()
        )));
        info!("Provisioning of {} completed", ctx.domain);
        report
    }

    /// The operator's home directory, or `MissingHome` after telling them.
    /// Prompts nothing and runs nothing, so callers may check it before
    /// any environment inspection of their own.
    pub fn require_home(&mut self) -> std::result::Result<PathBuf, ExitReason> {
        match self.home.clone().filter(|home| !home.as_os_str().is_empty()) {
            Some(home) => Ok(home),
            None => {
                self.console.print(Message::error(
                    "Unable to retrieve your HOME folder location as HOME environment variable \
                     was not defined!",
                ));
                Err(ExitReason::MissingHome)
            }
        }
    }

    fn prelude(&mut self) -> std::result::Result<RunContext, ExitReason> {
        let home = self.require_home()?;

        self.console.print(Message::warning(format!(
            "This configurator installs nginx and Let's Encrypt, replaces the nginx site \
             configuration at {} and requests a certificate for your domain. The existing \
             configuration is backed up to {} first.",
            self.settings.site_config_path.display(),
            home.join(&self.settings.backup_dir_name).display()
        )));

        if ask_confirmation(self.console, "Do you want to continue?") != Confirmation::Yes {
            self.console
                .print(Message::info("Nothing was changed on this server."));
            return Err(ExitReason::NotConfirmed);
        }

        let Some(domain) = ask_text(self.console, "Enter your domain name")
            .as_deref()
            .and_then(Domain::parse)
        else {
            return Err(ExitReason::DomainCancelled);
        };

        let Some(contact) = ask_text(
            self.console,
            "Enter the e-mail address for urgent renewal and security notices",
        )
        .as_deref()
        .and_then(Contact::parse) else {
            return Err(ExitReason::ContactCancelled);
        };

        Ok(RunContext {
            home,
            domain,
            contact,
        })
    }

    fn announce(&mut self, label: &str) {
        self.step_counter += 1;
        self.console
            .print(Message::step(format!("{:02} => {}", self.step_counter, label)));
    }

    fn perform(&mut self, step: &Step, ctx: &RunContext, report: &mut RunReport) -> Result<()> {
        match step.action {
            StepAction::Invoke(tool) => {
                let invocation = self.invocation(tool, ctx);
                if !self.runner.execute(&invocation)? {
                    return Err(ProvisionError::external_tool(format!(
                        "`{}` exited unsuccessfully",
                        invocation
                    )));
                }
                if tool == Tool::RestartWebServer {
                    self.settle();
                }
                Ok(())
            }
            StepAction::Watch(tool) => {
                let invocation = self.invocation(tool, ctx);
                let markers = Markers {
                    success: self.settings.config_test_success_marker.clone(),
                    failure: self.settings.config_test_failure_marker.clone(),
                };
                let outcome = self.runner.execute_watching(
                    &invocation,
                    &markers,
                    self.settings.marker_timeout(),
                )?;
                if !outcome.is_success() {
                    return Err(ProvisionError::external_tool(format!(
                        "`{}` resolved as {:?}",
                        invocation, outcome
                    )));
                }
                Ok(())
            }
            StepAction::Template(artifacts) => {
                for &artifact in artifacts {
                    let destination = self.materialize(artifact, ctx)?;
                    if step.done.is_none() {
                        self.console.print(Message::done(format!(
                            "Created file {}!",
                            destination.display()
                        )));
                    }
                }
                Ok(())
            }
            StepAction::Backup => {
                match self
                    .backup
                    .snapshot(&self.settings.nginx_dir, &ctx.home, self.console)?
                {
                    Snapshot::Created(path) => report.backup = Some(path),
                    Snapshot::Skipped => warn!("Continuing without a configuration backup"),
                }
                Ok(())
            }
            StepAction::Schedule => {
                self.materialize(Artifact::RenewalSchedule, ctx)?;
                Ok(())
            }
        }
    }

    fn invocation(&self, tool: Tool, ctx: &RunContext) -> Invocation {
        let s = self.settings;
        match tool {
            Tool::UpdateIndex => UpdateIndexArgs {
                package_manager: s.package_manager.clone(),
            }
            .invocation(),
            Tool::InstallWebServer => InstallPackageArgs {
                package_manager: s.package_manager.clone(),
                package: s.web_server_package.clone(),
            }
            .invocation(),
            Tool::InstallCertificateTool => InstallPackageArgs {
                package_manager: s.package_manager.clone(),
                package: s.certificate_package.clone(),
            }
            .invocation(),
            Tool::TestConfig => ConfigTestArgs {
                binary: s.web_server_binary.clone(),
            }
            .invocation(),
            Tool::RestartWebServer => RestartServiceArgs {
                service_binary: s.service_binary.clone(),
                service: s.web_server_service.clone(),
            }
            .invocation(),
            Tool::RequestCertificate => CertonlyArgs {
                tool: s.certificate_tool.clone(),
                webroot: s.acme_webroot.clone(),
                domain: ctx.domain.clone(),
                contact: ctx.contact.clone(),
                staging: s.staging,
            }
            .invocation(),
            Tool::GenerateDhparam => DhparamArgs {
                binary: s.openssl_binary.clone(),
                output: s.dhparam_path.clone(),
                bits: s.dhparam_bits,
            }
            .invocation(),
            Tool::RestartScheduler => RestartServiceArgs {
                service_binary: s.service_binary.clone(),
                service: s.scheduler_service.clone(),
            }
            .invocation(),
        }
    }

    /// Template file and destination for an artifact
    fn artifact_paths(&self, artifact: Artifact, ctx: &RunContext) -> (PathBuf, PathBuf) {
        let s = self.settings;
        match artifact {
            Artifact::ChallengeSite => (
                s.template_path(&s.challenge_template),
                s.site_config_path.clone(),
            ),
            Artifact::SslDomainSnippet => (
                s.template_path(&s.ssl_domain_template),
                s.ssl_domain_snippet_path(ctx.domain.as_str()),
            ),
            Artifact::SslParamsSnippet => (
                s.template_path(&s.ssl_params_template),
                s.ssl_params_snippet_path(),
            ),
            Artifact::FinalSite => (
                s.template_path(&s.final_template),
                s.site_config_path.clone(),
            ),
            Artifact::RenewalSchedule => {
                (s.template_path(&s.cron_template), s.cron_file_path.clone())
            }
        }
    }

    fn materialize(&self, artifact: Artifact, ctx: &RunContext) -> Result<PathBuf> {
        let (template, destination) = self.artifact_paths(artifact, ctx);
        let values = self.substitutions(ctx);
        let values: Vec<&str> = values.iter().map(String::as_str).collect();

        self.templater.materialize(&template, &destination, &values)?;
        debug!("Wrote {:?} for {:?}", destination, artifact);
        Ok(destination)
    }

    fn substitutions(&self, ctx: &RunContext) -> Vec<String> {
        let s = self.settings;
        vec![
            ctx.domain.as_str().to_string(),
            ctx.domain.alt_names().join(" "),
            s.dhparam_path.display().to_string(),
            s.ssl_domain_snippet_path(ctx.domain.as_str())
                .display()
                .to_string(),
            s.ssl_params_snippet_path().display().to_string(),
            s.acme_webroot.display().to_string(),
            s.snippets_dir.display().to_string(),
            s.certificate_tool.clone(),
            format!("{} {} reload", s.service_binary, s.web_server_service),
        ]
    }

    fn settle(&self) {
        let pause = self.settings.restart_settle();
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}

/// Operator-facing failure text for a hard step
fn failure_text(step: &Step, err: &ProvisionError, backup: Option<&Path>) -> String {
    let mut text = format!("{} ({})", step.failure, err);
    if let Some(path) = backup {
        text.push_str(&format!(
            " Your previous nginx configuration was backed up to {}.",
            path.display()
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_text_mentions_backup() {
        let err = ProvisionError::external_tool("`nginx -t` resolved as Failure");
        let step = step_def(StepId::TestFinalConfig);

        let text = failure_text(step, &err, Some(Path::new("/root/nginx-backup/202401010000")));
        assert!(text.starts_with("Failed nginx configuration checker test!"));
        assert!(text.ends_with("backed up to /root/nginx-backup/202401010000."));

        let text = failure_text(step, &err, None);
        assert!(!text.contains("backed up"));
    }
}
