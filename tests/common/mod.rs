//! Shared fakes and sandbox setup for pipeline tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tlsbringup::console::{Console, Message, MessageKind};
use tlsbringup::pipeline::{Pipeline, RunReport, StepId};
use tlsbringup::runner::{Markers, ProcessRunner, RunnerError, WatchOutcome};
use tlsbringup::{FsBackup, FsTemplater, Invocation, Settings};

pub const DOMAIN: &str = "example.com";
pub const EMAIL: &str = "admin@example.com";
pub const ORIGINAL_SITE: &str = "server { listen 80; }\n";

/// Step reached by each runner call of a full run, in call order
pub const RUNNER_CALL_STEPS: [StepId; 10] = [
    StepId::UpdatePackageIndex,
    StepId::InstallWebServer,
    StepId::InstallCertificateTool,
    StepId::TestChallengeConfig,
    StepId::ReloadForChallenge,
    StepId::RequestCertificate,
    StepId::GenerateDhparam,
    StepId::TestFinalConfig,
    StepId::ReloadWithTls,
    StepId::ReloadScheduler,
];

/// Console fed from a script of answers, recording everything shown
#[derive(Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub messages: Vec<Message>,
}

impl ScriptedConsole {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn texts(&self, kind: MessageKind) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.text.as_str())
            .collect()
    }
}

impl Console for ScriptedConsole {
    fn print(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front()
    }
}

/// How the scripted failing call misbehaves
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Non-zero exit, or `Failure` for watched runs
    Fails,
    /// The watched run resolves with this outcome
    Watch(WatchOutcome),
    /// The process cannot be started
    SpawnError,
}

/// Runner that records invocations and fails one chosen call
#[derive(Default)]
pub struct FakeRunner {
    pub calls: RefCell<Vec<Invocation>>,
    fault: Option<(usize, Fault)>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `index`-th call (zero based)
    pub fn failing_at(index: usize, fault: Fault) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fault: Some((index, fault)),
        }
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    fn record(&self, invocation: &Invocation) -> Option<Fault> {
        let mut calls = self.calls.borrow_mut();
        let index = calls.len();
        calls.push(invocation.clone());
        self.fault
            .filter(|(at, _)| *at == index)
            .map(|(_, fault)| fault)
    }
}

impl ProcessRunner for FakeRunner {
    fn execute(&self, invocation: &Invocation) -> Result<bool, RunnerError> {
        match self.record(invocation) {
            None => Ok(true),
            Some(Fault::SpawnError) => Err(RunnerError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            Some(_) => Ok(false),
        }
    }

    fn execute_watching(
        &self,
        invocation: &Invocation,
        _markers: &Markers,
        _timeout: Duration,
    ) -> Result<WatchOutcome, RunnerError> {
        match self.record(invocation) {
            None => Ok(WatchOutcome::Success),
            Some(Fault::Fails) => Ok(WatchOutcome::Failure),
            Some(Fault::Watch(outcome)) => Ok(outcome),
            Some(Fault::SpawnError) => Err(RunnerError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// A fake filesystem root with an existing nginx install and a home directory
pub struct Sandbox {
    pub dir: TempDir,
    pub settings: Settings,
    pub home: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::rooted_at(dir.path());
        settings.template_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
        settings.restart_settle_millis = 0;

        fs::create_dir_all(settings.site_config_path.parent().unwrap()).unwrap();
        fs::write(settings.nginx_dir.join("nginx.conf"), "events {}\n").unwrap();
        fs::write(&settings.site_config_path, ORIGINAL_SITE).unwrap();

        let home = dir.path().join("home/operator");
        fs::create_dir_all(&home).unwrap();

        Self {
            dir,
            settings,
            home,
        }
    }

    pub fn backup_root(&self) -> PathBuf {
        self.home.join(&self.settings.backup_dir_name)
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {:?}: {}", path, e))
    }

    pub fn run(&self, runner: &FakeRunner, answers: &[&str]) -> (RunReport, ScriptedConsole) {
        self.run_with_home(runner, answers, Some(self.home.clone()))
    }

    pub fn run_with_home(
        &self,
        runner: &FakeRunner,
        answers: &[&str],
        home: Option<PathBuf>,
    ) -> (RunReport, ScriptedConsole) {
        let mut console = ScriptedConsole::new(answers);
        let templater = FsTemplater;
        let backup = FsBackup::new(self.settings.backup_dir_name.clone());
        let report = Pipeline::new(
            &self.settings,
            home,
            runner,
            &templater,
            &backup,
            &mut console,
        )
        .run_with_report();
        (report, console)
    }
}

/// Answers that take the prelude through to the first step
pub fn happy_answers() -> Vec<&'static str> {
    vec!["y", DOMAIN, EMAIL]
}
