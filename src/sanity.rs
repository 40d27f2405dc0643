//! Pre-flight sanity checks for runtime environment
//!
//! Verified before the operator is asked anything:
//! - the package manager and service manager are on PATH
//! - running with root privileges (EUID 0)
//!
//! The web server, certificate tool and openssl are not checked; the
//! pipeline installs or expects them later.

use crate::process_guard::CommandProcessGroup;
use crate::settings::Settings;
use std::process::Command;
use tracing::{debug, info, warn};

/// Environment variable that disables the root check
pub const SKIP_ROOT_ENV: &str = "TLS_BRINGUP_SKIP_ROOT_CHECK";

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }

    /// Operator-facing description of every failed check
    pub fn report(&self) -> String {
        let mut out = String::from("Pre-flight check failed\n");
        if !self.is_root {
            out.push_str(
                "\n  Root privileges required: packages are installed and /etc is rewritten.\n  \
                 Run with sudo or as the root user.\n",
            );
        }
        if !self.missing_binaries.is_empty() {
            out.push_str("\n  Missing required binaries:\n");
            for binary in &self.missing_binaries {
                out.push_str(&format!("    - {}\n", binary));
            }
        }
        out
    }
}

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .in_new_process_group()
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Binaries that must exist before the first step runs
fn required_binaries(settings: &Settings) -> Vec<&str> {
    vec![
        settings.package_manager.as_str(),
        settings.service_binary.as_str(),
    ]
}

/// Set TLS_BRINGUP_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    std::env::var(SKIP_ROOT_ENV)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Run all checks. The root check is skipped when `skip_root` is set or the
/// environment asks for it.
pub fn verify_environment(settings: &Settings, skip_root: bool) -> SanityCheckResult {
    debug!("Running pre-flight sanity checks (skip_root={})...", skip_root);

    let missing_binaries = required_binaries(settings)
        .into_iter()
        .filter(|binary| !binary_exists(binary))
        .map(str::to_string)
        .collect();

    let is_root = if skip_root || should_skip_root_check() {
        warn!("Root check skipped");
        true
    } else {
        is_running_as_root()
    };

    let result = SanityCheckResult {
        missing_binaries,
        is_root,
    };
    if result.is_ok() {
        info!("Pre-flight checks passed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_exists_sh() {
        assert!(binary_exists("sh"), "sh should be available");
    }

    #[test]
    fn test_binary_exists_nonexistent() {
        assert!(!binary_exists("this_binary_definitely_does_not_exist_12345"));
    }

    #[test]
    fn test_verify_environment_reports_missing_tools() {
        let settings = Settings {
            package_manager: "no-such-package-manager-12345".to_string(),
            service_binary: "sh".to_string(),
            ..Settings::default()
        };
        let result = verify_environment(&settings, true);
        assert!(result.is_root);
        assert_eq!(result.missing_binaries, vec!["no-such-package-manager-12345"]);
        assert!(!result.is_ok());
        assert!(result.report().contains("no-such-package-manager-12345"));
    }

    #[test]
    fn test_sanity_result_is_ok() {
        let ok_result = SanityCheckResult {
            missing_binaries: vec![],
            is_root: true,
        };
        assert!(ok_result.is_ok());

        let not_root = SanityCheckResult {
            missing_binaries: vec![],
            is_root: false,
        };
        assert!(!not_root.is_ok());
        assert!(not_root.report().contains("Root privileges required"));
    }
}
