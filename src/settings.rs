//! Provisioning settings: every path, file name, package and tool name the
//! pipeline touches.
//!
//! Defaults target a Debian-family host running nginx and the `letsencrypt`
//! package. A JSON file may override any subset of fields; missing fields
//! keep their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Effective settings for one provisioning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Server configuration layout
    pub nginx_dir: PathBuf,
    pub site_config_path: PathBuf,
    pub snippets_dir: PathBuf,
    /// `{0}` is replaced by the domain, e.g. `ssl-{0}.conf`
    pub ssl_domain_snippet_pattern: String,
    pub ssl_params_snippet_name: String,
    pub cron_file_path: PathBuf,

    // Templates
    pub template_dir: PathBuf,
    pub challenge_template: String,
    pub ssl_domain_template: String,
    pub ssl_params_template: String,
    pub final_template: String,
    pub cron_template: String,

    // Backup
    pub backup_dir_name: String,

    // Certificate request
    pub acme_webroot: PathBuf,
    pub staging: bool,
    pub dhparam_path: PathBuf,
    pub dhparam_bits: u32,

    // Packages and tools
    pub package_manager: String,
    pub web_server_package: String,
    pub certificate_package: String,
    pub web_server_binary: String,
    pub certificate_tool: String,
    pub openssl_binary: String,
    pub service_binary: String,
    pub web_server_service: String,
    pub scheduler_service: String,

    // Config test output markers (nginx writes these to stderr)
    pub config_test_success_marker: String,
    pub config_test_failure_marker: String,
    pub marker_timeout_secs: u64,

    /// Pause after each server restart before the next step
    pub restart_settle_millis: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let nginx_dir = PathBuf::from("/etc/nginx");
        Self {
            site_config_path: nginx_dir.join("sites-available/default"),
            snippets_dir: nginx_dir.join("snippets"),
            nginx_dir,
            ssl_domain_snippet_pattern: "ssl-{0}.conf".to_string(),
            ssl_params_snippet_name: "ssl-params.conf".to_string(),
            cron_file_path: PathBuf::from("/etc/cron.d/letsencrypt"),

            template_dir: default_template_dir(),
            challenge_template: "default.conf".to_string(),
            ssl_domain_template: "ssl-snippet.conf".to_string(),
            ssl_params_template: "ssl-params-snippet.conf".to_string(),
            final_template: "default-after.conf".to_string(),
            cron_template: "cron".to_string(),

            backup_dir_name: "nginx-backup".to_string(),

            acme_webroot: PathBuf::from("/var/www/html"),
            staging: false,
            dhparam_path: PathBuf::from("/etc/ssl/certs/dhparam.pem"),
            dhparam_bits: 2048,

            package_manager: "apt-get".to_string(),
            web_server_package: "nginx".to_string(),
            certificate_package: "letsencrypt".to_string(),
            web_server_binary: "nginx".to_string(),
            certificate_tool: "letsencrypt".to_string(),
            openssl_binary: "openssl".to_string(),
            service_binary: "service".to_string(),
            web_server_service: "nginx".to_string(),
            scheduler_service: "cron".to_string(),

            config_test_success_marker: "test is successful".to_string(),
            config_test_failure_marker: "test failed".to_string(),
            marker_timeout_secs: 120,

            restart_settle_millis: 2000,
        }
    }
}

/// Templates ship in a `templates/` directory beside the executable.
fn default_template_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("templates")
}

impl Settings {
    /// Load settings from a JSON file, filling absent fields with defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {:?}", path.as_ref()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.ssl_domain_snippet_pattern.contains("{0}") {
            anyhow::bail!(
                "ssl_domain_snippet_pattern must contain the {{0}} domain placeholder: {:?}",
                self.ssl_domain_snippet_pattern
            );
        }
        if self.config_test_success_marker.is_empty() || self.config_test_failure_marker.is_empty() {
            anyhow::bail!("config test markers must not be empty");
        }
        if self.marker_timeout_secs == 0 {
            anyhow::bail!("marker_timeout_secs must be greater than zero");
        }
        if self.dhparam_bits < 1024 {
            anyhow::bail!("dhparam_bits must be at least 1024, got {}", self.dhparam_bits);
        }
        Ok(())
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.template_dir.join(name)
    }

    pub fn ssl_domain_snippet_path(&self, domain: &str) -> PathBuf {
        self.snippets_dir
            .join(self.ssl_domain_snippet_pattern.replace("{0}", domain))
    }

    pub fn ssl_params_snippet_path(&self) -> PathBuf {
        self.snippets_dir.join(&self.ssl_params_snippet_name)
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_secs(self.marker_timeout_secs)
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_millis)
    }

    /// Point every system path under `root`. Used to sandbox runs.
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Self::default();
        let reroot = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
        Self {
            nginx_dir: reroot(&defaults.nginx_dir),
            site_config_path: reroot(&defaults.site_config_path),
            snippets_dir: reroot(&defaults.snippets_dir),
            cron_file_path: reroot(&defaults.cron_file_path),
            acme_webroot: reroot(&defaults.acme_webroot),
            dhparam_path: reroot(&defaults.dhparam_path),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_debian_layout() {
        let settings = Settings::default();
        assert_eq!(
            settings.site_config_path,
            PathBuf::from("/etc/nginx/sites-available/default")
        );
        assert_eq!(
            settings.ssl_domain_snippet_path("example.com"),
            PathBuf::from("/etc/nginx/snippets/ssl-example.com.conf")
        );
        assert_eq!(
            settings.ssl_params_snippet_path(),
            PathBuf::from("/etc/nginx/snippets/ssl-params.conf")
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "staging": true, "dhparam_bits": 4096 }"#).unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert!(settings.staging);
        assert_eq!(settings.dhparam_bits, 4096);
        assert_eq!(settings.web_server_package, "nginx");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::rooted_at(dir.path());
        settings.scheduler_service = "crond".to_string();

        settings.save_to_file(&path).unwrap();
        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "ssl_domain_snippet_pattern": "ssl.conf" }"#).unwrap();

        let err = Settings::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_malformed_json_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Settings::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }

    #[test]
    fn test_rooted_at_relocates_system_paths() {
        let settings = Settings::rooted_at(Path::new("/tmp/sandbox"));
        assert_eq!(settings.nginx_dir, PathBuf::from("/tmp/sandbox/etc/nginx"));
        assert_eq!(
            settings.cron_file_path,
            PathBuf::from("/tmp/sandbox/etc/cron.d/letsencrypt")
        );
        assert_eq!(
            settings.dhparam_path,
            PathBuf::from("/tmp/sandbox/etc/ssl/certs/dhparam.pem")
        );
    }
}
