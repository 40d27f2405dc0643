use clap::Parser;
use std::path::PathBuf;

/// Install nginx, obtain a Let's Encrypt certificate and switch the default
/// site to HTTPS
#[derive(Parser, Debug)]
#[command(name = "tls-bringup")]
#[command(about = "Interactive nginx + Let's Encrypt provisioning for Debian-family hosts")]
#[command(version)]
pub struct Cli {
    /// JSON settings file; absent fields keep their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Request a dry-run certificate from the staging authority
    #[arg(long)]
    pub staging: bool,

    /// Directory holding the configuration templates
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective settings to FILE and exit; a starting point for `--config`
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Do not require root (sandboxed runs)
    #[arg(long)]
    pub skip_root_check: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tls-bringup"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.staging);
        assert!(!cli.print_config);
        assert!(cli.save_config.is_none());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "tls-bringup",
            "--config",
            "/etc/tls-bringup.json",
            "--staging",
            "--template-dir",
            "/opt/templates",
            "--skip-root-check",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/tls-bringup.json")));
        assert!(cli.staging);
        assert_eq!(cli.template_dir, Some(PathBuf::from("/opt/templates")));
        assert!(cli.skip_root_check);
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn test_save_config_takes_a_path() {
        let cli = Cli::try_parse_from(["tls-bringup", "--save-config", "/tmp/settings.json"])
            .unwrap();
        assert_eq!(cli.save_config, Some(PathBuf::from("/tmp/settings.json")));
        assert!(Cli::try_parse_from(["tls-bringup", "--save-config"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
