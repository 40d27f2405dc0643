//! Certificate acquisition commands.
//!
//! - `CertonlyArgs` for the ACME client (`letsencrypt certonly`)
//! - `DhparamArgs` for `openssl dhparam`

use std::path::PathBuf;

use crate::domain::{Contact, Domain};
use crate::tool_traits::ToolArgs;

// ============================================================================
// Request certificate
// ============================================================================

/// Webroot-authenticated, non-interactive certificate request.
///
/// In staging mode the request is a dry run against the staging authority
/// and the terms of service are not accepted.
#[derive(Debug, Clone)]
pub struct CertonlyArgs {
    pub tool: String,
    pub webroot: PathBuf,
    pub domain: Domain,
    pub contact: Contact,
    pub staging: bool,
}

impl ToolArgs for CertonlyArgs {
    fn program(&self) -> &str {
        &self.tool
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "certonly".to_string(),
            "--non-interactive".to_string(),
            "--authenticator".to_string(),
            "webroot".to_string(),
            format!("--webroot-path={}", self.webroot.display()),
            "--domains".to_string(),
            self.domain.domains_arg(),
        ];
        if self.staging {
            args.push("--staging".to_string());
            args.push("--dry-run".to_string());
        }
        args.push("--email".to_string());
        args.push(self.contact.as_str().to_string());
        if !self.staging {
            args.push("--agree-tos".to_string());
        }
        args
    }
}

// ============================================================================
// Diffie-Hellman parameters
// ============================================================================

/// `openssl dhparam -out <path> <bits>`
#[derive(Debug, Clone)]
pub struct DhparamArgs {
    pub binary: String,
    pub output: PathBuf,
    pub bits: u32,
}

impl ToolArgs for DhparamArgs {
    fn program(&self) -> &str {
        &self.binary
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "dhparam".to_string(),
            "-out".to_string(),
            self.output.display().to_string(),
            self.bits.to_string(),
        ]
    }
}
