//! Web server and service management commands.

use crate::tool_traits::ToolArgs;

/// `nginx -t` configuration syntax check
#[derive(Debug, Clone)]
pub struct ConfigTestArgs {
    pub binary: String,
}

impl ToolArgs for ConfigTestArgs {
    fn program(&self) -> &str {
        &self.binary
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-t".to_string()]
    }
}

/// `service <name> restart`
#[derive(Debug, Clone)]
pub struct RestartServiceArgs {
    pub service_binary: String,
    pub service: String,
}

impl ToolArgs for RestartServiceArgs {
    fn program(&self) -> &str {
        &self.service_binary
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.service.clone(), "restart".to_string()]
    }
}
