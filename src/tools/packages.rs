//! Package manager commands (`apt-get`).

use crate::tool_traits::ToolArgs;

// ============================================================================
// Update package index
// ============================================================================

/// `apt-get update`
#[derive(Debug, Clone)]
pub struct UpdateIndexArgs {
    pub package_manager: String,
}

impl ToolArgs for UpdateIndexArgs {
    fn program(&self) -> &str {
        &self.package_manager
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["update".to_string()]
    }
}

// ============================================================================
// Install package
// ============================================================================

/// `apt-get install -y <package>`
#[derive(Debug, Clone)]
pub struct InstallPackageArgs {
    pub package_manager: String,
    pub package: String,
}

impl ToolArgs for InstallPackageArgs {
    fn program(&self) -> &str {
        &self.package_manager
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["install".to_string(), "-y".to_string(), self.package.clone()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        // Keeps debconf from stopping on a prompt mid-install
        vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
    }
}
