//! Type-safe argument contracts for external tools.
//!
//! Each external command the pipeline runs is described by a struct
//! implementing `ToolArgs`. The struct is the single source of truth for the
//! program name and its flags; the runner only ever sees the resulting
//! `Invocation`.

use std::fmt;

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `program()`: executable name, resolved through `PATH`.
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `get_env_vars()`: extra environment for the child (usually empty).
pub trait ToolArgs {
    fn program(&self) -> &str;

    fn to_cli_args(&self) -> Vec<String>;

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    fn invocation(&self) -> Invocation {
        Invocation {
            program: self.program().to_string(),
            args: self.to_cli_args(),
            env: self.get_env_vars(),
        }
    }
}

/// A fully resolved command line handed to a `ProcessRunner`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
