//! External engine seam
//!
//! The analysis engine (tslint + tsmetrics) runs out of process. The bridge
//! only knows how to build its command lines (`ExecutableBundle`), how to
//! talk to a spawned process (`invoker`) and the wire shapes (`protocol`).

use crate::error::AnalysisError;
use crate::rules::RuleKeyMapper;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod bundle;
pub mod invoker;
pub mod protocol;

/// Executable plus ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub executable: String,
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Space-joined command line, as shown in diagnostics.
    pub fn to_command_line(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// What a rule check invocation is addressed at
#[derive(Debug, Clone, Copy)]
pub enum RuleCheckTarget<'a> {
    /// One global pass over the project sources.
    Project {
        root: &'a Path,
        source_globs: &'a [String],
    },
    /// One pass per config unit.
    Unit { config_path: &'a Path },
}

/// Deployed engine. Implemented by packaging code.
pub trait ExecutableBundle: Send + Sync {
    /// Must complete before any command is spawned.
    fn deploy(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Push the activated rule set into the engine configuration.
    fn activate_rules(&self, _mapper: &RuleKeyMapper) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn rule_check_command(&self, target: RuleCheckTarget<'_>) -> ExternalCommand;

    fn metrics_command(&self) -> ExternalCommand;
}

/// Glob patterns covering every configured suffix under `root`.
pub fn source_globs(root: &Path, suffixes: &[String]) -> Vec<String> {
    suffixes
        .iter()
        .map(|s| {
            let ext = s.trim_start_matches('.');
            let glob: PathBuf = root.join("**").join(format!("*.{}", ext));
            glob.to_string_lossy().to_string()
        })
        .collect()
}
