//! Error taxonomy
//!
//! Fatal kinds abort a run and surface to the operator. Recoverable kinds
//! (unresolved config units, dangling result references, metrics failures)
//! never become errors: they are logged and recorded in `RunOutcome`.

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a response from one external process.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Executable missing or not runnable.
    #[error("Failed to run external process `{command_line}`: {source}")]
    SpawnFailed {
        command_line: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool wrote to stderr; treated as failure whatever the exit code.
    #[error("External process `{command_line}` reported an error: {stderr}")]
    ToolReportedError { command_line: String, stderr: String },

    #[error("External process `{command_line}` timed out after {}ms", .timeout.as_millis())]
    Timeout {
        command_line: String,
        timeout: Duration,
    },

    #[error("External process `{command_line}` was cancelled")]
    Cancelled { command_line: String },

    /// Waiting on the child failed after a successful spawn.
    #[error("I/O error while talking to `{command_line}`: {source}")]
    Io {
        command_line: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which side of the rule table a lookup started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    ToHost,
    ToExternal,
}

impl std::fmt::Display for KeyDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyDirection::ToHost => f.write_str("tslint rule"),
            KeyDirection::ToExternal => f.write_str("host rule"),
        }
    }
}

/// Rule table lookup miss. Always an internal invariant violation: the host
/// registry and the engine configuration disagree.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {direction} `{key}`: no mapping in the activated rule set")]
pub struct UnmappedRuleKey {
    pub direction: KeyDirection,
    pub key: String,
}

/// Errors that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    RuleCheck(#[from] InvocationError),

    #[error("Rule check output of `{command_line}` is not a failure list: {source}")]
    MalformedRuleCheckResponse {
        command_line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    UnmappedRuleKey(#[from] UnmappedRuleKey),

    #[error("Failed to deploy analyzer bundle: {0}")]
    Deploy(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// The invocation failure behind this error, if any.
    pub fn invocation(&self) -> Option<&InvocationError> {
        match self {
            AnalysisError::RuleCheck(e) => Some(e),
            _ => None,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
