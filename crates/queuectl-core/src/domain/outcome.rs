//! Outcome model: the result of running a job's command once.
//!
//! A failed command is not an error in this crate. It is the expected
//! "job failed" signal that the lifecycle engine turns into a retry or a
//! dead-letter transition.

use serde::{Deserialize, Serialize};

/// Result of one command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecOutcome {
    /// Exit code 0.
    Success { stdout: String },

    /// Non-zero exit, killed by a signal, or failed to spawn.
    Failure {
        reason: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,

        #[serde(default, skip_serializing_if = "String::is_empty")]
        stdout: String,

        #[serde(default, skip_serializing_if = "String::is_empty")]
        stderr: String,
    },
}

impl ExecOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::Success {
            stdout: stdout.into(),
        }
    }

    /// Failure without captured output (e.g. spawn error).
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Failure from a process that ran and exited unsuccessfully.
    ///
    /// The reason is trimmed stderr when there is any, otherwise the exit code.
    pub fn from_exit(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let trimmed = stderr.trim();
        let reason = if !trimmed.is_empty() {
            trimmed.to_string()
        } else if let Some(code) = exit_code {
            format!("exit code {code}")
        } else {
            "terminated by signal".to_string()
        };
        Self::Failure {
            reason,
            exit_code,
            stdout,
            stderr,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }
}
