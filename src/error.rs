use std::path::PathBuf;

use thiserror::Error;

/// Possible errors from dumping or applying a history.
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{command}` exited with {status}: {stderr}")]
    ExternalCommand {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("cannot run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`git` not found in PATH: {0}")]
    GitNotFound(#[from] which::Error),

    #[error("`{command}` printed output that is not valid UTF-8")]
    NonUtf8Output { command: String },

    #[error("a {operation} is in progress; finish or abort it first")]
    OperationInProgress { operation: &'static str },

    #[error("unexpected `git show` output for {commit}: {reason}")]
    Parse { commit: String, reason: String },

    #[error("invalid history document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn parse(commit: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            commit: commit.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
