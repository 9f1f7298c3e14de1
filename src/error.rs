use std::path::PathBuf;
use thiserror::Error;

use crate::scm::EngineError;

/// Errors surfaced by the repository manager.
///
/// Each variant names the repository (and branch, where there is one) so a
/// caller can log it and abort the matching workflow.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("repository not initialized; call init_repo first")]
    NotInitialized,

    #[error("failed to clone {repository}: {source}")]
    Clone {
        repository: String,
        #[source]
        source: EngineError,
    },

    #[error("{operation} failed for {repository}{}: {source}", branch_suffix(.branch))]
    Operation {
        operation: &'static str,
        repository: String,
        branch: Option<String>,
        #[source]
        source: EngineError,
    },

    #[error("branch '{branch}' not found on remote of {repository}")]
    BranchNotFound { repository: String, branch: String },

    #[error("invalid file path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

fn branch_suffix(branch: &Option<String>) -> String {
    branch
        .as_deref()
        .map(|b| format!(" (branch '{b}')"))
        .unwrap_or_default()
}

pub type RepoResult<T> = Result<T, RepoError>;
