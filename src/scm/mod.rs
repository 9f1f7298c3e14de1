//! SCM (Source Control Management) abstraction layer.
//!
//! Defines the [`VersionControlEngine`] capability the repository manager
//! drives, plus the option and result types that flow through it. The only
//! shipped implementation is [`GitCli`], which shells out to the `git` binary.

mod git;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use git::GitCli;

/// Failure reported by a version-control engine.
///
/// `NotFound` is kept apart from every other failure so callers can treat a
/// missing ref or path as a value instead of an error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not found: {target}")]
    NotFound { target: String },

    #[error("git {command} failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to spawn git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected output from git {command}: {detail}")]
    Parse { command: String, detail: String },
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Options for cloning a remote into the engine's working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Shallow history depth; `None` clones full history.
    pub depth: Option<u32>,
    /// Fetch every branch instead of only the remote's default.
    pub all_branches: bool,
}

/// Options for fetching from a remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub depth: Option<u32>,
    /// Update remote-tracking refs for every branch on the remote.
    pub all_branches: bool,
    /// Drop remote-tracking refs whose upstream branch is gone.
    pub prune: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub force: bool,
}

/// How far `reset` rewinds the working copy. Only a hard reset is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Discard index and working-tree changes.
    Hard,
}

impl ResetMode {
    pub fn as_flag(self) -> &'static str {
        match self {
            ResetMode::Hard => "--hard",
        }
    }
}

/// Options for a history query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Revision or range to walk (`HEAD` when unset).
    pub revision: Option<String>,
    pub max_count: Option<usize>,
}

/// One entry of a branch listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Short name, e.g. `main` for a local branch or `origin/main` for a
    /// remote-tracking one.
    pub name: String,
    pub commit: String,
    /// Whether this is the checked-out branch.
    pub current: bool,
    /// Target of a symbolic ref such as `origin/HEAD`.
    pub symref: Option<String>,
}

/// One commit of a history query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
    pub subject: String,
}

/// High-level operations the repository manager issues against a working copy.
///
/// Every operation may fail. A missing target is reported as
/// [`EngineError::NotFound`] where the engine can tell it apart.
#[async_trait]
pub trait VersionControlEngine: Send + Sync {
    /// Directory the engine operates in.
    fn workdir(&self) -> &Path;

    /// Clone `url` into the (empty) working directory.
    async fn clone_from(&self, url: &str, options: &CloneOptions) -> EngineResult<()>;

    async fn fetch(&self, remote: &str, options: &FetchOptions) -> EngineResult<()>;

    /// Run an arbitrary plumbing command and return its trimmed stdout.
    async fn raw(&self, args: &[&str]) -> EngineResult<String>;

    async fn checkout(&self, args: &[&str]) -> EngineResult<()>;

    async fn reset(&self, mode: ResetMode) -> EngineResult<()>;

    async fn add(&self, paths: &[&str]) -> EngineResult<()>;

    async fn commit(&self, message: &str) -> EngineResult<()>;

    async fn push(&self, remote: &str, refspec: &str, options: &PushOptions) -> EngineResult<()>;

    /// List branches; `args` selects which (e.g. `-r`, `--contains <rev>`).
    async fn branch(&self, args: &[&str]) -> EngineResult<Vec<BranchInfo>>;

    /// Resolve a revision to a full commit id.
    async fn revparse(&self, revision: &str) -> EngineResult<String>;

    async fn log(&self, options: &LogOptions) -> EngineResult<Vec<LogEntry>>;

    /// Raw content of an object, e.g. `origin/main:package.json`.
    async fn show(&self, spec: &str) -> EngineResult<Vec<u8>>;
}

/// Creates engines bound to a working directory.
///
/// The manager binds a fresh engine each time a repository is initialized.
pub trait EngineFactory: Send + Sync {
    fn bind(&self, workdir: &Path) -> Box<dyn VersionControlEngine>;
}

/// Factory for [`GitCli`] engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCliFactory;

impl EngineFactory for GitCliFactory {
    fn bind(&self, workdir: &Path) -> Box<dyn VersionControlEngine> {
        Box::new(GitCli::new(PathBuf::from(workdir)))
    }
}

/// Check if a directory holds a Git working copy.
pub fn is_repo(path: &Path) -> bool {
    path.join(".git").exists()
}
