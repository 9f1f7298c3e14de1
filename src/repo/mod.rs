//! Repository lifecycle and branch management over a single working copy.
//!
//! The work is split across topic files, each adding methods to
//! [`RepositoryManager`]:
//! - `refresh` - initialization, clone-vs-fetch refresh, base branch resolution
//! - `branches` - existence, listing, staleness and file queries
//! - `commits` - branch creation, commits, merges and deletion
//! - `history` - commit ids, messages and timestamps
//! - `naming` - remote-tracking ref naming and path checks

mod branches;
mod commits;
mod history;
pub mod naming;
mod refresh;
#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};

use crate::config::{RepositoryConfig, WorkspaceSettings};
use crate::error::{RepoError, RepoResult};
use crate::scm::{self, EngineError, EngineFactory, GitCliFactory, VersionControlEngine};

/// One file to write in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    pub contents: Vec<u8>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Everything needed to rewrite a branch with a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDescriptor {
    pub branch: String,
    /// Branch the commit starts from; the base branch when unset.
    pub parent: Option<String>,
    pub message: String,
    /// Written in order.
    pub files: Vec<FileChange>,
}

/// How `init_repo` brings the working copy up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStrategy {
    /// Empty the directory and shallow-clone from scratch.
    Clone,
    /// Re-point the remote and fetch into the existing working copy.
    IncrementalFetch,
}

impl RefreshStrategy {
    pub fn select(working_copy_exists: bool, ephemeral: bool) -> Self {
        if working_copy_exists && !ephemeral {
            RefreshStrategy::IncrementalFetch
        } else {
            RefreshStrategy::Clone
        }
    }

    pub fn for_path(local_path: &Path, ephemeral: bool) -> Self {
        Self::select(scm::is_repo(local_path), ephemeral)
    }
}

/// State bound to one initialized repository.
struct Session {
    config: RepositoryConfig,
    local_path: PathBuf,
    base_branch: String,
    engine: Box<dyn VersionControlEngine>,
}

impl Session {
    fn engine(&self) -> &dyn VersionControlEngine {
        self.engine.as_ref()
    }

    /// Wrap an engine failure with this repository's context.
    fn fail<'a>(
        &'a self,
        operation: &'static str,
        branch: Option<&'a str>,
    ) -> impl FnOnce(EngineError) -> RepoError + 'a {
        move |source| RepoError::Operation {
            operation,
            repository: self.config.repository.clone(),
            branch: branch.map(str::to_string),
            source,
        }
    }

    fn branch_not_found(&self, branch: &str) -> RepoError {
        RepoError::BranchNotFound {
            repository: self.config.repository.clone(),
            branch: branch.to_string(),
        }
    }
}

/// Maintains one local working copy of a remote repository.
///
/// Operations share the working tree, so calls on one manager must not
/// overlap; await each before starting the next. Managers for different
/// repositories are independent.
pub struct RepositoryManager {
    settings: WorkspaceSettings,
    factory: Box<dyn EngineFactory>,
    session: Option<Session>,
}

impl RepositoryManager {
    /// Manager driving the system `git` binary.
    pub fn new(settings: WorkspaceSettings) -> Self {
        Self::with_factory(settings, GitCliFactory)
    }

    pub fn with_factory(settings: WorkspaceSettings, factory: impl EngineFactory + 'static) -> Self {
        Self {
            settings,
            factory: Box::new(factory),
            session: None,
        }
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn config(&self) -> RepoResult<&RepositoryConfig> {
        Ok(&self.session()?.config)
    }

    pub fn local_path(&self) -> RepoResult<&Path> {
        Ok(&self.session()?.local_path)
    }

    /// The resolved base branch.
    pub fn base_branch(&self) -> RepoResult<&str> {
        Ok(&self.session()?.base_branch)
    }

    fn session(&self) -> RepoResult<&Session> {
        self.session.as_ref().ok_or(RepoError::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_strategy_selection() {
        assert_eq!(
            RefreshStrategy::select(true, false),
            RefreshStrategy::IncrementalFetch
        );
        assert_eq!(RefreshStrategy::select(true, true), RefreshStrategy::Clone);
        assert_eq!(RefreshStrategy::select(false, false), RefreshStrategy::Clone);
        assert_eq!(RefreshStrategy::select(false, true), RefreshStrategy::Clone);
    }

    #[test]
    fn test_refresh_strategy_for_path() {
        let temp = tempfile::TempDir::new().unwrap();
        assert_eq!(
            RefreshStrategy::for_path(temp.path(), false),
            RefreshStrategy::Clone
        );

        std::fs::create_dir(temp.path().join(".git")).unwrap();
        assert_eq!(
            RefreshStrategy::for_path(temp.path(), false),
            RefreshStrategy::IncrementalFetch
        );
        assert_eq!(
            RefreshStrategy::for_path(temp.path(), true),
            RefreshStrategy::Clone
        );
    }

    #[test]
    fn test_uninitialized_manager_reports_not_initialized() {
        let manager = RepositoryManager::new(WorkspaceSettings::default());

        assert!(!manager.is_initialized());
        assert!(matches!(
            manager.base_branch(),
            Err(RepoError::NotInitialized)
        ));
        assert!(matches!(manager.local_path(), Err(RepoError::NotInitialized)));
    }
}
