use log::{debug, info, warn};
use std::path::Path;

use super::naming::REMOTE;
use super::{naming, RefreshStrategy, RepositoryManager, Session};
use crate::config::{AuthorIdentity, RepositoryConfig};
use crate::error::{RepoError, RepoResult};
use crate::scm::{
    CloneOptions, EngineError, EngineResult, FetchOptions, ResetMode, VersionControlEngine,
};

/// History depth kept in the working copy. Two commits are enough for
/// commit-message and timestamp queries.
pub const HISTORY_DEPTH: u32 = 2;

impl RepositoryManager {
    /// Bring the working copy for `config` up to date and make it current.
    ///
    /// An existing working copy is refreshed with a shallow fetch; if that
    /// fails for any reason the directory is wiped and cloned again. Only a
    /// failed clone is fatal.
    pub async fn init_repo(&mut self, config: RepositoryConfig) -> RepoResult<()> {
        self.session = None;

        let local_path = self.settings.local_path_for(&config.repository)?;
        let engine = self.factory.bind(&local_path);
        let strategy = RefreshStrategy::for_path(&local_path, self.settings.ephemeral);

        let refreshed = match strategy {
            RefreshStrategy::IncrementalFetch => match refresh(engine.as_ref(), &config).await {
                Ok(()) => {
                    info!("Refreshed working copy of {}", config.repository);
                    true
                }
                Err(e) => {
                    warn!(
                        "Refresh of {} failed, falling back to clone: {e}",
                        config.repository
                    );
                    false
                }
            },
            RefreshStrategy::Clone => false,
        };

        if !refreshed {
            empty_dir(&local_path).await?;
            engine
                .clone_from(
                    &config.remote_url,
                    &CloneOptions {
                        depth: Some(HISTORY_DEPTH),
                        all_branches: true,
                    },
                )
                .await
                .map_err(|source| RepoError::Clone {
                    repository: config.repository.clone(),
                    source,
                })?;
            info!(
                "Cloned {} into {}",
                config.repository,
                local_path.display()
            );
        }

        if let Some(author) = &config.author {
            configure_identity(engine.as_ref(), author)
                .await
                .map_err(|source| RepoError::Operation {
                    operation: "configure identity",
                    repository: config.repository.clone(),
                    branch: None,
                    source,
                })?;
        }

        let base_branch = match &config.base_branch {
            Some(branch) => branch.clone(),
            None => resolve_default_branch(engine.as_ref())
                .await
                .map_err(|source| RepoError::Operation {
                    operation: "resolve default branch",
                    repository: config.repository.clone(),
                    branch: None,
                    source,
                })?,
        };
        debug!("Base branch of {} is {base_branch}", config.repository);

        // A refreshed copy may still sit on whatever branch the last run used.
        check_out_base(engine.as_ref(), &base_branch)
            .await
            .map_err(|source| RepoError::Operation {
                operation: "check out base branch",
                repository: config.repository.clone(),
                branch: Some(base_branch.clone()),
                source,
            })?;

        self.session = Some(Session {
            config,
            local_path,
            base_branch,
            engine,
        });

        Ok(())
    }

    /// Switch the base branch used by later operations.
    ///
    /// The branch must exist on the remote.
    pub async fn set_base_branch(&mut self, branch: &str) -> RepoResult<()> {
        if self.try_resolve_branch(branch).await?.is_none() {
            return Err(self.session()?.branch_not_found(branch));
        }

        let session = self.session.as_mut().ok_or(RepoError::NotInitialized)?;
        info!(
            "Base branch of {} set to {branch}",
            session.config.repository
        );
        session.base_branch = branch.to_string();
        Ok(())
    }
}

async fn refresh(engine: &dyn VersionControlEngine, config: &RepositoryConfig) -> EngineResult<()> {
    engine
        .raw(&["remote", "set-url", REMOTE, &config.remote_url])
        .await?;
    engine
        .fetch(
            REMOTE,
            &FetchOptions {
                depth: Some(HISTORY_DEPTH),
                all_branches: true,
                prune: true,
            },
        )
        .await
}

async fn empty_dir(path: &Path) -> RepoResult<()> {
    let io_error = |source| RepoError::Io {
        path: path.to_path_buf(),
        source,
    };

    if tokio::fs::try_exists(path).await.map_err(io_error)? {
        tokio::fs::remove_dir_all(path).await.map_err(io_error)?;
    }
    tokio::fs::create_dir_all(path).await.map_err(io_error)
}

async fn check_out_base(engine: &dyn VersionControlEngine, base: &str) -> EngineResult<()> {
    engine.reset(ResetMode::Hard).await?;
    engine
        .checkout(&["-B", base, &naming::remote_ref(base)])
        .await
}

async fn configure_identity(
    engine: &dyn VersionControlEngine,
    author: &AuthorIdentity,
) -> EngineResult<()> {
    engine.raw(&["config", "user.name", &author.name]).await?;
    engine.raw(&["config", "user.email", &author.email]).await?;
    // Signing is not supported.
    engine.raw(&["config", "commit.gpgsign", "false"]).await?;
    Ok(())
}

async fn resolve_default_branch(engine: &dyn VersionControlEngine) -> EngineResult<String> {
    let head_ref = format!("refs/remotes/{REMOTE}/HEAD");

    let target = match engine.raw(&["symbolic-ref", &head_ref]).await {
        Ok(target) => target,
        Err(e) => {
            debug!("{head_ref} unresolved ({e}), asking the remote");
            engine.raw(&["remote", "set-head", REMOTE, "--auto"]).await?;
            engine.raw(&["symbolic-ref", &head_ref]).await?
        }
    };

    naming::strip_tracking_ref(&target)
        .map(str::to_string)
        .ok_or_else(|| EngineError::Parse {
            command: "symbolic-ref".to_string(),
            detail: format!("'{target}' is not a branch of {REMOTE}"),
        })
}
