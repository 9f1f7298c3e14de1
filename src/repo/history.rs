use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::naming::remote_ref;
use super::RepositoryManager;
use crate::error::RepoResult;
use crate::scm::LogOptions;

/// How many subjects `get_commit_messages` returns.
const RECENT_COMMITS: usize = 10;

impl RepositoryManager {
    /// Current commit id of `origin/<branch>`.
    pub async fn get_branch_commit(&self, branch: &str) -> RepoResult<String> {
        match self.try_resolve_branch(branch).await? {
            Some(commit) => Ok(commit),
            None => Err(self.session()?.branch_not_found(branch)),
        }
    }

    /// Subjects of the most recent commits on the checked-out ref, newest first.
    pub async fn get_commit_messages(&self) -> RepoResult<Vec<String>> {
        let session = self.session()?;
        let entries = session
            .engine()
            .log(&LogOptions {
                revision: None,
                max_count: Some(RECENT_COMMITS),
            })
            .await
            .map_err(session.fail("read commit messages", None))?;

        Ok(entries.into_iter().map(|entry| entry.subject).collect())
    }

    /// Author time of the tip of `origin/<branch>`, or `None` if the branch is missing.
    pub async fn try_branch_last_commit_time(
        &self,
        branch: &str,
    ) -> RepoResult<Option<DateTime<Utc>>> {
        let session = self.session()?;
        let result = session
            .engine()
            .log(&LogOptions {
                revision: Some(remote_ref(branch)),
                max_count: Some(1),
            })
            .await;

        match result {
            Ok(entries) => Ok(entries
                .first()
                .map(|entry| entry.author_date.with_timezone(&Utc))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(session.fail("read commit time", Some(branch))(e)),
        }
    }

    /// Author time of the tip of `origin/<branch>`.
    ///
    /// Falls back to the current time when the branch is missing or the
    /// lookup fails, so callers comparing ages never block on it.
    pub async fn get_branch_last_commit_time(&self, branch: &str) -> DateTime<Utc> {
        match self.try_branch_last_commit_time(branch).await {
            Ok(Some(time)) => time,
            Ok(None) => {
                debug!("No commit time for missing branch '{branch}', using now");
                Utc::now()
            }
            Err(e) => {
                warn!("Commit time lookup for '{branch}' failed, using now: {e}");
                Utc::now()
            }
        }
    }

    /// Whether anyone other than the configured author committed to `branch`
    /// since it left the base branch.
    ///
    /// Always false without a configured author or when the branch is missing.
    pub async fn is_branch_modified(&self, branch: &str) -> RepoResult<bool> {
        let session = self.session()?;
        let Some(author) = &session.config.author else {
            return Ok(false);
        };

        let range = format!(
            "{}..{}",
            remote_ref(&session.base_branch),
            remote_ref(branch)
        );
        let entries = match session
            .engine()
            .log(&LogOptions {
                revision: Some(range),
                max_count: None,
            })
            .await
        {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(session.fail("check modification", Some(branch))(e)),
        };

        let foreign = entries
            .iter()
            .find(|entry| !entry.author_email.eq_ignore_ascii_case(&author.email));
        if let Some(entry) = foreign {
            debug!(
                "Branch '{branch}' modified by {} <{}> in {}",
                entry.author_name, entry.author_email, entry.hash
            );
        }
        Ok(foreign.is_some())
    }
}
