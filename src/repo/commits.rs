use log::{debug, info, warn};

use super::naming::{self, branch_refspec, remote_ref, REMOTE};
use super::{CommitDescriptor, FileChange, RepositoryManager};
use crate::error::{RepoError, RepoResult};
use crate::scm::{PushOptions, ResetMode};

const FORCE: PushOptions = PushOptions { force: true };

impl RepositoryManager {
    /// Point `branch` at `start_point` locally and on the remote.
    ///
    /// Discards uncommitted changes in the working copy. Calling it again
    /// resets the branch to the given point.
    pub async fn create_branch(&self, branch: &str, start_point: &str) -> RepoResult<()> {
        let session = self.session()?;
        let engine = session.engine();

        engine
            .reset(ResetMode::Hard)
            .await
            .map_err(session.fail("reset", Some(branch)))?;
        engine
            .checkout(&["-B", branch, start_point])
            .await
            .map_err(session.fail("create branch", Some(branch)))?;
        engine
            .push(REMOTE, &branch_refspec(branch), &FORCE)
            .await
            .map_err(session.fail("push", Some(branch)))?;

        info!("Created branch '{branch}' at {start_point}");
        Ok(())
    }

    /// Rewrite `branch` as a single commit of `files` on top of `parent`
    /// (default: the base branch) and force-push it.
    ///
    /// The branch content depends only on the parent and the files, so
    /// retrying with the same inputs yields the same tree. Returns the new
    /// tip commit id.
    pub async fn commit_files_to_branch(
        &self,
        branch: &str,
        files: &[FileChange],
        message: &str,
        parent: Option<&str>,
    ) -> RepoResult<String> {
        let session = self.session()?;
        let engine = session.engine();
        let parent = parent.unwrap_or(&session.base_branch);

        for file in files {
            naming::validate_relative_path(&file.path)?;
        }

        engine
            .reset(ResetMode::Hard)
            .await
            .map_err(session.fail("reset", Some(branch)))?;
        engine
            .checkout(&["-B", branch, &remote_ref(parent)])
            .await
            .map_err(session.fail("create branch", Some(branch)))?;

        for file in files {
            let target = session.local_path.join(&file.path);
            if let Some(dir) = target.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|source| RepoError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })?;
            }
            tokio::fs::write(&target, &file.contents)
                .await
                .map_err(|source| RepoError::Io {
                    path: target.clone(),
                    source,
                })?;
        }

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        engine
            .add(&paths)
            .await
            .map_err(session.fail("stage files", Some(branch)))?;
        engine
            .commit(message)
            .await
            .map_err(session.fail("commit", Some(branch)))?;
        engine
            .push(REMOTE, &branch_refspec(branch), &FORCE)
            .await
            .map_err(session.fail("push", Some(branch)))?;

        let tip = engine
            .revparse("HEAD")
            .await
            .map_err(session.fail("resolve commit", Some(branch)))?;

        info!(
            "Committed {} file(s) to '{branch}' from '{parent}' as {tip}",
            files.len()
        );
        Ok(tip)
    }

    /// [`commit_files_to_branch`](Self::commit_files_to_branch) driven by a descriptor.
    pub async fn commit(&self, descriptor: &CommitDescriptor) -> RepoResult<String> {
        self.commit_files_to_branch(
            &descriptor.branch,
            &descriptor.files,
            &descriptor.message,
            descriptor.parent.as_deref(),
        )
        .await
    }

    /// Delete `branch` on the remote, then locally if it exists there.
    pub async fn delete_branch(&self, branch: &str) -> RepoResult<()> {
        let session = self.session()?;
        let engine = session.engine();

        match engine.raw(&["push", REMOTE, "--delete", branch]).await {
            Ok(_) => info!("Deleted remote branch '{branch}'"),
            Err(e) if e.is_not_found() => {
                debug!("Remote branch '{branch}' already gone: {e}");
                // Drop the stale tracking ref so later queries agree with the remote.
                if let Err(e) = engine.raw(&["branch", "-rD", &remote_ref(branch)]).await {
                    debug!("No tracking ref to drop for '{branch}': {e}");
                }
            }
            Err(e) => return Err(session.fail("delete remote branch", Some(branch))(e)),
        }

        if let Err(e) = engine.raw(&["branch", "-D", branch]).await {
            debug!("Local branch '{branch}' not deleted: {e}");
        }

        Ok(())
    }

    /// Merge `branch` into the base branch and push the result.
    ///
    /// No conflict resolution is attempted: a failed merge is aborted and
    /// returned as an error.
    pub async fn merge_branch(&self, branch: &str) -> RepoResult<()> {
        let session = self.session()?;
        let engine = session.engine();
        let base = session.base_branch.as_str();

        engine
            .reset(ResetMode::Hard)
            .await
            .map_err(session.fail("reset", Some(branch)))?;
        engine
            .checkout(&["-B", branch, &remote_ref(branch)])
            .await
            .map_err(session.fail("checkout", Some(branch)))?;
        engine
            .checkout(&["-B", base, &remote_ref(base)])
            .await
            .map_err(session.fail("checkout", Some(base)))?;

        if let Err(e) = engine.raw(&["merge", "--no-edit", branch]).await {
            if let Err(abort) = engine.raw(&["merge", "--abort"]).await {
                warn!("Could not abort failed merge of '{branch}': {abort}");
            }
            return Err(session.fail("merge", Some(branch))(e));
        }

        engine
            .push(REMOTE, &branch_refspec(base), &PushOptions::default())
            .await
            .map_err(session.fail("push", Some(base)))?;

        info!("Merged '{branch}' into '{base}'");
        Ok(())
    }
}
