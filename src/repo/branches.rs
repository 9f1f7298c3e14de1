use log::{debug, warn};

use super::naming::{self, remote_ref};
use super::RepositoryManager;
use crate::error::RepoResult;

impl RepositoryManager {
    /// Commit id of `origin/<branch>`, or `None` if the remote has no such branch.
    pub async fn try_resolve_branch(&self, branch: &str) -> RepoResult<Option<String>> {
        let session = self.session()?;
        match session.engine().revparse(&remote_ref(branch)).await {
            Ok(commit) => Ok(Some(commit)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(session.fail("resolve branch", Some(branch))(e)),
        }
    }

    /// Whether the remote has `branch`, as of the last fetch.
    ///
    /// Never fails: anything that prevents resolving the branch counts as absent.
    pub async fn branch_exists(&self, branch: &str) -> bool {
        match self.try_resolve_branch(branch).await {
            Ok(commit) => commit.is_some(),
            Err(e) => {
                warn!("Treating branch '{branch}' as absent: {e}");
                false
            }
        }
    }

    /// Remote branches whose name starts with `prefix`, without the `origin/` prefix.
    pub async fn get_all_branches(&self, prefix: &str) -> RepoResult<Vec<String>> {
        let session = self.session()?;
        let branches = session
            .engine()
            .branch(&["-r"])
            .await
            .map_err(session.fail("list branches", None))?;

        Ok(branches
            .into_iter()
            .filter(|branch| branch.symref.is_none())
            .filter_map(|branch| naming::strip_remote_prefix(&branch.name).map(str::to_string))
            .filter(|name| name.starts_with(prefix))
            .collect())
    }

    /// A branch is stale when its tip no longer contains the base branch tip.
    pub async fn is_branch_stale(&self, branch: &str) -> RepoResult<bool> {
        let session = self.session()?;
        let base = remote_ref(&session.base_branch);
        let containing = session
            .engine()
            .branch(&["-r", "--contains", &base])
            .await
            .map_err(session.fail("check staleness", Some(branch)))?;

        let tracking = remote_ref(branch);
        let stale = !containing.iter().any(|b| b.name == tracking);
        debug!("Branch '{branch}' stale against {base}: {stale}");
        Ok(stale)
    }

    /// Every tracked file path on `branch` (default: the base branch).
    ///
    /// Empty when the branch does not exist.
    pub async fn get_file_list(&self, branch: Option<&str>) -> RepoResult<Vec<String>> {
        let session = self.session()?;
        let branch = branch.unwrap_or(&session.base_branch);

        if !self.branch_exists(branch).await {
            return Ok(Vec::new());
        }

        let listing = match session
            .engine()
            .raw(&["ls-tree", "-r", "-z", "--name-only", &remote_ref(branch)])
            .await
        {
            Ok(listing) => listing,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(session.fail("list files", Some(branch))(e)),
        };

        // NUL-separated so git does not quote unusual names.
        Ok(listing
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Content of `path` on `branch` (default: the base branch), or `None`
    /// when the branch or the path does not exist there.
    pub async fn try_get_file(
        &self,
        path: &str,
        branch: Option<&str>,
    ) -> RepoResult<Option<Vec<u8>>> {
        let session = self.session()?;
        let branch = branch.unwrap_or(&session.base_branch);

        if self.try_resolve_branch(branch).await?.is_none() {
            return Ok(None);
        }

        let spec = format!("{}:{}", remote_ref(branch), path);
        match session.engine().raw(&["cat-file", "-t", &spec]).await {
            Ok(kind) if kind == "blob" => {}
            Ok(kind) => {
                debug!("'{path}' on '{branch}' is a {kind}, not a file");
                return Ok(None);
            }
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(session.fail("read file", Some(branch))(e)),
        }

        match session.engine().show(&spec).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(session.fail("read file", Some(branch))(e)),
        }
    }

    /// Like [`try_get_file`](Self::try_get_file), but any failure reads as absence.
    pub async fn get_file(&self, path: &str, branch: Option<&str>) -> Option<Vec<u8>> {
        match self.try_get_file(path, branch).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Treating '{path}' as absent: {e}");
                None
            }
        }
    }
}
