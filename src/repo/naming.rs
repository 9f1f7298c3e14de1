use std::path::{Component, Path};

use crate::error::{RepoError, RepoResult};

/// Name of the single remote every working copy tracks.
pub const REMOTE: &str = "origin";

/// `origin/<branch>`: the remote-tracking ref queries resolve through.
pub fn remote_ref(branch: &str) -> String {
    format!("{REMOTE}/{branch}")
}

/// Refspec pushing local `branch` to the same name on the remote.
pub fn branch_refspec(branch: &str) -> String {
    format!("refs/heads/{branch}:refs/heads/{branch}")
}

/// `origin/feature/x` -> `feature/x`.
pub fn strip_remote_prefix(name: &str) -> Option<&str> {
    name.strip_prefix(REMOTE)?.strip_prefix('/')
}

/// `refs/remotes/origin/main` -> `main`.
pub fn strip_tracking_ref(full: &str) -> Option<&str> {
    full.trim()
        .strip_prefix("refs/remotes/")
        .and_then(strip_remote_prefix)
        .filter(|name| !name.is_empty())
}

/// Accept only paths that stay inside the working copy.
pub fn validate_relative_path(path: &str) -> RepoResult<&Path> {
    let invalid = |reason: &'static str| RepoError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("empty path"));
    }

    let relative = Path::new(path);
    for component in relative.components() {
        match component {
            Component::Normal(part) if part == ".git" => {
                return Err(invalid("writes into repository metadata"))
            }
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("escapes the working copy")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("must be relative"))
            }
        }
    }

    Ok(relative)
}
