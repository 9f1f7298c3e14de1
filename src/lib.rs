//! # branch-warden
//!
//! Repository-state management for an automated dependency-update bot.
//!
//! ## Overview
//!
//! `branch-warden` keeps one local working copy per remote repository and
//! offers branch-level operations on it: create, commit, merge, delete and
//! staleness checks, plus queries for files, branch tips and history. The
//! remote is always the source of truth; queries resolve through the
//! remote-tracking refs (`origin/<branch>`), never local branches.
//!
//! ## Architecture
//!
//! - Configuration and paths ([`config`])
//! - Error types ([`error`])
//! - Version-control engine abstraction and the git CLI engine ([`scm`])
//! - Working-copy lifecycle and branch operations ([`repo`])
//! - Logging setup ([`logger`])
//!
//! ```no_run
//! use branch_warden::config::{RepositoryConfig, WorkspaceSettings};
//! use branch_warden::repo::RepositoryManager;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut manager = RepositoryManager::new(WorkspaceSettings::default());
//! manager
//!     .init_repo(RepositoryConfig::new("acme/widgets", "https://github.com/acme/widgets.git"))
//!     .await?;
//!
//! for branch in manager.get_all_branches("renovate/").await? {
//!     if manager.is_branch_stale(&branch).await? {
//!         println!("{branch} needs a rebase");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Configuration: workspace settings, per-repository config and platform directories.
///
/// Working-copy paths are derived deterministically from the temp root, the
/// platform identifier and the repository identifier, so repeated runs for
/// the same repository reuse the same directory.
pub mod config;

/// Typed errors surfaced by the repository manager.
pub mod error;

/// Logging configuration.
///
/// Sets up console logging through `env_logger`, controlled by `RUST_LOG`.
pub mod logger;

/// Repository lifecycle and branch management.
///
/// [`repo::RepositoryManager`] initializes or refreshes the working copy
/// (shallow fetch, falling back to a fresh clone) and implements every
/// branch query and mutation on top of an injected engine.
pub mod repo;

/// Version-control engine abstraction.
///
/// The [`scm::VersionControlEngine`] trait is what the manager drives;
/// [`scm::GitCli`] implements it over the `git` binary.
pub mod scm;
