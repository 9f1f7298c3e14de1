//! Git engine backed by the `git` CLI.
//!
//! Every call spawns `git` through [`tokio::process::Command`] inside the
//! working directory, with terminal prompts disabled so a missing credential
//! fails fast instead of hanging.

use async_trait::async_trait;
use chrono::DateTime;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::{
    BranchInfo, CloneOptions, EngineError, EngineResult, FetchOptions, LogEntry, LogOptions,
    PushOptions, ResetMode, VersionControlEngine,
};

const BRANCH_FORMAT: &str = "--format=%(HEAD)%00%(refname)%00%(objectname)%00%(symref)";
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%aI%x1f%s%x1e";

/// Fragments of git's stderr that mean "the thing you asked for is not there".
const NOT_FOUND_MARKERS: &[&str] = &[
    "unknown revision",
    "bad revision",
    "invalid object name",
    "not a valid object name",
    "does not exist",
    "exists on disk, but not in",
    "needed a single revision",
    "not a tree object",
    "no such ref",
    "not a symbolic ref",
];

/// Git engine using the git CLI.
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: PathBuf) -> Self {
        Self { workdir }
    }

    /// Run a git command and return raw stdout.
    async fn run(&self, args: &[&str]) -> EngineResult<Vec<u8>> {
        debug!("git {} (in {})", args.join(" "), self.workdir.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                command: args.join(" "),
                source,
            })?;

        if !output.status.success() {
            return Err(classify_failure(args, &output));
        }

        Ok(output.stdout)
    }

    /// Run a git command and return stdout as a trimmed string.
    async fn run_text(&self, args: &[&str]) -> EngineResult<String> {
        let stdout = self.run(args).await?;
        Ok(String::from_utf8_lossy(&stdout).trim_end().to_string())
    }

    async fn run_ok(&self, args: &[&str]) -> EngineResult<()> {
        self.run(args).await?;
        Ok(())
    }
}

#[async_trait]
impl VersionControlEngine for GitCli {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn clone_from(&self, url: &str, options: &CloneOptions) -> EngineResult<()> {
        tokio::fs::create_dir_all(&self.workdir)
            .await
            .map_err(|source| EngineError::Spawn {
                command: "clone".to_string(),
                source,
            })?;

        let depth = options.depth.map(|d| d.to_string());
        let mut args = vec!["clone"];
        if let Some(depth) = depth.as_deref() {
            args.extend(["--depth", depth]);
        }
        if options.all_branches {
            args.push("--no-single-branch");
        }
        args.extend([url, "."]);

        self.run_ok(&args).await
    }

    async fn fetch(&self, remote: &str, options: &FetchOptions) -> EngineResult<()> {
        let depth = options.depth.map(|d| format!("--depth={d}"));
        let refspec = format!("+refs/heads/*:refs/remotes/{remote}/*");

        let mut args = vec!["fetch"];
        if options.prune {
            args.push("--prune");
        }
        if let Some(depth) = depth.as_deref() {
            args.push(depth);
        }
        args.push(remote);
        if options.all_branches {
            args.push(&refspec);
        }

        self.run_ok(&args).await
    }

    async fn raw(&self, args: &[&str]) -> EngineResult<String> {
        self.run_text(args).await
    }

    async fn checkout(&self, args: &[&str]) -> EngineResult<()> {
        let mut full = vec!["checkout", "-q"];
        full.extend_from_slice(args);
        self.run_ok(&full).await
    }

    async fn reset(&self, mode: ResetMode) -> EngineResult<()> {
        self.run_ok(&["reset", "-q", mode.as_flag()]).await
    }

    async fn add(&self, paths: &[&str]) -> EngineResult<()> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.run_ok(&args).await
    }

    async fn commit(&self, message: &str) -> EngineResult<()> {
        self.run_ok(&["commit", "-q", "-m", message]).await
    }

    async fn push(&self, remote: &str, refspec: &str, options: &PushOptions) -> EngineResult<()> {
        let mut args = vec!["push", "-q"];
        if options.force {
            args.push("--force");
        }
        args.extend([remote, refspec]);
        self.run_ok(&args).await
    }

    async fn branch(&self, args: &[&str]) -> EngineResult<Vec<BranchInfo>> {
        let mut full = vec!["branch", "--no-color", BRANCH_FORMAT];
        full.extend_from_slice(args);
        let stdout = self.run_text(&full).await?;
        Ok(parse_branch_listing(&stdout))
    }

    async fn revparse(&self, revision: &str) -> EngineResult<String> {
        let peeled = format!("{revision}^{{commit}}");
        match self
            .run_text(&["rev-parse", "--verify", "--quiet", &peeled])
            .await
        {
            Err(EngineError::NotFound { .. }) => Err(EngineError::NotFound {
                target: revision.to_string(),
            }),
            other => other,
        }
    }

    async fn log(&self, options: &LogOptions) -> EngineResult<Vec<LogEntry>> {
        let max_count = options.max_count.map(|n| format!("--max-count={n}"));

        let mut args = vec!["log", LOG_FORMAT];
        if let Some(max_count) = max_count.as_deref() {
            args.push(max_count);
        }
        args.push(options.revision.as_deref().unwrap_or("HEAD"));
        args.push("--");

        let stdout = self.run_text(&args).await?;
        parse_log(&stdout)
    }

    async fn show(&self, spec: &str) -> EngineResult<Vec<u8>> {
        self.run(&["show", spec]).await
    }
}

fn classify_failure(args: &[&str], output: &Output) -> EngineError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let lowered = stderr.to_lowercase();

    // `rev-parse --verify --quiet` reports a missing ref with a bare exit code.
    let silent_miss = args.first() == Some(&"rev-parse") && stderr.is_empty();

    if silent_miss || NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
        return EngineError::NotFound {
            target: args.last().copied().unwrap_or_default().to_string(),
        };
    }

    EngineError::Command {
        command: args.join(" "),
        status: output.status.to_string(),
        stderr,
    }
}

/// Parse `git branch` output produced with [`BRANCH_FORMAT`].
fn parse_branch_listing(stdout: &str) -> Vec<BranchInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\0');
            let head = fields.next()?;
            let refname = fields.next()?;
            let commit = fields.next()?;
            let symref = fields.next().unwrap_or_default();

            // Detached HEAD shows up as a pseudo-entry without a refs/ name.
            let name = short_ref_name(refname)?;

            Some(BranchInfo {
                name: name.to_string(),
                commit: commit.to_string(),
                current: head.trim() == "*",
                symref: short_ref_name(symref).map(str::to_string),
            })
        })
        .collect()
}

fn short_ref_name(refname: &str) -> Option<&str> {
    refname
        .strip_prefix("refs/heads/")
        .or_else(|| refname.strip_prefix("refs/remotes/"))
        .filter(|name| !name.is_empty())
}

/// Parse `git log` output produced with [`LOG_FORMAT`].
fn parse_log(stdout: &str) -> EngineResult<Vec<LogEntry>> {
    stdout
        .split('\x1e')
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let fields: Vec<&str> = record.split('\x1f').collect();
            let [hash, author_name, author_email, date, subject] = fields.as_slice() else {
                return Err(EngineError::Parse {
                    command: "log".to_string(),
                    detail: format!("expected 5 fields, got {}", fields.len()),
                });
            };

            let author_date =
                DateTime::parse_from_rfc3339(date.trim()).map_err(|e| EngineError::Parse {
                    command: "log".to_string(),
                    detail: format!("bad author date '{date}': {e}"),
                })?;

            Ok(LogEntry {
                hash: hash.to_string(),
                author_name: author_name.to_string(),
                author_email: author_email.to_string(),
                author_date,
                subject: subject.to_string(),
            })
        })
        .collect()
}
