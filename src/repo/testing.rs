//! Scripted in-memory engine for driving `RepositoryManager` in unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::RepositoryManager;
use crate::config::{RepositoryConfig, WorkspaceSettings};
use crate::scm::{
    BranchInfo, CloneOptions, EngineError, EngineFactory, EngineResult, FetchOptions, LogEntry,
    LogOptions, PushOptions, ResetMode, VersionControlEngine,
};

/// What the fake remote looks like, plus switches for injected failures.
#[derive(Default)]
pub(crate) struct FakeState {
    /// Every engine call, rendered as `"<method> <args>"`.
    pub calls: Vec<String>,
    pub fail_fetch: bool,
    pub fail_clone: bool,
    pub fail_merge: bool,
    pub fail_remote_delete: Option<EngineError>,
    /// Output of `symbolic-ref refs/remotes/origin/HEAD`.
    pub default_ref: Option<String>,
    /// Remote-tracking refs (`origin/<name>`) to commit ids.
    pub refs: HashMap<String, String>,
    /// Remote-tracking refs whose tip contains the base branch tip.
    pub containing_base: Vec<String>,
    /// `<rev>:<path>` to blob contents.
    pub blobs: HashMap<String, Vec<u8>>,
    /// Revision or range to log output.
    pub logs: HashMap<String, Vec<LogEntry>>,
}

impl FakeState {
    pub fn with_branches(branches: &[(&str, &str)]) -> Self {
        let mut state = FakeState {
            default_ref: Some("refs/remotes/origin/main".to_string()),
            ..Default::default()
        };
        for (name, sha) in branches {
            state.refs.insert(format!("origin/{name}"), sha.to_string());
        }
        state
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.iter().any(|call| call.starts_with(prefix))
    }
}

pub(crate) type SharedState = Arc<Mutex<FakeState>>;

pub(crate) struct FakeEngine {
    workdir: PathBuf,
    state: SharedState,
}

impl FakeEngine {
    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn command_error(command: &str) -> EngineError {
    EngineError::Command {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        stderr: format!("{command} failed"),
    }
}

fn not_found(target: &str) -> EngineError {
    EngineError::NotFound {
        target: target.to_string(),
    }
}

#[async_trait]
impl VersionControlEngine for FakeEngine {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn clone_from(&self, url: &str, options: &CloneOptions) -> EngineResult<()> {
        self.record(format!(
            "clone {url} depth={:?} all={}",
            options.depth, options.all_branches
        ));
        if self.state.lock().unwrap().fail_clone {
            return Err(command_error("clone"));
        }
        Ok(())
    }

    async fn fetch(&self, remote: &str, options: &FetchOptions) -> EngineResult<()> {
        self.record(format!(
            "fetch {remote} depth={:?} all={} prune={}",
            options.depth, options.all_branches, options.prune
        ));
        if self.state.lock().unwrap().fail_fetch {
            return Err(command_error("fetch"));
        }
        Ok(())
    }

    async fn raw(&self, args: &[&str]) -> EngineResult<String> {
        self.record(format!("raw {}", args.join(" ")));
        let mut state = self.state.lock().unwrap();

        match args {
            ["symbolic-ref", target] => state.default_ref.clone().ok_or_else(|| not_found(target)),
            ["ls-tree", "-r", "-z", "--name-only", rev] => {
                let prefix = format!("{rev}:");
                let mut paths: Vec<&str> = state
                    .blobs
                    .keys()
                    .filter_map(|key| key.strip_prefix(&prefix))
                    .collect();
                paths.sort();
                Ok(paths.iter().map(|path| format!("{path}\0")).collect())
            }
            ["cat-file", "-t", spec] => {
                let dir = format!("{spec}/");
                if state.blobs.contains_key(*spec) {
                    Ok("blob".to_string())
                } else if state.blobs.keys().any(|key| key.starts_with(&dir)) {
                    Ok("tree".to_string())
                } else {
                    Err(not_found(spec))
                }
            }
            ["push", "origin", "--delete", name] => {
                if let Some(err) = state.fail_remote_delete.take() {
                    return Err(err);
                }
                state.refs.remove(&format!("origin/{name}"));
                Ok(String::new())
            }
            ["branch", "-D", _] => Err(command_error("branch -D")),
            ["merge", "--no-edit", _] if state.fail_merge => Err(command_error("merge")),
            _ => Ok(String::new()),
        }
    }

    async fn checkout(&self, args: &[&str]) -> EngineResult<()> {
        self.record(format!("checkout {}", args.join(" ")));
        Ok(())
    }

    async fn reset(&self, mode: ResetMode) -> EngineResult<()> {
        self.record(format!("reset {}", mode.as_flag()));
        Ok(())
    }

    async fn add(&self, paths: &[&str]) -> EngineResult<()> {
        self.record(format!("add {}", paths.join(" ")));
        Ok(())
    }

    async fn commit(&self, message: &str) -> EngineResult<()> {
        self.record(format!("commit {message}"));
        Ok(())
    }

    async fn push(&self, remote: &str, refspec: &str, options: &PushOptions) -> EngineResult<()> {
        self.record(format!("push {remote} {refspec} force={}", options.force));
        Ok(())
    }

    async fn branch(&self, args: &[&str]) -> EngineResult<Vec<BranchInfo>> {
        self.record(format!("branch {}", args.join(" ")));
        let state = self.state.lock().unwrap();

        let names: Vec<String> = if args.contains(&"--contains") {
            state.containing_base.clone()
        } else {
            let mut names: Vec<String> = state.refs.keys().cloned().collect();
            names.sort();
            names
        };

        let mut branches: Vec<BranchInfo> = names
            .into_iter()
            .map(|name| BranchInfo {
                commit: state.refs.get(&name).cloned().unwrap_or_default(),
                name,
                current: false,
                symref: None,
            })
            .collect();
        branches.push(BranchInfo {
            name: "origin/HEAD".to_string(),
            commit: String::new(),
            current: false,
            symref: Some("origin/main".to_string()),
        });
        Ok(branches)
    }

    async fn revparse(&self, revision: &str) -> EngineResult<String> {
        self.record(format!("revparse {revision}"));
        let state = self.state.lock().unwrap();
        if revision == "HEAD" {
            return Ok("0000000000000000000000000000000000000head".to_string());
        }
        state
            .refs
            .get(revision)
            .cloned()
            .ok_or_else(|| not_found(revision))
    }

    async fn log(&self, options: &LogOptions) -> EngineResult<Vec<LogEntry>> {
        let revision = options.revision.clone().unwrap_or_else(|| "HEAD".to_string());
        self.record(format!("log {revision} max={:?}", options.max_count));
        let state = self.state.lock().unwrap();
        let entries = state
            .logs
            .get(&revision)
            .cloned()
            .ok_or_else(|| not_found(&revision))?;
        Ok(match options.max_count {
            Some(max) => entries.into_iter().take(max).collect(),
            None => entries,
        })
    }

    async fn show(&self, spec: &str) -> EngineResult<Vec<u8>> {
        self.record(format!("show {spec}"));
        let state = self.state.lock().unwrap();
        state.blobs.get(spec).cloned().ok_or_else(|| not_found(spec))
    }
}

pub(crate) struct FakeFactory {
    pub state: SharedState,
}

impl EngineFactory for FakeFactory {
    fn bind(&self, workdir: &Path) -> Box<dyn VersionControlEngine> {
        Box::new(FakeEngine {
            workdir: workdir.to_path_buf(),
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) fn settings(temp: &TempDir, ephemeral: bool) -> WorkspaceSettings {
    WorkspaceSettings {
        temp_root: temp.path().to_path_buf(),
        platform: "github".to_string(),
        ephemeral,
    }
}

pub(crate) fn fake_manager(temp: &TempDir, state: FakeState) -> (RepositoryManager, SharedState) {
    let shared = Arc::new(Mutex::new(state));
    let manager = RepositoryManager::with_factory(
        settings(temp, true),
        FakeFactory {
            state: Arc::clone(&shared),
        },
    );
    (manager, shared)
}

/// Manager already initialized against `acme/widgets` with base `main`.
pub(crate) async fn initialized_manager(
    temp: &TempDir,
    state: FakeState,
) -> (RepositoryManager, SharedState) {
    let (mut manager, shared) = fake_manager(temp, state);
    manager
        .init_repo(
            RepositoryConfig::new("acme/widgets", "https://example.com/acme/widgets.git")
                .with_base_branch("main")
                .with_author("Update Bot", "bot@example.com"),
        )
        .await
        .unwrap();
    shared.lock().unwrap().calls.clear();
    (manager, shared)
}

pub(crate) fn log_entry(hash: &str, email: &str, date: &str, subject: &str) -> LogEntry {
    LogEntry {
        hash: hash.to_string(),
        author_name: email.split('@').next().unwrap_or_default().to_string(),
        author_email: email.to_string(),
        author_date: chrono::DateTime::parse_from_rfc3339(date).unwrap(),
        subject: subject.to_string(),
    }
}
