use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{RepoError, RepoResult};

const APP_DIR: &str = "branch-warden";

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/branch-warden or ~/.config/branch-warden
    /// - macOS: ~/Library/Application Support/branch-warden
    /// - Windows: %APPDATA%\branch-warden
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join(APP_DIR))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join(APP_DIR))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join("Library").join("Application Support").join(APP_DIR))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join(APP_DIR))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".branch-warden"))
        }
    }

    /// Get the default config file path (config.toml)
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Root under which working copies are kept when none is configured
    pub fn default_temp_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
    }
}

/// Name and address recorded on commits made by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
}

/// Per-repository configuration handed to `init_repo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository identifier, e.g. `owner/project`. Determines the local path.
    pub repository: String,

    /// URL the working copy is cloned from and pushed to.
    pub remote_url: String,

    /// Base branch; resolved from the remote's default branch when unset.
    #[serde(default)]
    pub base_branch: Option<String>,

    #[serde(default)]
    pub author: Option<AuthorIdentity>,
}

impl RepositoryConfig {
    pub fn new(repository: impl Into<String>, remote_url: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            remote_url: remote_url.into(),
            base_branch: None,
            author: None,
        }
    }

    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = Some(branch.into());
        self
    }

    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = Some(AuthorIdentity {
            name: name.into(),
            email: email.into(),
        });
        self
    }
}

/// Process-level settings shared by every repository the manager handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Root directory under which working copies live.
    pub temp_root: PathBuf,

    /// Platform identifier (e.g. `github`, `gitlab`), part of the local path.
    pub platform: String,

    /// Ephemeral mode: never reuse a working copy left by an earlier run.
    pub ephemeral: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            temp_root: ConfigManager::default_temp_root(),
            platform: "github".to_string(),
            ephemeral: false,
        }
    }
}

impl WorkspaceSettings {
    /// Deterministic working-copy location for a repository:
    /// `<temp_root>/repos/<platform>/<repository>`.
    ///
    /// Identifiers that are empty, absolute, or contain `.`/`..` segments are rejected.
    pub fn local_path_for(&self, repository: &str) -> RepoResult<PathBuf> {
        let invalid = |reason: &str| RepoError::Config {
            message: format!("invalid repository identifier '{repository}': {reason}"),
        };

        if repository.trim().is_empty() {
            return Err(invalid("empty"));
        }
        if repository.split('/').any(|segment| segment.is_empty()) {
            return Err(invalid("empty path segment"));
        }
        let relative = Path::new(repository);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(invalid("must be a plain relative path"));
        }

        Ok(self
            .temp_root
            .join("repos")
            .join(&self.platform)
            .join(relative))
    }
}

/// Contents of the config file: workspace settings plus one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    pub repository: RepositoryConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn settings(root: &Path) -> WorkspaceSettings {
        WorkspaceSettings {
            temp_root: root.to_path_buf(),
            platform: "github".to_string(),
            ephemeral: false,
        }
    }

    #[test]
    fn test_config_paths() {
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir.to_string_lossy().contains("branch-warden"));

        let config_file = ConfigManager::config_file_path().unwrap();
        assert!(config_file.to_string_lossy().ends_with("config.toml"));

        assert!(ConfigManager::default_temp_root().ends_with("branch-warden"));
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_xdg_config_home_respected() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-xdg-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir
            .to_string_lossy()
            .contains("/tmp/test-xdg-config/branch-warden"));
        std::env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    fn test_local_path_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());

        let first = settings.local_path_for("acme/widgets").unwrap();
        let second = settings.local_path_for("acme/widgets").unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            temp.path()
                .join("repos")
                .join("github")
                .join("acme")
                .join("widgets")
        );
    }

    #[test]
    fn test_local_path_depends_on_platform() {
        let temp = TempDir::new().unwrap();
        let github = settings(temp.path());
        let gitlab = WorkspaceSettings {
            platform: "gitlab".to_string(),
            ..github.clone()
        };

        assert_ne!(
            github.local_path_for("acme/widgets").unwrap(),
            gitlab.local_path_for("acme/widgets").unwrap()
        );
    }

    #[test]
    fn test_local_path_rejects_escaping_identifiers() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());

        for bad in ["", "../etc", "acme/../../x", "/abs/path", "acme//widgets", "./acme"] {
            assert!(
                settings.local_path_for(bad).is_err(),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::parse(
            r#"
            [workspace]
            temp_root = "/var/tmp/warden"
            platform = "gitlab"
            ephemeral = true

            [repository]
            repository = "acme/widgets"
            remote_url = "https://gitlab.example.com/acme/widgets.git"
            base_branch = "develop"

            [repository.author]
            name = "Update Bot"
            email = "bot@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.workspace.temp_root, PathBuf::from("/var/tmp/warden"));
        assert_eq!(config.workspace.platform, "gitlab");
        assert!(config.workspace.ephemeral);
        assert_eq!(config.repository.base_branch.as_deref(), Some("develop"));
        assert_eq!(
            config.repository.author,
            Some(AuthorIdentity {
                name: "Update Bot".to_string(),
                email: "bot@example.com".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = AppConfig::parse(
            r#"
            [repository]
            repository = "acme/widgets"
            remote_url = "git@github.com:acme/widgets.git"
            "#,
        )
        .unwrap();

        assert_eq!(config.workspace, WorkspaceSettings::default());
        assert!(config.repository.base_branch.is_none());
        assert!(config.repository.author.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load(&temp.path().join("absent.toml"));
        assert!(result.is_err());
    }
}
