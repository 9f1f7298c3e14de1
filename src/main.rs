use anyhow::{Context, Result};
use branch_warden::config::{AppConfig, ConfigManager};
use branch_warden::logger;
use branch_warden::repo::{FileChange, RepositoryManager};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "branch-warden")]
#[command(about = "Manage update branches on a local working copy of a remote repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: config.toml in the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Always clone fresh instead of refreshing an existing working copy
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a branch exists on the remote
    Exists { branch: String },

    /// List remote branches
    Branches {
        /// Only branches starting with this prefix
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a branch no longer contains the base branch tip
    Stale { branch: String },

    /// List tracked files on a branch
    Files {
        /// Branch to list (default: base branch)
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Print a file as of a branch tip
    Show {
        path: String,

        /// Branch to read from (default: base branch)
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Create or reset a branch at a commit and push it
    Create { branch: String, sha: String },

    /// Rewrite a branch with one commit of the given files
    Commit {
        branch: String,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Branch to start from (default: base branch)
        #[arg(long)]
        parent: Option<String>,

        /// Local files, committed at the same relative path
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete a branch on the remote and locally
    Delete { branch: String },

    /// Merge a branch into the base branch and push
    Merge { branch: String },

    /// Print the commit id of a branch tip
    Head { branch: String },

    /// Print the author time of a branch tip
    LastCommit { branch: String },

    /// Print recent commit subjects
    Messages {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether someone other than the bot committed to a branch
    Modified { branch: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => ConfigManager::config_file_path()?,
    };
    let mut config = AppConfig::load(&config_path)?;
    config.workspace.ephemeral |= cli.ephemeral;

    let repository = config.repository.repository.clone();
    let mut manager = RepositoryManager::new(config.workspace);
    manager
        .init_repo(config.repository)
        .await
        .with_context(|| format!("Failed to initialize {repository}"))?;

    match cli.command {
        Commands::Exists { branch } => {
            let exists = manager.branch_exists(&branch).await;
            println!("{exists}");
        }
        Commands::Branches { prefix, json } => {
            let branches = manager.get_all_branches(&prefix).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&branches)?);
            } else {
                for branch in branches {
                    println!("{branch}");
                }
            }
        }
        Commands::Stale { branch } => {
            let stale = manager.is_branch_stale(&branch).await?;
            if stale {
                println!("{} {branch} is behind the base branch", "stale".yellow().bold());
            } else {
                println!("{} {branch} contains the base branch", "fresh".green().bold());
            }
        }
        Commands::Files { branch } => {
            for file in manager.get_file_list(branch.as_deref()).await? {
                println!("{file}");
            }
        }
        Commands::Show { path, branch } => match manager.get_file(&path, branch.as_deref()).await {
            Some(contents) => {
                use std::io::Write;
                std::io::stdout().write_all(&contents)?;
            }
            None => {
                eprintln!("{} {path} not found", "Note:".yellow());
                std::process::exit(1);
            }
        },
        Commands::Create { branch, sha } => {
            manager.create_branch(&branch, &sha).await?;
            println!("{} {branch} at {sha}", "Created".green());
        }
        Commands::Commit {
            branch,
            message,
            parent,
            files,
        } => {
            let mut changes = Vec::with_capacity(files.len());
            for file in &files {
                let contents = std::fs::read(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                changes.push(FileChange::new(file.to_string_lossy(), contents));
            }
            let tip = manager
                .commit_files_to_branch(&branch, &changes, &message, parent.as_deref())
                .await?;
            println!("{} {branch} -> {tip}", "Committed".green());
        }
        Commands::Delete { branch } => {
            manager.delete_branch(&branch).await?;
            println!("{} {branch}", "Deleted".green());
        }
        Commands::Merge { branch } => {
            manager.merge_branch(&branch).await?;
            println!(
                "{} {branch} into {}",
                "Merged".green(),
                manager.base_branch()?
            );
        }
        Commands::Head { branch } => {
            println!("{}", manager.get_branch_commit(&branch).await?);
        }
        Commands::LastCommit { branch } => {
            println!(
                "{}",
                manager.get_branch_last_commit_time(&branch).await.to_rfc3339()
            );
        }
        Commands::Messages { json } => {
            let messages = manager.get_commit_messages().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                for message in messages {
                    println!("{message}");
                }
            }
        }
        Commands::Modified { branch } => {
            let modified = manager.is_branch_modified(&branch).await?;
            println!("{modified}");
        }
    }

    Ok(())
}
