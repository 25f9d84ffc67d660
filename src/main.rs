// FILE: src/main.rs
mod config;
mod discovery;
mod error;
mod execution;
mod package_manager;
mod picker;
mod recent;
mod runner;
mod search;
mod terminal;
mod types;
mod utils;

use crate::config::Config;
use crate::discovery::discover_packages;
use crate::package_manager::detect_package_manager;
use crate::picker::console::ConsoleQuickPick;
use crate::picker::PickerSession;
use crate::recent::{RecentCommandsProvider, RecentCommandsStore};
use crate::runner::{ConsoleNotifier, RunOutcome, ScriptRunner};
use crate::search::ScriptSearchIndex;
use crate::terminal::shell::ShellTerminalHost;
use crate::terminal::{TerminalEvent, TerminalHost};
use crate::utils::path_utils::relative_package_path;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt::format::FmtSpan, FmtSubscriber};

#[derive(Parser)]
#[command(name = "script-runner")]
#[command(about = "Fuzzy-search package.json scripts across a workspace and run them in reused terminals")]
#[command(version)]
struct Cli {
    /// Workspace root (defaults to SCRIPT_RUNNER_ROOT, then the current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick scripts interactively and run them (default)
    Pick,
    /// Re-run the most recent command
    Last,
    /// List every script in the workspace
    List,
    /// Print the scripts matching a query
    Search {
        /// Search text, e.g. "build web"
        query: String,
    },
    /// Forget the recent commands of this workspace
    ClearRecent,
}

fn setup_logging(log_level_str: &str) {
    let level = match log_level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("script_runner={}", level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

async fn warn_if_package_manager_missing(workspace_root: &Path) {
    let manager = detect_package_manager(workspace_root).await;
    if which::which(manager.as_str()).is_err() {
        tracing::warn!(
            %manager,
            "{} is not installed or not in PATH. Scripts will fail to start in the terminal.",
            manager
        );
    }
}

async fn list_scripts(config: &Config) -> Result<()> {
    let packages = discover_packages(&config.workspace_root).await;
    if packages.is_empty() {
        println!("No scripts found in workspace");
        return Ok(());
    }
    for package in &packages {
        let (Some(name), Some(scripts)) = (&package.name, &package.scripts) else {
            continue;
        };
        if scripts.is_empty() {
            continue;
        }
        println!("{}  ({})", name, relative_package_path(&package.path, &config.workspace_root));
        for (script, command) in scripts {
            println!("  {:<24} {}", script, command);
        }
    }
    Ok(())
}

async fn search_scripts(config: &Config, query: &str) -> Result<()> {
    let packages = discover_packages(&config.workspace_root).await;
    let mut index = ScriptSearchIndex::from_packages(&packages, config.search_cache_max_bytes);
    for item in index.search(query) {
        if item.is_selectable() {
            println!("{:<24} {:<32} {}", item.script_name, item.package_name, item.script_command);
        } else {
            println!("{} ({})", item.label, item.detail);
        }
    }
    Ok(())
}

/// Waits until a terminal finishes its command, or for Ctrl-C without shell integration.
async fn wait_for_completion(events: &mut broadcast::Receiver<TerminalEvent>, shell_integration: bool) {
    let finished = async {
        if !shell_integration {
            return std::future::pending::<()>().await;
        }
        loop {
            match events.recv().await {
                Ok(TerminalEvent::ExecutionEnded(_)) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
            }
        }
    };
    tokio::select! {
        _ = finished => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }
}

async fn run_interactive(config: Config, last_only: bool) -> Result<()> {
    let shell_integration = config.shell_integration;
    let host = Arc::new(ShellTerminalHost::new(config.default_shell.clone(), shell_integration));
    let mut host_events = host.subscribe();
    let recent = Arc::new(RecentCommandsStore::new(config.recent_commands_file.clone()));
    let (quick_pick, picker_events) = ConsoleQuickPick::from_stdin();
    let picker = PickerSession::new(Box::new(quick_pick), picker_events);

    let config = Arc::new(StdRwLock::new(config));
    let mut runner = ScriptRunner::create(config, host, recent, Arc::new(ConsoleNotifier), picker);

    if last_only {
        if let RunOutcome::Executed(_) = runner.run_last_script().await {
            wait_for_completion(&mut host_events, shell_integration).await;
        }
    } else {
        loop {
            match runner.run_script().await {
                RunOutcome::Cancelled => break,
                RunOutcome::Executed(_) | RunOutcome::Failed | RunOutcome::Declined => continue,
            }
        }
    }

    runner.dispose();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root_override = cli.root.map(|p| p.to_string_lossy().into_owned());
    let config = Config::load(root_override).context("Failed to load configuration")?;
    setup_logging(&config.log_level);

    tracing::info!(
        version = %env!("CARGO_PKG_VERSION"),
        root = %config.workspace_root.display(),
        "Starting script-runner"
    );
    tracing::debug!("Loaded configuration: {:?}", config);

    match cli.command.unwrap_or(Commands::Pick) {
        Commands::List => list_scripts(&config).await?,
        Commands::Search { query } => search_scripts(&config, &query).await?,
        Commands::ClearRecent => {
            RecentCommandsStore::new(config.recent_commands_file.clone())
                .clear()
                .await
                .context("Failed to clear recent commands")?;
            println!("Recent commands cleared");
        }
        Commands::Pick => {
            warn_if_package_manager_missing(&config.workspace_root).await;
            run_interactive(config, false).await?;
        }
        Commands::Last => {
            warn_if_package_manager_missing(&config.workspace_root).await;
            run_interactive(config, true).await?;
        }
    }

    tracing::info!("Shutdown.");
    Ok(())
}
