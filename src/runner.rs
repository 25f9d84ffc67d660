use crate::config::Config;
use crate::discovery::discover_packages;
use crate::error::{format_user_error, AppError};
use crate::execution::execute_script;
use crate::picker::{show_script_picker, PickerSession, RecentSource};
use crate::recent::RecentCommandsProvider;
use crate::terminal::{TerminalHost, TerminalPoolManager};
use crate::types::SelectedScript;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::Mutex as TokioMutex;
use tracing::{error, info, instrument};

pub const ALREADY_RUNNING_MESSAGE: &str = "A script is already running. Please wait for it to complete.";
pub const NO_RECENT_COMMANDS_MESSAGE: &str = "No recent commands found";

/// User-visible notices.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        info!(notice = %message, "Info notice");
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        error!(notice = %message, "Error notice");
        eprintln!("{}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Executed(SelectedScript),
    /// The picker was closed, or there was nothing to run.
    Cancelled,
    /// Another run was in flight.
    Declined,
    Failed,
}

/// Clears the in-flight flag when the run ends, however it ends.
struct ExecutionGuard<'a>(&'a AtomicBool);

impl<'a> ExecutionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn notice_text(err: &AppError, context: &str) -> String {
    match err {
        // Already names the stage that failed.
        AppError::UserFacing { .. } => err.to_string(),
        other => format_user_error(other, context),
    }
}

/// Top-level orchestrator: picks scripts and runs them in pooled terminals.
///
/// Created once with [`ScriptRunner::create`] and torn down with [`ScriptRunner::dispose`].
pub struct ScriptRunner {
    config: Arc<StdRwLock<Config>>,
    terminals: TerminalPoolManager,
    recent: Arc<dyn RecentCommandsProvider>,
    notifier: Arc<dyn Notifier>,
    picker: TokioMutex<PickerSession>,
    executing: AtomicBool,
}

impl ScriptRunner {
    pub fn create(
        config: Arc<StdRwLock<Config>>,
        host: Arc<dyn TerminalHost>,
        recent: Arc<dyn RecentCommandsProvider>,
        notifier: Arc<dyn Notifier>,
        picker: PickerSession,
    ) -> Self {
        let terminals = TerminalPoolManager::create(config.clone(), host);
        Self {
            config,
            terminals,
            recent,
            notifier,
            picker: TokioMutex::new(picker),
            executing: AtomicBool::new(false),
        }
    }

    fn workspace_settings(&self) -> Result<(PathBuf, usize), AppError> {
        let config = self
            .config
            .read()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Config lock poisoned: {}", e)))?;
        Ok((config.workspace_root.clone(), config.search_cache_max_bytes))
    }

    pub fn terminals(&self) -> &TerminalPoolManager {
        &self.terminals
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    /// Discover, pick, execute. A call made while another is in flight is declined.
    #[instrument(skip(self))]
    pub async fn run_script(&self) -> RunOutcome {
        let Some(_guard) = ExecutionGuard::acquire(&self.executing) else {
            self.notifier.info(ALREADY_RUNNING_MESSAGE);
            return RunOutcome::Declined;
        };

        let (workspace_root, cache_bytes) = match self.workspace_settings() {
            Ok(settings) => settings,
            Err(e) => {
                self.notifier.error(&notice_text(&e, "discovering packages"));
                return RunOutcome::Failed;
            }
        };

        let packages = discover_packages(&workspace_root).await;

        let selected = {
            let mut session = self.picker.lock().await;
            let recent = RecentSource {
                provider: self.recent.clone(),
                workspace_root: workspace_root.clone(),
            };
            show_script_picker(&mut session, &packages, cache_bytes, Some(recent)).await
        };
        let Some(selected) = selected else {
            return RunOutcome::Cancelled;
        };

        match execute_script(&selected, &workspace_root, &self.terminals, Some(self.recent.clone())).await {
            Ok(()) => RunOutcome::Executed(selected),
            Err(e) => {
                self.notifier.error(&notice_text(&e, "executing script"));
                RunOutcome::Failed
            }
        }
    }

    /// Re-runs the most recent command that still exists.
    #[instrument(skip(self))]
    pub async fn run_last_script(&self) -> RunOutcome {
        let workspace_root = match self.workspace_settings() {
            Ok((root, _)) => root,
            Err(e) => {
                self.notifier.error(&notice_text(&e, "running last script"));
                return RunOutcome::Failed;
            }
        };

        let commands = match self.recent.get_validated(&workspace_root).await {
            Ok(commands) => commands,
            Err(e) => {
                self.notifier.error(&notice_text(&e, "running last script"));
                return RunOutcome::Failed;
            }
        };
        let Some(last) = commands.into_iter().next() else {
            self.notifier.info(NO_RECENT_COMMANDS_MESSAGE);
            return RunOutcome::Cancelled;
        };

        let selected = SelectedScript {
            package_path: workspace_root.join(&last.package_path),
            package_name: last.package_name,
            script_name: last.script_name,
            script_command: last.script_command,
        };
        self.notifier
            .info(&format!("Running: {} ({})", selected.script_name, selected.package_name));

        match execute_script(&selected, &workspace_root, &self.terminals, Some(self.recent.clone())).await {
            Ok(()) => RunOutcome::Executed(selected),
            Err(e) => {
                self.notifier.error(&notice_text(&e, "running last script"));
                RunOutcome::Failed
            }
        }
    }

    pub fn dispose(&mut self) {
        self.terminals.dispose();
        info!("Script runner disposed");
    }
}
