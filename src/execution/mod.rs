pub mod command;

use crate::error::AppError;
use crate::package_manager::detect_package_manager;
use crate::recent::RecentCommandsProvider;
use crate::terminal::TerminalPoolManager;
use crate::types::{RecentCommand, SelectedScript};
use crate::utils::path_utils::relative_package_path;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub use command::generate_command;

/// Runs `script` in a pooled terminal and records it as a recent command.
///
/// Errors are user-facing and name the stage that failed. Recording the recent command
/// happens on a detached task: it is not awaited and its failure never fails the run.
#[instrument(skip(terminals, recent), fields(script = %script.script_name, package = %script.package_name))]
pub async fn execute_script(
    script: &SelectedScript,
    workspace_path: &Path,
    terminals: &TerminalPoolManager,
    recent: Option<Arc<dyn RecentCommandsProvider>>,
) -> Result<(), AppError> {
    let manager = detect_package_manager(workspace_path).await;
    debug!(%manager, "Using package manager");

    let command = generate_command(script, manager, workspace_path)
        .map_err(|e| AppError::user_facing(e, "generating command"))?;

    let terminal = terminals
        .get_or_create_terminal(&script.script_name, &script.package_name, &script.package_path)
        .map_err(|e| AppError::user_facing(e, "executing script"))?;
    terminal.send_text(&command);
    info!(%command, terminal = %terminal.name(), "Script sent to terminal");

    if let Some(recent) = recent {
        let entry = RecentCommand {
            script_name: script.script_name.clone(),
            package_name: script.package_name.clone(),
            package_path: relative_package_path(&script.package_path, workspace_path),
            script_command: script.script_command.clone(),
            timestamp: Utc::now().timestamp_millis(),
            workspace_folder: Some(workspace_path.to_string_lossy().into_owned()),
        };
        tokio::spawn(async move {
            if let Err(e) = recent.add(entry).await {
                warn!(error = %e, "Failed to record recent command");
            }
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::recent::RecentCommandsStore;
    use crate::terminal::mock::{settle, MockTerminalHost};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::RwLock as StdRwLock;

    struct FailingRecent;

    #[async_trait]
    impl RecentCommandsProvider for FailingRecent {
        async fn get_validated(&self, _: &Path) -> Result<Vec<RecentCommand>, AppError> {
            Err(AppError::StorageError("offline".to_string()))
        }
        async fn add(&self, _: RecentCommand) -> Result<(), AppError> {
            Err(AppError::StorageError("offline".to_string()))
        }
        async fn clear(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("apps/web")).unwrap();
        dir
    }

    fn manager(root: &Path) -> (TerminalPoolManager, Arc<MockTerminalHost>) {
        let config = Arc::new(StdRwLock::new(Config::for_workspace(root.to_path_buf())));
        let host = MockTerminalHost::new();
        (TerminalPoolManager::create(config, host.clone()), host)
    }

    fn web_build(root: &Path) -> SelectedScript {
        SelectedScript {
            package_name: "web".to_string(),
            package_path: root.join("apps/web"),
            script_name: "build".to_string(),
            script_command: "vite build".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_generated_command_and_records_it() {
        let dir = workspace();
        let (terminals, host) = manager(dir.path());
        let store = Arc::new(RecentCommandsStore::new(dir.path().join("recent.json")));

        execute_script(&web_build(dir.path()), dir.path(), &terminals, Some(store.clone()))
            .await
            .unwrap();

        let terminal = &host.created()[0];
        assert_eq!(terminal.sent(), vec!["pnpm --filter web build".to_string()]);
        assert_eq!(terminal.cwd, dir.path().join("apps/web"));

        let mut recorded = Vec::new();
        for _ in 0..50 {
            recorded = store.get_recent_commands().await.unwrap();
            if !recorded.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].package_path, "apps/web");
        assert_eq!(recorded[0].script_command, "vite build");
        assert!(recorded[0].timestamp > 0);
    }

    #[tokio::test]
    async fn recording_failure_does_not_fail_the_run() {
        let dir = workspace();
        let (terminals, host) = manager(dir.path());

        let result = execute_script(&web_build(dir.path()), dir.path(), &terminals, Some(Arc::new(FailingRecent))).await;
        settle().await;

        assert!(result.is_ok());
        assert_eq!(host.created_count(), 1);
    }

    #[tokio::test]
    async fn terminal_failure_is_user_facing() {
        let dir = workspace();
        let (terminals, host) = manager(dir.path());
        host.fail_creation(true);

        let err = execute_script(&web_build(dir.path()), dir.path(), &terminals, None)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Error executing script:"), "{}", err);
    }

    #[tokio::test]
    async fn sentinel_selection_fails_at_command_generation() {
        let dir = workspace();
        let (terminals, host) = manager(dir.path());
        let sentinel = SelectedScript {
            package_name: String::new(),
            package_path: PathBuf::new(),
            script_name: String::new(),
            script_command: String::new(),
        };

        let err = execute_script(&sentinel, dir.path(), &terminals, None).await.unwrap_err();

        assert!(err.to_string().starts_with("Error generating command:"));
        assert_eq!(host.created_count(), 0);
    }
}
