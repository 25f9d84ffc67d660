use crate::discovery::read_package_scripts;
use crate::types::RecentCommand;
use std::path::Path;
use tracing::debug;

/// Checks a command against its package on disk. `None` when the package or script is
/// gone; the script body is refreshed when it changed.
async fn validate_command(command: &RecentCommand, workspace_root: &Path) -> Option<RecentCommand> {
    let scripts = read_package_scripts(&workspace_root.join(&command.package_path)).await?;
    let (_, current) = scripts.into_iter().find(|(name, _)| *name == command.script_name)?;
    if current == command.script_command {
        Some(command.clone())
    } else {
        debug!(script = %command.script_name, "Refreshing changed script body");
        Some(RecentCommand {
            script_command: current,
            ..command.clone()
        })
    }
}

pub async fn validate_recent_commands(commands: &[RecentCommand], workspace_root: &Path) -> Vec<RecentCommand> {
    let mut valid = Vec::with_capacity(commands.len());
    for command in commands {
        match validate_command(command, workspace_root).await {
            Some(validated) => valid.push(validated),
            None => debug!(
                script = %command.script_name,
                package = %command.package_name,
                "Dropping stale recent command"
            ),
        }
    }
    valid
}

/// True when validation dropped or rewrote anything.
pub fn commands_changed(original: &[RecentCommand], validated: &[RecentCommand]) -> bool {
    original.len() != validated.len()
        || original.iter().zip(validated).any(|(a, b)| {
            a.script_command != b.script_command || a.script_name != b.script_name || a.package_name != b.package_name
        })
}
