use crate::picker::PickerEntry;
use crate::types::{RecentCommand, ScriptQuickPickItem};
use std::path::Path;

pub const RECENT_SEPARATOR_LABEL: &str = "Recent Commands";

/// Human readable age of a millisecond timestamp relative to `now_ms`.
pub fn format_time_ago(timestamp_ms: i64, now_ms: i64) -> String {
    let seconds = (now_ms - timestamp_ms).max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds <= 30 {
        "Just now".to_string()
    } else if minutes < 1 {
        format!("{} seconds ago", seconds)
    } else if minutes == 1 {
        "1 minute ago".to_string()
    } else if minutes < 60 {
        format!("{} minutes ago", minutes)
    } else if hours == 1 {
        "1 hour ago".to_string()
    } else if hours < 24 {
        format!("{} hours ago", hours)
    } else if days == 1 {
        "Yesterday".to_string()
    } else {
        format!("{} days ago", days)
    }
}

fn command_to_item(command: &RecentCommand, workspace_root: &Path, now_ms: i64) -> ScriptQuickPickItem {
    ScriptQuickPickItem {
        label: command.script_name.clone(),
        description: format_time_ago(command.timestamp, now_ms),
        detail: format!("package {}", command.package_name),
        package_name: command.package_name.clone(),
        package_path: workspace_root.join(&command.package_path),
        script_name: command.script_name.clone(),
        script_command: command.script_command.clone(),
        always_show: false,
    }
}

/// Separator plus one entry per command; empty when there are no commands.
pub fn create_recent_quick_pick_items(
    commands: &[RecentCommand],
    workspace_root: &Path,
    now_ms: i64,
) -> Vec<PickerEntry> {
    if commands.is_empty() {
        return Vec::new();
    }
    std::iter::once(PickerEntry::Separator(RECENT_SEPARATOR_LABEL.to_string()))
        .chain(
            commands
                .iter()
                .map(|c| PickerEntry::Script(command_to_item(c, workspace_root, now_ms))),
        )
        .collect()
}
