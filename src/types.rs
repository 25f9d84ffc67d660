use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scripts of one package, in the order they appear in `package.json`.
pub type Scripts = Vec<(String, String)>;

/// One discovered package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub path: PathBuf,
    pub name: Option<String>,
    pub scripts: Option<Scripts>,
}

/// A row of the picker for one (package, script) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptQuickPickItem {
    pub label: String,
    pub description: String,
    pub detail: String,
    pub package_name: String,
    pub package_path: PathBuf,
    pub script_name: String,
    pub script_command: String,
    pub always_show: bool,
}

impl ScriptQuickPickItem {
    /// Placeholder shown when a query matches nothing. Its script fields are empty so it
    /// can never be executed.
    pub fn no_results() -> Self {
        Self {
            label: "No matching scripts".to_string(),
            description: String::new(),
            detail: "Try fewer or shorter search terms".to_string(),
            package_name: String::new(),
            package_path: PathBuf::new(),
            script_name: String::new(),
            script_command: String::new(),
            always_show: true,
        }
    }

    pub fn is_selectable(&self) -> bool {
        !self.script_name.is_empty() && !self.script_command.is_empty()
    }

    pub fn to_selected(&self) -> Option<SelectedScript> {
        if !self.is_selectable() {
            return None;
        }
        Some(SelectedScript {
            package_name: self.package_name.clone(),
            package_path: self.package_path.clone(),
            script_name: self.script_name.clone(),
            script_command: self.script_command.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedScript {
    pub package_name: String,
    pub package_path: PathBuf,
    pub script_name: String,
    pub script_command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCommand {
    pub script_name: String,
    pub package_name: String,
    /// Relative to the workspace root.
    pub package_path: String,
    pub script_command: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_folder: Option<String>,
}
