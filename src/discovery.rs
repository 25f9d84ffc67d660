use crate::types::{PackageInfo, Scripts};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

const EXCLUDED_DIRECTORIES: [&str; 1] = ["node_modules"];
const PACKAGE_FILE: &str = "package.json";

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    #[serde(default)]
    scripts: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Scripts of a parsed `package.json`, keeping file order and skipping non-string values.
pub fn scripts_from_map(map: &serde_json::Map<String, serde_json::Value>) -> Scripts {
    map.iter()
        .filter_map(|(name, value)| value.as_str().map(|cmd| (name.clone(), cmd.to_string())))
        .collect()
}

/// Reads the scripts of the `package.json` in `dir`. `None` when missing or malformed.
pub async fn read_package_scripts(dir: &Path) -> Option<Scripts> {
    let content = fs::read_to_string(dir.join(PACKAGE_FILE)).await.ok()?;
    let parsed: PackageJson = serde_json::from_str(&content).ok()?;
    Some(parsed.scripts.as_ref().map(scripts_from_map).unwrap_or_default())
}

async fn parse_package_json(file: &Path) -> Option<PackageInfo> {
    let content = match fs::read_to_string(file).await {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Could not read package.json");
            return None;
        }
    };
    let parsed: PackageJson = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Skipping malformed package.json");
            return None;
        }
    };
    let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
    Some(PackageInfo {
        path: dir,
        name: parsed.name.filter(|n| !n.is_empty()),
        scripts: Some(parsed.scripts.as_ref().map(scripts_from_map).unwrap_or_default()),
    })
}

/// Finds every `package.json` under `workspace_root`, skipping dependency directories.
///
/// Unreadable directories and malformed files are skipped; this never fails.
#[instrument(fields(root = %workspace_root.display()))]
pub async fn discover_packages(workspace_root: &Path) -> Vec<PackageInfo> {
    let mut packages = Vec::new();
    let mut dirs_to_visit: Vec<PathBuf> = vec![workspace_root.to_path_buf()];

    while let Some(current_dir) = dirs_to_visit.pop() {
        let mut read_dir = match fs::read_dir(&current_dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(dir = %current_dir.display(), error = %e, "Could not read directory during discovery");
                continue;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %current_dir.display(), error = %e, "Stopped reading directory");
                    break;
                }
            };
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_dir() {
                if !EXCLUDED_DIRECTORIES.contains(&file_name.as_ref()) {
                    dirs_to_visit.push(entry.path());
                }
            } else if file_name == PACKAGE_FILE {
                if let Some(info) = parse_package_json(&entry.path()).await {
                    packages.push(info);
                }
            }
        }
    }

    packages.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = packages.len(), "Discovered packages");
    packages
}
