use crate::error::AppError;
use crate::package_manager::PackageManager;
use crate::types::SelectedScript;
use crate::utils::path_utils::{is_same_directory, relative_package_path};
use std::path::Path;

/// Workspace selector for a package: its name, or `./<relative path>` when unnamed.
fn package_identifier(script: &SelectedScript, workspace_path: &Path) -> String {
    if !script.package_name.is_empty() {
        return script.package_name.clone();
    }
    let relative = relative_package_path(&script.package_path, workspace_path);
    if relative.starts_with('.') || Path::new(&relative).is_absolute() {
        relative
    } else {
        format!("./{}", relative)
    }
}

fn direct_command(manager: PackageManager, script_name: &str) -> String {
    match manager {
        PackageManager::Npm => format!("npm run {}", script_name),
        PackageManager::Yarn | PackageManager::Pnpm => format!("{} {}", manager, script_name),
    }
}

fn workspace_command(manager: PackageManager, identifier: &str, script_name: &str) -> String {
    match manager {
        PackageManager::Npm => format!("npm run {} --workspace={}", script_name, identifier),
        PackageManager::Yarn => format!("yarn workspace {} {}", identifier, script_name),
        PackageManager::Pnpm => format!("pnpm --filter {} {}", identifier, script_name),
    }
}

/// Shell command that runs `script` with `manager`, as seen from `workspace_path`.
pub fn generate_command(
    script: &SelectedScript,
    manager: PackageManager,
    workspace_path: &Path,
) -> Result<String, AppError> {
    if script.script_name.trim().is_empty() {
        return Err(AppError::InvalidPath(format!(
            "No script selected for package at {}",
            script.package_path.display()
        )));
    }

    if is_same_directory(&script.package_path, workspace_path) {
        return Ok(direct_command(manager, &script.script_name));
    }
    let identifier = package_identifier(script, workspace_path);
    Ok(workspace_command(manager, &identifier, &script.script_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn script(name: &str, path: &str) -> SelectedScript {
        SelectedScript {
            package_name: name.to_string(),
            package_path: PathBuf::from(path),
            script_name: "build".to_string(),
            script_command: "tsc".to_string(),
        }
    }

    #[test]
    fn root_package_runs_directly() {
        let root = script("root", "/ws");
        let ws = Path::new("/ws");
        assert_eq!(generate_command(&root, PackageManager::Npm, ws).unwrap(), "npm run build");
        assert_eq!(generate_command(&root, PackageManager::Yarn, ws).unwrap(), "yarn build");
        assert_eq!(generate_command(&root, PackageManager::Pnpm, ws).unwrap(), "pnpm build");
    }

    #[test]
    fn nested_package_uses_workspace_selectors() {
        let ui = script("@acme/ui", "/ws/packages/ui");
        let ws = Path::new("/ws");
        assert_eq!(
            generate_command(&ui, PackageManager::Npm, ws).unwrap(),
            "npm run build --workspace=@acme/ui"
        );
        assert_eq!(
            generate_command(&ui, PackageManager::Yarn, ws).unwrap(),
            "yarn workspace @acme/ui build"
        );
        assert_eq!(
            generate_command(&ui, PackageManager::Pnpm, ws).unwrap(),
            "pnpm --filter @acme/ui build"
        );
    }

    #[test]
    fn unnamed_package_falls_back_to_relative_path() {
        let unnamed = script("", "/ws/tools/gen");
        assert_eq!(
            generate_command(&unnamed, PackageManager::Pnpm, Path::new("/ws")).unwrap(),
            "pnpm --filter ./tools/gen build"
        );
    }

    #[test]
    fn rejects_empty_script_name() {
        let mut sentinel = script("x", "/ws");
        sentinel.script_name = String::new();
        assert!(generate_command(&sentinel, PackageManager::Npm, Path::new("/ws")).is_err());
    }
}
