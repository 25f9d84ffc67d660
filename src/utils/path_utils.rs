use std::path::{Component, Path, PathBuf};

/// Collapses `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }
    components.iter().collect()
}

/// Resolves symlinks when the path exists, otherwise normalizes it lexically.
fn resolve(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| normalize_path(path))
}

pub fn is_same_directory(a: &Path, b: &Path) -> bool {
    resolve(a) == resolve(b)
}

/// Path of `package_path` relative to `workspace_root`, e.g. `packages/ui`.
///
/// Returns `.` for the root itself and the resolved absolute path for packages outside
/// the workspace.
pub fn relative_package_path(package_path: &Path, workspace_root: &Path) -> String {
    let package = resolve(package_path);
    let root = resolve(workspace_root);
    match package.strip_prefix(&root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => package.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dots() {
        assert_eq!(normalize_path(Path::new("/ws/./a/../b")), PathBuf::from("/ws/b"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn same_directory_ignores_trailing_segments() {
        assert!(is_same_directory(Path::new("/ws/app"), Path::new("/ws/app/.")));
        assert!(is_same_directory(Path::new("/ws/app/../app"), Path::new("/ws/app")));
        assert!(!is_same_directory(Path::new("/ws/app"), Path::new("/ws")));
    }

    #[test]
    fn relative_paths_inside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("packages").join("ui");
        std::fs::create_dir_all(&pkg).unwrap();

        assert_eq!(relative_package_path(&pkg, dir.path()), "packages/ui");
        assert_eq!(relative_package_path(dir.path(), dir.path()), ".");
    }

    #[test]
    fn packages_outside_workspace_stay_absolute() {
        let rel = relative_package_path(Path::new("/elsewhere/pkg"), Path::new("/ws"));
        assert_eq!(PathBuf::from(rel), PathBuf::from("/elsewhere/pkg"));
    }
}
