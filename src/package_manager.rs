use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const LOCK_FILES: [(&str, PackageManager); 3] = [
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
];

fn package_manager_field_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(npm|yarn|pnpm)@").ok()).as_ref()
}

/// Parses the `packageManager` field of `package.json`, e.g. `pnpm@9.1.0`.
pub fn parse_package_manager_field(field: &str) -> Option<PackageManager> {
    let captures = package_manager_field_regex()?.captures(field)?;
    match captures.get(1)?.as_str() {
        "npm" => Some(PackageManager::Npm),
        "yarn" => Some(PackageManager::Yarn),
        "pnpm" => Some(PackageManager::Pnpm),
        _ => None,
    }
}

async fn read_package_manager_field(workspace_path: &Path) -> Option<PackageManager> {
    let content = fs::read_to_string(workspace_path.join("package.json")).await.ok()?;
    let data: serde_json::Value = serde_json::from_str(&content).ok()?;
    parse_package_manager_field(data.get("packageManager")?.as_str()?)
}

/// The `packageManager` field wins, then lockfiles in order, then npm.
pub async fn detect_package_manager(workspace_path: &Path) -> PackageManager {
    if let Some(manager) = read_package_manager_field(workspace_path).await {
        debug!(%manager, "Package manager from packageManager field");
        return manager;
    }

    for (file, manager) in LOCK_FILES {
        if fs::try_exists(workspace_path.join(file)).await.unwrap_or(false) {
            debug!(%manager, lockfile = file, "Package manager from lockfile");
            return manager;
        }
    }

    PackageManager::Npm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field() {
        assert_eq!(parse_package_manager_field("pnpm@9.1.0"), Some(PackageManager::Pnpm));
        assert_eq!(parse_package_manager_field("yarn@4.0.0+sha256.abc"), Some(PackageManager::Yarn));
        assert_eq!(parse_package_manager_field("npm@10"), Some(PackageManager::Npm));
        assert_eq!(parse_package_manager_field("bun@1.0.0"), None);
        assert_eq!(parse_package_manager_field("pnpm"), None);
    }

    #[tokio::test]
    async fn field_beats_lockfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"packageManager":"yarn@4.1.0"}"#).unwrap();
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()).await, PackageManager::Yarn);
    }

    #[tokio::test]
    async fn lockfiles_are_checked_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        assert_eq!(detect_package_manager(dir.path()).await, PackageManager::Npm);

        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()).await, PackageManager::Yarn);

        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()).await, PackageManager::Pnpm);
    }

    #[tokio::test]
    async fn defaults_to_npm() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "not json").unwrap();
        assert_eq!(detect_package_manager(dir.path()).await, PackageManager::Npm);
    }
}
