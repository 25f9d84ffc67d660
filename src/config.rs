use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MAX_TERMINALS: usize = 10;
pub const DEFAULT_SEARCH_CACHE_MAX_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_root: PathBuf,
    pub terminal: TerminalConfig,
    pub search_cache_max_bytes: usize,
    pub recent_commands_file: PathBuf,
    pub default_shell: Option<String>,
    pub shell_integration: bool,
    pub log_level: String,
}

/// Terminal reuse policy. Read fresh by the pool manager on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    pub terminal_reuse_strategy: TerminalReuseStrategy,
    pub clear_terminal_before_reuse: bool,
    pub max_terminals: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            terminal_reuse_strategy: TerminalReuseStrategy::PerPackage,
            clear_terminal_before_reuse: true,
            max_terminals: DEFAULT_MAX_TERMINALS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalReuseStrategy {
    None,
    #[default]
    PerPackage,
    PerWorkspace,
    Single,
}

impl TerminalReuseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalReuseStrategy::None => "none",
            TerminalReuseStrategy::PerPackage => "per-package",
            TerminalReuseStrategy::PerWorkspace => "per-workspace",
            TerminalReuseStrategy::Single => "single",
        }
    }

    /// Parses a configured value, falling back to `PerPackage` for anything unrecognised.
    pub fn parse_or_default(value: &str) -> Self {
        match value.parse() {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(error = %e, "Falling back to per-package terminal reuse");
                TerminalReuseStrategy::PerPackage
            }
        }
    }
}

impl fmt::Display for TerminalReuseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalReuseStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(TerminalReuseStrategy::None),
            "per-package" => Ok(TerminalReuseStrategy::PerPackage),
            "per-workspace" => Ok(TerminalReuseStrategy::PerWorkspace),
            "single" => Ok(TerminalReuseStrategy::Single),
            _ => Err(anyhow::anyhow!("Invalid terminal reuse strategy: {}", s)),
        }
    }
}

fn expand_tilde(path_str: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path_str).as_ref())
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(key, value = %v, default, "Invalid boolean setting, using default");
                default
            }
        },
    }
}

impl Config {
    /// Defaults for a workspace, without consulting the environment.
    pub fn for_workspace(workspace_root: PathBuf) -> Self {
        let recent_commands_file = workspace_root.join(".script-runner").join("recent-commands.json");
        Self {
            workspace_root,
            terminal: TerminalConfig::default(),
            search_cache_max_bytes: DEFAULT_SEARCH_CACHE_MAX_BYTES,
            recent_commands_file,
            default_shell: None,
            shell_integration: true,
            log_level: "info".to_string(),
        }
    }

    /// Loads from the environment. `root_override` (the `--root` flag) wins over
    /// `SCRIPT_RUNNER_ROOT`.
    pub fn load(root_override: Option<String>) -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| match (key, &root_override) {
            ("SCRIPT_RUNNER_ROOT", Some(root)) => Some(root.clone()),
            _ => std::env::var(key).ok(),
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_str = match lookup("SCRIPT_RUNNER_ROOT").filter(|s| !s.trim().is_empty()) {
            Some(s) => s,
            None => std::env::current_dir()
                .context("Failed to read the current directory")?
                .to_string_lossy()
                .into_owned(),
        };
        let workspace_root = dunce::canonicalize(expand_tilde(&root_str))
            .context(format!("Failed to canonicalize SCRIPT_RUNNER_ROOT: {}", root_str))?;
        if !workspace_root.is_dir() {
            anyhow::bail!("SCRIPT_RUNNER_ROOT is not a valid directory: {:?}", workspace_root);
        }

        let mut config = Config::for_workspace(workspace_root);

        if let Some(strategy) = lookup("TERMINAL_REUSE_STRATEGY") {
            config.terminal.terminal_reuse_strategy = TerminalReuseStrategy::parse_or_default(&strategy);
        }
        config.terminal.clear_terminal_before_reuse =
            parse_bool("CLEAR_TERMINAL_BEFORE_REUSE", lookup("CLEAR_TERMINAL_BEFORE_REUSE"), true);
        config.terminal.max_terminals = lookup("MAX_TERMINALS")
            .unwrap_or_else(|| DEFAULT_MAX_TERMINALS.to_string())
            .trim()
            .parse::<usize>()
            .context("Invalid MAX_TERMINALS")?;

        config.search_cache_max_bytes = lookup("SEARCH_CACHE_MAX_BYTES")
            .unwrap_or_else(|| DEFAULT_SEARCH_CACHE_MAX_BYTES.to_string())
            .trim()
            .parse::<usize>()
            .context("Invalid SEARCH_CACHE_MAX_BYTES")?;

        if let Some(file) = lookup("RECENT_COMMANDS_FILE").filter(|s| !s.trim().is_empty()) {
            let path = expand_tilde(&file);
            config.recent_commands_file = if path.is_absolute() {
                path
            } else {
                config.workspace_root.join(path)
            };
        }

        config.default_shell = lookup("DEFAULT_SHELL").filter(|s| !s.is_empty());
        config.shell_integration = parse_bool("SHELL_INTEGRATION", lookup("SHELL_INTEGRATION"), true);
        config.log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(config)
    }
}
