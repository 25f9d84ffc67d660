use crate::config::{Config, TerminalReuseStrategy};
use crate::error::AppError;
use crate::terminal::{ReuseOptions, Terminal, TerminalHost, TerminalPool};
use std::path::Path;
use std::sync::{Arc, RwLock as StdRwLock};
use tracing::{debug, instrument};

pub const MAX_TERMINAL_NAME_LENGTH: usize = 80;
pub const WORKSPACE_POOL_KEY: &str = "workspace";
pub const SINGLE_POOL_KEY: &str = "single";

/// Pool slot for a strategy, `None` when the pool is bypassed.
pub fn pool_key(strategy: TerminalReuseStrategy, working_directory: &Path) -> Option<String> {
    match strategy {
        TerminalReuseStrategy::None => None,
        TerminalReuseStrategy::PerPackage => Some(working_directory.to_string_lossy().into_owned()),
        TerminalReuseStrategy::PerWorkspace => Some(WORKSPACE_POOL_KEY.to_string()),
        // Same behaviour as per-workspace today, kept as its own slot.
        TerminalReuseStrategy::Single => Some(SINGLE_POOL_KEY.to_string()),
    }
}

pub fn terminal_name(package_name: &str, script_name: &str) -> String {
    let display_name = if package_name.trim().is_empty() {
        script_name
    } else {
        package_name
    };
    let full_name = format!("Script: {}", display_name);
    if full_name.chars().count() <= MAX_TERMINAL_NAME_LENGTH {
        return full_name;
    }
    let mut truncated: String = full_name.chars().take(MAX_TERMINAL_NAME_LENGTH - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Resolves the terminal for a script run according to the configured reuse strategy.
pub struct TerminalPoolManager {
    config: Arc<StdRwLock<Config>>,
    host: Arc<dyn TerminalHost>,
    pool: TerminalPool,
}

impl TerminalPoolManager {
    pub fn create(config: Arc<StdRwLock<Config>>, host: Arc<dyn TerminalHost>) -> Self {
        let pool = TerminalPool::new(host.clone());
        Self { config, host, pool }
    }

    #[instrument(skip(self), fields(cwd = %working_directory.display()))]
    pub fn get_or_create_terminal(
        &self,
        script_name: &str,
        package_name: &str,
        working_directory: &Path,
    ) -> Result<Arc<dyn Terminal>, AppError> {
        // Read on every call so setting changes apply to the next run.
        let terminal_config = self
            .config
            .read()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Config lock poisoned: {}", e)))?
            .terminal
            .clone();
        let name = terminal_name(package_name, script_name);

        match pool_key(terminal_config.terminal_reuse_strategy, working_directory) {
            None => {
                debug!(%name, "Reuse disabled, creating a standalone terminal");
                let terminal = self.host.create_terminal(&name, working_directory)?;
                terminal.show();
                Ok(terminal)
            }
            Some(key) => {
                let options = ReuseOptions {
                    clear_before_reuse: terminal_config.clear_terminal_before_reuse,
                    max_terminals: terminal_config.max_terminals,
                };
                self.pool.get_or_create_terminal(&key, &name, working_directory, &options)
            }
        }
    }

    pub fn pool(&self) -> &TerminalPool {
        &self.pool
    }

    pub fn dispose(&mut self) {
        self.pool.dispose();
    }
}
