pub mod busy_tracker;
#[cfg(test)]
pub mod mock;
pub mod pool;
pub mod pool_manager;
pub mod shell;

use crate::error::AppError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use busy_tracker::TerminalBusyTracker;
pub use pool::{ReuseOptions, TerminalPool};
pub use pool_manager::TerminalPoolManager;

/// Identity of a terminal handle. Two handles are the same terminal iff their ids match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalId(Uuid);

impl TerminalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TerminalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notifications a host delivers about its terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    Closed(TerminalId),
    ExecutionStarted(TerminalId),
    ExecutionEnded(TerminalId),
}

/// A live terminal owned by the host.
pub trait Terminal: Send + Sync + fmt::Debug {
    fn id(&self) -> TerminalId;
    fn name(&self) -> &str;
    fn send_text(&self, text: &str);
    fn show(&self);
    fn dispose(&self);
}

/// Terminal capabilities of the host environment.
pub trait TerminalHost: Send + Sync {
    fn create_terminal(&self, name: &str, cwd: &Path) -> Result<Arc<dyn Terminal>, AppError>;

    fn subscribe(&self) -> broadcast::Receiver<TerminalEvent>;

    /// Whether `ExecutionStarted`/`ExecutionEnded` are ever delivered.
    fn supports_execution_events(&self) -> bool;
}
