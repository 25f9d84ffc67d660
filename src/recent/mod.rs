pub mod store;
pub mod validator;

use crate::error::AppError;
use crate::types::RecentCommand;
use async_trait::async_trait;
use std::path::Path;

pub use store::RecentCommandsStore;

/// Source of recently executed scripts for the picker and the "run last" command.
#[async_trait]
pub trait RecentCommandsProvider: Send + Sync {
    /// Recent commands, newest first, restricted to scripts that still exist.
    async fn get_validated(&self, workspace_root: &Path) -> Result<Vec<RecentCommand>, AppError>;

    async fn add(&self, command: RecentCommand) -> Result<(), AppError>;

    async fn clear(&self) -> Result<(), AppError>;
}
