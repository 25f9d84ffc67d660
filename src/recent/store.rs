use crate::error::AppError;
use crate::recent::validator::{commands_changed, validate_recent_commands};
use crate::recent::RecentCommandsProvider;
use crate::types::RecentCommand;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, instrument, warn};

pub const MAX_RECENT_COMMANDS: usize = 15;
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentCommandsStorage {
    pub version: u32,
    pub commands: Vec<RecentCommand>,
}

impl RecentCommandsStorage {
    fn new(commands: Vec<RecentCommand>) -> Self {
        Self {
            version: CURRENT_VERSION,
            commands,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCommands {
    Versioned(RecentCommandsStorage),
    Legacy(Vec<RecentCommand>),
}

fn dedup_key(command: &RecentCommand) -> (&str, &str) {
    (&command.package_name, &command.script_name)
}

/// Recent commands persisted as JSON in one file.
pub struct RecentCommandsStore {
    file: PathBuf,
    // Serializes read-modify-write cycles.
    lock: TokioMutex<()>,
}

impl RecentCommandsStore {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            lock: TokioMutex::new(()),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    async fn read_storage(&self) -> Result<RecentCommandsStorage, AppError> {
        let content = match fs::read_to_string(&self.file).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecentCommandsStorage::new(Vec::new())),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(RecentCommandsStorage::new(Vec::new()));
        }

        match serde_json::from_str::<StoredCommands>(&content)
            .map_err(|e| AppError::StorageError(format!("{}: {}", self.file.display(), e)))?
        {
            StoredCommands::Versioned(storage) => Ok(storage),
            StoredCommands::Legacy(commands) => {
                info!(file = %self.file.display(), "Migrating unversioned recent commands");
                let migrated = RecentCommandsStorage::new(commands);
                self.write_storage(&migrated).await?;
                Ok(migrated)
            }
        }
    }

    async fn write_storage(&self, storage: &RecentCommandsStorage) -> Result<(), AppError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(storage)?;
        fs::write(&self.file, json).await?;
        debug!(file = %self.file.display(), count = storage.commands.len(), "Saved recent commands");
        Ok(())
    }

    pub async fn get_recent_commands(&self) -> Result<Vec<RecentCommand>, AppError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_storage().await?.commands)
    }

    pub async fn add_recent_command(&self, command: RecentCommand) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let storage = self.read_storage().await.unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable recent commands, starting over");
            RecentCommandsStorage::new(Vec::new())
        });

        let mut commands = Vec::with_capacity(MAX_RECENT_COMMANDS);
        let key = (command.package_name.clone(), command.script_name.clone());
        commands.push(command);
        commands.extend(
            storage
                .commands
                .into_iter()
                .filter(|c| dedup_key(c) != (key.0.as_str(), key.1.as_str())),
        );
        commands.truncate(MAX_RECENT_COMMANDS);

        self.write_storage(&RecentCommandsStorage::new(commands)).await
    }

    pub async fn clear_recent_commands(&self) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        self.write_storage(&RecentCommandsStorage::new(Vec::new())).await
    }

    /// Recent commands that still exist on disk, writing the cleaned list back when it changed.
    #[instrument(skip(self), fields(root = %workspace_root.display()))]
    pub async fn get_validated_recent_commands(&self, workspace_root: &Path) -> Result<Vec<RecentCommand>, AppError> {
        let _guard = self.lock.lock().await;
        let storage = self.read_storage().await?;
        let validated = validate_recent_commands(&storage.commands, workspace_root).await;

        if commands_changed(&storage.commands, &validated) {
            self.write_storage(&RecentCommandsStorage::new(validated.clone())).await?;
        }
        Ok(validated)
    }
}

#[async_trait]
impl RecentCommandsProvider for RecentCommandsStore {
    async fn get_validated(&self, workspace_root: &Path) -> Result<Vec<RecentCommand>, AppError> {
        self.get_validated_recent_commands(workspace_root).await
    }

    async fn add(&self, command: RecentCommand) -> Result<(), AppError> {
        self.add_recent_command(command).await
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.clear_recent_commands().await
    }
}
