use std::io::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] anyhow::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Terminal error: {0}")]
    TerminalError(String),

    #[error("Terminal pool lock poisoned: {0}")]
    PoolLockPoisoned(String),

    #[error("Recent commands storage error: {0}")]
    StorageError(String),

    // Display is the message shown to the user, see `format_user_error`.
    #[error("Error {context}: {message}")]
    UserFacing { context: String, message: String },
}

impl AppError {
    /// Wraps an error from one stage of script execution into the message shown to the user.
    pub fn user_facing(err: AppError, context: &str) -> Self {
        AppError::UserFacing {
            context: context.to_string(),
            message: describe(&err),
        }
    }
}

/// Formats an error for display in a notice, prefixed with the operation that failed.
pub fn format_user_error(err: &AppError, context: &str) -> String {
    format!("Error {}: {}", context, describe(err))
}

fn describe(err: &AppError) -> String {
    match err {
        AppError::StdIoError(io_err) => match io_err.kind() {
            ErrorKind::NotFound => "The specified file or directory not found".to_string(),
            ErrorKind::PermissionDenied => "Permission denied".to_string(),
            _ => io_err.to_string(),
        },
        // Already user-facing: keep the inner message so contexts don't stack up.
        AppError::UserFacing { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

// Explicit conversion from a poisoned std lock into AppError
impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        AppError::PoolLockPoisoned(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_not_found_to_friendly_text() {
        let err = AppError::from(std::io::Error::new(ErrorKind::NotFound, "os error 2"));
        assert_eq!(
            format_user_error(&err, "discovering packages"),
            "Error discovering packages: The specified file or directory not found"
        );
    }

    #[test]
    fn maps_permission_denied() {
        let err = AppError::from(std::io::Error::new(ErrorKind::PermissionDenied, "nope"));
        assert_eq!(format_user_error(&err, "executing script"), "Error executing script: Permission denied");
    }

    #[test]
    fn user_facing_does_not_nest_contexts() {
        let inner = AppError::TerminalError("spawn failed".to_string());
        let wrapped = AppError::user_facing(inner, "executing script");
        assert_eq!(wrapped.to_string(), "Error executing script: Terminal error: spawn failed");
        assert_eq!(
            format_user_error(&wrapped, "running last script"),
            "Error running last script: Terminal error: spawn failed"
        );
    }
}
