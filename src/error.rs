/**
 * ============================================================================
 * ERROR MODULE
 * ============================================================================
 *
 * PURPOSE: Error taxonomy shared by the capture and playback pipeline
 *
 * CATEGORIES:
 * - PermissionDenied: overlay or notification permission refused
 * - RecorderFault: native start/stop failure
 * - StorageUnavailable: enumeration/delete/read failure on the device store
 * - NotFound: path no longer present
 * - UploadFailed: transport or server-side upload failure
 * - InvalidConfig: configuration rejected by validation
 *
 * Autoplay rejection is not an error here, see feed::playback::PlaybackError.
 *
 * ============================================================================
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result alias used across the crate
pub type FootageResult<T> = Result<T, FootageError>;

/// Device permission required before capture can begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    /// Draw a control surface above other apps while capturing
    Overlay,
    /// Show the persistent "recording in progress" notification
    Notification,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Overlay => write!(f, "overlay"),
            Permission::Notification => write!(f, "notification"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FootageError {
    #[error("Permission denied ({permission}): {message}")]
    PermissionDenied {
        permission: Permission,
        message: String,
    },

    #[error("Recorder fault: {0}")]
    RecorderFault(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Recording not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FootageError {
    pub fn permission_denied(permission: Permission) -> Self {
        let message = match permission {
            Permission::Overlay => "Please enable \"Appear on top\" permission and try again.",
            Permission::Notification => "Notification permission is required for screen recording.",
        };
        FootageError::PermissionDenied {
            permission,
            message: message.to_string(),
        }
    }

    // Sentence suitable for an error banner
    pub fn user_message(&self) -> String {
        match self {
            FootageError::PermissionDenied { message, .. } => message.clone(),
            FootageError::RecorderFault(_) => {
                "Screen recording could not be started or stopped. Please try again.".to_string()
            }
            FootageError::StorageUnavailable(_) => {
                "Recordings are unavailable. Please check storage permissions and retry.".to_string()
            }
            FootageError::NotFound(_) => "This recording no longer exists.".to_string(),
            FootageError::UploadFailed(_) => "Upload failed. Please try again.".to_string(),
            FootageError::InvalidConfig(message) => message.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FootageError::NotFound(_))
    }
}

impl From<std::io::Error> for FootageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FootageError::NotFound(err.to_string()),
            _ => FootageError::StorageUnavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(FootageError::from(missing).is_not_found());

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "revoked");
        assert!(matches!(
            FootageError::from(denied),
            FootageError::StorageUnavailable(_)
        ));
    }

    #[test]
    fn test_permission_denied_is_actionable() {
        let err = FootageError::permission_denied(Permission::Overlay);
        assert!(err.user_message().contains("Appear on top"));
        assert!(err.to_string().contains("overlay"));

        let err = FootageError::permission_denied(Permission::Notification);
        assert!(err.user_message().contains("Notification permission"));
    }
}
