//! Error handling for provider publishing
//!
//! Every failure in a publish run is terminal. The variants here carry enough
//! context (step, target, path) for the operator to see what broke, plus a
//! short list of suggested follow-ups.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for provider publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    /// Local `dist` contents do not describe exactly one release
    #[error("artifact classification failed: {message}")]
    ArtifactClassification { message: String },

    /// A registration call (create version / create platform) was rejected
    /// or returned a response the client could not understand
    #[error("registry rejected {operation}{}: {message}", status_suffix(.status))]
    RegistryConflict {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// Transfer of file bytes to a one-time upload target failed
    #[error(
        "failed to upload {} to {target}{}: {message}",
        .path.display(),
        status_suffix(.status)
    )]
    Upload {
        target: String,
        path: PathBuf,
        status: Option<u16>,
        message: String,
    },

    /// A local file could not be opened or read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing or invalid environment configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl PublishError {
    pub fn classification(message: impl Into<String>) -> Self {
        Self::ArtifactClassification {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status attached to this error, if the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RegistryConflict { status, .. } | Self::Upload { status, .. } => *status,
            _ => None,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ArtifactClassification { .. } => vec![
                "Check that the build produced exactly one SHA256SUMS file and its .sig",
                "Check that every archive is named <product>_<version>_<os>_<arch>.zip",
            ],
            Self::RegistryConflict {
                status: Some(409), ..
            }
            | Self::RegistryConflict {
                status: Some(422), ..
            } => vec![
                "The version or platform probably exists already; bump the release version",
                "Remove the partially published version from the registry before re-running",
            ],
            Self::RegistryConflict {
                status: Some(401), ..
            }
            | Self::RegistryConflict {
                status: Some(403), ..
            } => vec![
                "Check that TF_TOKEN is valid and has access to the organization",
            ],
            Self::RegistryConflict { .. } => vec![
                "Check the registry status and network connectivity",
                "Earlier registry steps are not rolled back; inspect the version before re-running",
            ],
            Self::Upload { .. } => vec![
                "Upload targets are single-use; the version must be cleaned up before re-running",
                "Check network connectivity",
            ],
            Self::Io { .. } => vec!["Check that the file exists and is readable"],
            Self::Config { .. } => vec!["Set TF_TOKEN and KEY_ID in the environment"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArtifactClassification { .. } => "ARTIFACT_CLASSIFICATION",
            Self::RegistryConflict { .. } => "REGISTRY_CONFLICT",
            Self::Upload { .. } => "UPLOAD_FAILED",
            Self::Io { .. } => "IO_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_error() {
        let error = PublishError::classification("no SHA256SUMS file found");

        assert_eq!(error.code(), "ARTIFACT_CLASSIFICATION");
        assert!(error.status().is_none());
        assert!(error.to_string().contains("no SHA256SUMS file found"));
    }

    #[test]
    fn test_registry_conflict_display_with_status() {
        let error = PublishError::RegistryConflict {
            operation: "create version 1.2.0".to_string(),
            status: Some(422),
            message: "version already exists".to_string(),
        };

        let display = error.to_string();
        assert!(display.contains("create version 1.2.0"));
        assert!(display.contains("HTTP 422"));
        assert_eq!(error.status(), Some(422));
        assert!(
            error
                .suggested_actions()
                .iter()
                .any(|a| a.contains("bump the release version"))
        );
    }

    #[test]
    fn test_registry_conflict_without_status() {
        let error = PublishError::RegistryConflict {
            operation: "create platform linux/amd64".to_string(),
            status: None,
            message: "operation timed out".to_string(),
        };

        assert!(!error.to_string().contains("HTTP"));
        assert_eq!(error.code(), "REGISTRY_CONFLICT");
    }

    #[test]
    fn test_upload_error_names_path_and_target() {
        let error = PublishError::Upload {
            target: "https://archivist.example/v1/object/****".to_string(),
            path: PathBuf::from("dist/acme_1.2.0_SHA256SUMS"),
            status: Some(500),
            message: "internal error".to_string(),
        };

        let display = error.to_string();
        assert!(display.contains("dist/acme_1.2.0_SHA256SUMS"));
        assert!(display.contains("archivist.example"));
        assert_eq!(error.code(), "UPLOAD_FAILED");
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let error = PublishError::io(
            "dist/missing.zip",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );

        assert!(error.source().is_some());
        assert_eq!(error.code(), "IO_ERROR");
    }

    #[test]
    fn test_config_error() {
        let error = PublishError::config("TF_TOKEN is not set");
        assert_eq!(error.code(), "CONFIG_ERROR");
        assert!(!error.suggested_actions().is_empty());
    }
}
