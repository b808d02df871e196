//! Core traits and types for provider publishing
//!
//! [`RegistryApi`] is the seam between the orchestrator and the registry:
//! the HTTP client implements it for real runs, and tests swap in a
//! recording fake.

use crate::core::error::PublishError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Upload targets
// ============================================================================

/// One-time upload URLs returned when a version is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionUploadTargets {
    /// Target for the checksum manifest
    pub shasums_upload: String,
    /// Target for the manifest signature
    pub shasums_sig_upload: String,
}

/// Platform entry to register for a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRequest {
    pub os: String,
    pub arch: String,
    /// Lowercase hex SHA-256 of the archive
    pub shasum: String,
    /// Base filename of the archive
    pub filename: String,
}

// ============================================================================
// Registry API Trait
// ============================================================================

/// Registry operations needed to publish one provider version
///
/// Every call is a single request/response pair. Implementations must not
/// retry, and must report a malformed response as an error rather than
/// guessing at missing links.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Create `version`, signed by `key_id`
    ///
    /// Fails with [`PublishError::RegistryConflict`] on any non-2xx response,
    /// most commonly because the version already exists.
    async fn create_version(
        &self,
        version: &str,
        key_id: &str,
    ) -> Result<VersionUploadTargets, PublishError>;

    /// Register a platform binary for `version` and return its upload target
    async fn create_platform(
        &self,
        version: &str,
        platform: &PlatformRequest,
    ) -> Result<String, PublishError>;

    /// Send the raw bytes of `path` to a one-time upload target
    ///
    /// Fails with [`PublishError::Upload`] on any status of 300 or above.
    async fn upload_to_target(&self, target: &str, path: &Path) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_request_serialization() {
        let request = PlatformRequest {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            shasum: "ab".repeat(32),
            filename: "acme_1.2.0_linux_amd64.zip".to_string(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"os\":\"linux\""));
        assert!(json.contains("acme_1.2.0_linux_amd64.zip"));
    }
}
