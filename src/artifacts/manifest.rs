//! Checksum manifest parsing and cross-checking
//!
//! The manifest is the `sha256sum` style file produced next to the archives:
//! one `<hex digest><whitespace><filename>` entry per line. Before anything is
//! sent to the registry, every archive listed there must hash to the digest
//! the manifest claims, otherwise the published signature would vouch for
//! different bytes than the ones being uploaded.

use super::{DigestComputer, PublishRun};
use crate::core::error::PublishError;
use std::collections::HashMap;
use tracing::warn;

/// Parsed checksum manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: HashMap<String, String>,
}

impl ChecksumManifest {
    /// Parse manifest content
    ///
    /// Blank lines are ignored. A `*` in front of the filename (binary mode
    /// marker) is stripped. Any other malformed line is an error.
    pub fn parse(content: &str) -> Result<Self, PublishError> {
        let mut entries = HashMap::new();

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed = line
                .split_once(char::is_whitespace)
                .map(|(digest, name)| (digest, name.trim_start().trim_start_matches('*')))
                .filter(|(digest, name)| {
                    digest.len() == 64
                        && digest.chars().all(|c| c.is_ascii_hexdigit())
                        && !name.is_empty()
                });

            let Some((digest, name)) = parsed else {
                return Err(PublishError::classification(format!(
                    "malformed checksum manifest line {}: '{}'",
                    idx + 1,
                    line
                )));
            };

            entries.insert(name.to_string(), digest.to_ascii_lowercase());
        }

        Ok(Self { entries })
    }

    /// Digest recorded for `filename`
    pub fn digest_for(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of comparing the archives against the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestCheck {
    /// Archives whose digest matched their manifest entry
    pub verified: Vec<String>,
    /// Archives the manifest does not mention
    pub unlisted: Vec<String>,
}

impl ManifestCheck {
    /// Read the run's manifest and compare it with every archive digest
    ///
    /// Digests are cached on the archives, so the publish step reuses them.
    ///
    /// # Errors
    ///
    /// [`PublishError::Io`] if a file cannot be read, and
    /// [`PublishError::ArtifactClassification`] if the manifest is malformed
    /// or lists a different digest for an archive.
    pub async fn run(
        run: &mut PublishRun,
        computer: &DigestComputer,
    ) -> Result<Self, PublishError> {
        let content = tokio::fs::read_to_string(run.manifest.path())
            .await
            .map_err(|e| PublishError::io(run.manifest.path(), e))?;
        let manifest = ChecksumManifest::parse(&content)?;

        let mut check = Self::default();
        for archive in &mut run.archives {
            let name = archive.name().to_string();
            let actual = archive.digest(computer).await?;

            match manifest.digest_for(&name) {
                Some(expected) if expected == actual => check.verified.push(name),
                Some(expected) => {
                    return Err(PublishError::classification(format!(
                        "{} has digest {} but the checksum manifest lists {}",
                        name, actual, expected
                    )));
                }
                None => {
                    warn!(archive = %name, "archive is not listed in the checksum manifest");
                    check.unlisted.push(name);
                }
            }
        }

        Ok(check)
    }
}
