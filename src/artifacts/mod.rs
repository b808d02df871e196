//! Build artifacts found in the output directory
//!
//! A publish run is made of one checksum manifest, its signature, and one or
//! more platform archives, all for the same version.

pub mod digest;
pub mod manifest;
pub mod scanner;

pub use digest::DigestComputer;
pub use manifest::{ChecksumManifest, ManifestCheck};
pub use scanner::{ArchiveName, ArtifactScanner, FileClass, classify_filename, parse_archive_name};

use crate::core::error::PublishError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of artifact, derived from the filename suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    ReleaseArchive { platform: String, arch: String },
    ChecksumManifest,
    ChecksumSignature,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReleaseArchive { platform, arch } => write!(f, "archive {}/{}", platform, arch),
            Self::ChecksumManifest => f.write_str("checksum manifest"),
            Self::ChecksumSignature => f.write_str("checksum signature"),
        }
    }
}

/// One file found in the output directory
#[derive(Debug, Clone)]
pub struct Artifact {
    name: String,
    kind: ArtifactKind,
    version: String,
    path: PathBuf,
    digest: Option<String>,
    upload_target: Option<String>,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        kind: ArtifactKind,
        version: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            version: version.into(),
            path: path.into(),
            digest: None,
            upload_target: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArtifactKind {
        &self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `(platform, arch)` for release archives
    pub fn platform(&self) -> Option<(&str, &str)> {
        match &self.kind {
            ArtifactKind::ReleaseArchive { platform, arch } => Some((platform, arch)),
            _ => None,
        }
    }

    /// Digest if it has been computed already
    pub fn cached_digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Content digest, computed on first use and cached afterwards
    pub async fn digest(&mut self, computer: &DigestComputer) -> Result<&str, PublishError> {
        let digest = match self.digest.take() {
            Some(digest) => digest,
            None => computer.compute(&self.path).await?,
        };
        Ok(self.digest.insert(digest).as_str())
    }

    /// Attach the one-time upload URL returned by the registry
    pub fn assign_upload_target(&mut self, target: impl Into<String>) {
        self.upload_target = Some(target.into());
    }

    /// Hand out the upload target; a second call returns `None`
    pub fn take_upload_target(&mut self) -> Option<String> {
        self.upload_target.take()
    }
}

/// All artifacts of one invocation, sharing one version
#[derive(Debug, Clone)]
pub struct PublishRun {
    pub version: String,
    pub manifest: Artifact,
    pub signature: Artifact,
    pub archives: Vec<Artifact>,
}
