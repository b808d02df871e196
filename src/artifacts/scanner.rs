//! Artifact scanner
//!
//! Lists the output directory (non-recursively), classifies each file by its
//! name and checks that the result describes exactly one release. Nothing is
//! written and nothing is sent over the network.

use super::{Artifact, ArtifactKind, PublishRun};
use crate::core::error::PublishError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const MANIFEST_SUFFIX: &str = "_SHA256SUMS";
pub const SIGNATURE_SUFFIX: &str = "_SHA256SUMS.sig";
pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const DELIMITER: char = '_';

/// Result of parsing a release archive filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveName {
    Parsed {
        product: String,
        version: String,
        platform: String,
        arch: String,
    },
    Unrecognized,
}

/// Classification of a single directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileClass {
    ChecksumManifest { product: String, version: String },
    ChecksumSignature { product: String, version: String },
    ReleaseArchive(ArchiveName),
    Unrecognized,
}

/// Parse `<product>_<version>_<platform>_<arch>.zip`.
///
/// Anything that does not split into exactly four non-empty segments, or
/// whose version segment is not a semantic version, is `Unrecognized`.
pub fn parse_archive_name(name: &str) -> ArchiveName {
    let Some(stem) = name.strip_suffix(ARCHIVE_EXTENSION) else {
        return ArchiveName::Unrecognized;
    };

    let segments: Vec<&str> = stem.split(DELIMITER).collect();
    let [product, version, platform, arch] = segments.as_slice() else {
        return ArchiveName::Unrecognized;
    };

    if [product, version, platform, arch].iter().any(|s| s.is_empty())
        || semver::Version::parse(version).is_err()
    {
        return ArchiveName::Unrecognized;
    }

    ArchiveName::Parsed {
        product: product.to_string(),
        version: version.to_string(),
        platform: platform.to_string(),
        arch: arch.to_string(),
    }
}

/// Split `<product>_<version>` from the stem of a manifest or signature name
fn split_product_version(stem: &str) -> Option<(String, String)> {
    let (product, version) = stem.rsplit_once(DELIMITER)?;
    if product.is_empty() || version.is_empty() {
        return None;
    }
    Some((product.to_string(), version.to_string()))
}

/// Classify a filename by suffix
pub fn classify_filename(name: &str) -> FileClass {
    // The signature suffix contains the manifest suffix, so it goes first.
    if let Some(stem) = name.strip_suffix(SIGNATURE_SUFFIX) {
        return match split_product_version(stem) {
            Some((product, version)) => FileClass::ChecksumSignature { product, version },
            None => FileClass::Unrecognized,
        };
    }
    if let Some(stem) = name.strip_suffix(MANIFEST_SUFFIX) {
        return match split_product_version(stem) {
            Some((product, version)) => FileClass::ChecksumManifest { product, version },
            None => FileClass::Unrecognized,
        };
    }
    if name.ends_with(ARCHIVE_EXTENSION) {
        return FileClass::ReleaseArchive(parse_archive_name(name));
    }
    FileClass::Unrecognized
}

/// Scans an output directory for the artifacts of one release
#[derive(Debug, Clone)]
pub struct ArtifactScanner {
    dist_dir: PathBuf,
}

impl ArtifactScanner {
    pub fn new<P: AsRef<Path>>(dist_dir: P) -> Self {
        Self {
            dist_dir: dist_dir.as_ref().to_path_buf(),
        }
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// List, classify and validate the directory contents
    ///
    /// # Errors
    ///
    /// [`PublishError::Io`] if the directory cannot be listed, and
    /// [`PublishError::ArtifactClassification`] unless the directory holds
    /// exactly one manifest, exactly one signature and at least one archive,
    /// all for the same version.
    pub fn scan(&self) -> Result<PublishRun, PublishError> {
        let root = std::path::absolute(&self.dist_dir)
            .map_err(|e| PublishError::io(&self.dist_dir, e))?;

        let mut manifests = Vec::new();
        let mut signatures = Vec::new();
        let mut archives = Vec::new();

        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| PublishError::io(&root, e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                warn!(path = %entry.path().display(), "skipping file with non UTF-8 name");
                continue;
            };
            let path = entry.path().to_path_buf();

            match classify_filename(name) {
                FileClass::ChecksumManifest { version, .. } => {
                    debug!(name, "found checksum manifest");
                    manifests.push(Artifact::new(
                        name,
                        ArtifactKind::ChecksumManifest,
                        version,
                        path,
                    ));
                }
                FileClass::ChecksumSignature { version, .. } => {
                    debug!(name, "found checksum signature");
                    signatures.push(Artifact::new(
                        name,
                        ArtifactKind::ChecksumSignature,
                        version,
                        path,
                    ));
                }
                FileClass::ReleaseArchive(ArchiveName::Parsed {
                    version,
                    platform,
                    arch,
                    ..
                }) => {
                    debug!(name, %platform, %arch, "found release archive");
                    archives.push(Artifact::new(
                        name,
                        ArtifactKind::ReleaseArchive { platform, arch },
                        version,
                        path,
                    ));
                }
                FileClass::ReleaseArchive(ArchiveName::Unrecognized) => {
                    warn!(
                        name,
                        "skipping archive not named <product>_<version>_<os>_<arch>.zip"
                    );
                }
                FileClass::Unrecognized => {
                    debug!(name, "ignoring unrelated file");
                }
            }
        }

        let manifest = exactly_one(manifests, "checksum manifest (*_SHA256SUMS)")?;
        let signature = exactly_one(signatures, "checksum signature (*_SHA256SUMS.sig)")?;

        if archives.is_empty() {
            return Err(PublishError::classification(format!(
                "no release archives (*_<version>_<os>_<arch>.zip) found in {}",
                root.display()
            )));
        }

        let version = manifest.version().to_string();
        if semver::Version::parse(&version).is_err() {
            return Err(PublishError::classification(format!(
                "'{}' in {} is not a semantic version",
                version,
                manifest.name()
            )));
        }

        let mismatched: Vec<String> = std::iter::once(&signature)
            .chain(archives.iter())
            .filter(|a| a.version() != version)
            .map(|a| format!("{} ({})", a.name(), a.version()))
            .collect();
        if !mismatched.is_empty() {
            return Err(PublishError::classification(format!(
                "artifacts disagree on the release version {}: {}",
                version,
                mismatched.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        for archive in &archives {
            if let Some(platform) = archive.platform()
                && !seen.insert(platform)
            {
                return Err(PublishError::classification(format!(
                    "more than one archive for {}/{}",
                    platform.0, platform.1
                )));
            }
        }

        Ok(PublishRun {
            version,
            manifest,
            signature,
            archives,
        })
    }
}

fn exactly_one(mut found: Vec<Artifact>, what: &str) -> Result<Artifact, PublishError> {
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(PublishError::classification(format!("no {} found", what))),
        n => Err(PublishError::classification(format!(
            "expected exactly one {}, found {}: {}",
            what,
            n,
            found
                .iter()
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dist_with(files: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for file in files {
            fs::write(temp_dir.path().join(file), file.as_bytes()).unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_parse_archive_name() {
        assert_eq!(
            parse_archive_name("acme_1.2.0_linux_amd64.zip"),
            ArchiveName::Parsed {
                product: "acme".to_string(),
                version: "1.2.0".to_string(),
                platform: "linux".to_string(),
                arch: "amd64".to_string(),
            }
        );
        assert_eq!(
            parse_archive_name("terraform-provider-looker_0.0.3_darwin_arm64.zip"),
            ArchiveName::Parsed {
                product: "terraform-provider-looker".to_string(),
                version: "0.0.3".to_string(),
                platform: "darwin".to_string(),
                arch: "arm64".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_archive_name_unrecognized() {
        for name in [
            "acme_linux_amd64.zip",
            "acme_1.2.0_linux_amd64_extra.zip",
            "acme_1.2.0__amd64.zip",
            "acme_latest_linux_amd64.zip",
            "acme_1.2.0_linux_amd64.tar.gz",
            "notes.zip",
        ] {
            assert_eq!(parse_archive_name(name), ArchiveName::Unrecognized, "{}", name);
        }
    }

    #[test]
    fn test_classify_filename() {
        assert_eq!(
            classify_filename("acme_1.2.0_SHA256SUMS"),
            FileClass::ChecksumManifest {
                product: "acme".to_string(),
                version: "1.2.0".to_string()
            }
        );
        assert_eq!(
            classify_filename("acme_1.2.0_SHA256SUMS.sig"),
            FileClass::ChecksumSignature {
                product: "acme".to_string(),
                version: "1.2.0".to_string()
            }
        );
        assert!(matches!(
            classify_filename("acme_1.2.0_linux_amd64.zip"),
            FileClass::ReleaseArchive(ArchiveName::Parsed { .. })
        ));
        assert_eq!(classify_filename("_SHA256SUMS"), FileClass::Unrecognized);
        assert_eq!(classify_filename("metadata.json"), FileClass::Unrecognized);
    }

    #[test]
    fn test_scan_single_archive() {
        let dist = dist_with(&[
            "acme_1.2.0_SHA256SUMS",
            "acme_1.2.0_SHA256SUMS.sig",
            "acme_1.2.0_linux_amd64.zip",
        ]);

        let run = ArtifactScanner::new(dist.path()).scan().unwrap();

        assert_eq!(run.version, "1.2.0");
        assert_eq!(run.archives.len(), 1);
        assert_eq!(run.manifest.name(), "acme_1.2.0_SHA256SUMS");
        assert_eq!(run.signature.name(), "acme_1.2.0_SHA256SUMS.sig");
        assert_eq!(run.archives[0].platform(), Some(("linux", "amd64")));
        assert!(run.manifest.path().is_absolute());
        assert!(run.archives[0].path().is_absolute());
    }

    #[test]
    fn test_scan_many_archives_share_version() {
        let dist = dist_with(&[
            "acme_2.0.1_SHA256SUMS",
            "acme_2.0.1_SHA256SUMS.sig",
            "acme_2.0.1_linux_amd64.zip",
            "acme_2.0.1_linux_arm64.zip",
            "acme_2.0.1_darwin_arm64.zip",
            "acme_2.0.1_windows_amd64.zip",
        ]);

        let run = ArtifactScanner::new(dist.path()).scan().unwrap();

        assert_eq!(run.archives.len(), 4);
        assert_eq!(run.signature.version(), "2.0.1");
        assert!(run.archives.iter().all(|a| a.version() == "2.0.1"));
    }

    #[test]
    fn test_scan_ignores_unrelated_files() {
        let dist = dist_with(&[
            "acme_1.2.0_SHA256SUMS",
            "acme_1.2.0_SHA256SUMS.sig",
            "acme_1.2.0_linux_amd64.zip",
            "metadata.json",
            "artifacts.json",
            "config.yaml",
            "acme_snapshot.zip",
        ]);
        fs::create_dir(dist.path().join("acme_linux_amd64_v1")).unwrap();

        let run = ArtifactScanner::new(dist.path()).scan().unwrap();
        assert_eq!(run.archives.len(), 1);
    }

    #[test]
    fn test_scan_missing_manifest() {
        let dist = dist_with(&["acme_1.2.0_SHA256SUMS.sig", "acme_1.2.0_linux_amd64.zip"]);

        let err = ArtifactScanner::new(dist.path()).scan().unwrap_err();
        assert_eq!(err.code(), "ARTIFACT_CLASSIFICATION");
        assert!(err.to_string().contains("checksum manifest"));
    }

    #[test]
    fn test_scan_missing_signature() {
        let dist = dist_with(&["acme_1.2.0_SHA256SUMS", "acme_1.2.0_linux_amd64.zip"]);

        let err = ArtifactScanner::new(dist.path()).scan().unwrap_err();
        assert!(err.to_string().contains("checksum signature"));
    }

    #[test]
    fn test_scan_multiple_signatures() {
        let dist = dist_with(&[
            "acme_1.2.0_SHA256SUMS",
            "acme_1.2.0_SHA256SUMS.sig",
            "other_1.2.0_SHA256SUMS.sig",
            "acme_1.2.0_linux_amd64.zip",
        ]);

        let err = ArtifactScanner::new(dist.path()).scan().unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_scan_no_archives() {
        let dist = dist_with(&["acme_1.2.0_SHA256SUMS", "acme_1.2.0_SHA256SUMS.sig"]);

        let err = ArtifactScanner::new(dist.path()).scan().unwrap_err();
        assert!(err.to_string().contains("no release archives"));
    }

    #[test]
    fn test_scan_version_mismatch() {
        let dist = dist_with(&[
            "acme_1.2.0_SHA256SUMS",
            "acme_1.2.0_SHA256SUMS.sig",
            "acme_1.2.0_linux_amd64.zip",
            "acme_1.1.9_darwin_amd64.zip",
        ]);

        let err = ArtifactScanner::new(dist.path()).scan().unwrap_err();
        assert!(err.to_string().contains("acme_1.1.9_darwin_amd64.zip"));
    }

    #[test]
    fn test_scan_manifest_version_not_semver() {
        let dist = dist_with(&[
            "acme_latest_SHA256SUMS",
            "acme_latest_SHA256SUMS.sig",
            "acme_1.2.0_linux_amd64.zip",
        ]);

        let err = ArtifactScanner::new(dist.path()).scan().unwrap_err();
        assert!(err.to_string().contains("not a semantic version"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = ArtifactScanner::new(temp_dir.path().join("dist"))
            .scan()
            .unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
