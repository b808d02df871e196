//! Publish Orchestrator - drives one provider release into the registry
//!
//! Manages the complete publishing workflow:
//! - Scanning `dist` and checking the archives against the checksum manifest
//! - Creating the registry version
//! - Uploading the checksum manifest, then its signature
//! - Registering and uploading every platform archive
//!
//! Every step runs once, in order. The first failure ends the run; whatever
//! the registry already accepted stays there.

use crate::artifacts::{Artifact, ArtifactScanner, DigestComputer, ManifestCheck, PublishRun};
use crate::core::config::PublishConfig;
use crate::core::error::PublishError;
use crate::core::state_machine::{PublishStage, PublishStateMachine};
use crate::core::traits::{PlatformRequest, RegistryApi};
use crate::security::SecureTokenManager;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// What happened to one platform archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformStatus {
    /// Registered and uploaded
    Published,
    /// Already registered; left untouched
    Skipped,
    /// Dry run only
    Planned,
}

impl fmt::Display for PlatformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published => write!(f, "published"),
            Self::Skipped => write!(f, "skipped (already registered)"),
            Self::Planned => write!(f, "planned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOutcome {
    pub filename: String,
    pub os: String,
    pub arch: String,
    pub shasum: String,
    pub status: PlatformStatus,
}

/// Report returned after a successful run
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub provider: String,
    pub version: String,
    pub dry_run: bool,
    pub platforms: Vec<PlatformOutcome>,
    /// Archives missing from the checksum manifest
    pub unlisted: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub history: String,
}

impl PublishReport {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Provider: {}", self.provider),
            format!("Version:  {}", self.version),
        ];
        for platform in &self.platforms {
            lines.push(format!(
                "  - {}/{} {} [{}]",
                platform.os, platform.arch, platform.filename, platform.status
            ));
        }
        for name in &self.unlisted {
            lines.push(format!("  ⚠️  {} is not listed in the checksum manifest", name));
        }
        lines.push(format!("Started:  {}", self.started_at.to_rfc3339()));
        lines.push(format!("Finished: {}", self.finished_at.to_rfc3339()));
        lines.push(format!("Duration: {} ms", self.duration_ms));
        lines.join("\n")
    }
}

/// A run that stopped at `stage`
#[derive(Debug, Error)]
#[error("{stage} step failed: {error}")]
pub struct PublishFailure {
    pub stage: PublishStage,
    #[source]
    pub error: PublishError,
    pub history: String,
}

/// Process exit code for a finished run
pub fn exit_code<T>(result: &Result<T, PublishFailure>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Sequences scanning, registration and uploads for one release
pub struct PublishOrchestrator<'a, R: RegistryApi + ?Sized> {
    config: &'a PublishConfig,
    registry: &'a R,
    scanner: ArtifactScanner,
    digests: DigestComputer,
    state_machine: PublishStateMachine,
}

impl<'a, R: RegistryApi + ?Sized> PublishOrchestrator<'a, R> {
    pub fn new(config: &'a PublishConfig, registry: &'a R) -> Self {
        Self {
            config,
            registry,
            scanner: ArtifactScanner::new(&config.dist_dir),
            digests: DigestComputer::default(),
            state_machine: PublishStateMachine::new(),
        }
    }

    /// Run the workflow to completion or to the first failure
    pub async fn run(mut self) -> Result<PublishReport, PublishFailure> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        match self.execute().await {
            Ok((version, platforms, unlisted)) => Ok(PublishReport {
                provider: self.config.provider_address(),
                version,
                dry_run: self.config.dry_run,
                platforms,
                unlisted,
                started_at,
                finished_at: Utc::now(),
                duration_ms: start_time.elapsed().as_millis() as u64,
                history: self.state_machine.history(),
            }),
            Err(error) => {
                let stage = self.state_machine.stage();
                if let Err(e) = self.state_machine.fail(error.to_string()) {
                    warn!(%e, "could not record failure");
                }
                Err(PublishFailure {
                    stage,
                    error,
                    history: self.state_machine.history(),
                })
            }
        }
    }

    fn advance(&mut self) {
        match self.state_machine.advance() {
            Ok(stage) => info!(%stage, "entering stage"),
            Err(e) => warn!(%e, "stage bookkeeping out of sequence"),
        }
    }

    async fn execute(
        &mut self,
    ) -> Result<(String, Vec<PlatformOutcome>, Vec<String>), PublishError> {
        // 1. Scan
        self.advance();
        println!("🔍 Scanning {}...", self.scanner.dist_dir().display());
        let mut run = self.scanner.scan()?;
        println!(
            "  ✅ Version {}: {}, {}, {} archive(s)",
            run.version,
            run.manifest.name(),
            run.signature.name(),
            run.archives.len()
        );

        let check = ManifestCheck::run(&mut run, &self.digests).await?;
        println!(
            "  ✅ {} archive(s) match the checksum manifest",
            check.verified.len()
        );
        for name in &check.unlisted {
            println!("  ⚠️  {} is not listed in the checksum manifest", name);
        }

        if self.config.dry_run {
            let platforms = self.plan(&mut run).await?;
            return Ok((run.version, platforms, check.unlisted));
        }

        // 2. Create version
        self.advance();
        println!(
            "\n📦 Creating version {} of {}...",
            run.version,
            self.config.provider_address()
        );
        let targets = self
            .registry
            .create_version(&run.version, &self.config.key_id)
            .await?;
        run.manifest.assign_upload_target(targets.shasums_upload);
        run.signature.assign_upload_target(targets.shasums_sig_upload);
        println!("  ✅ Version created");

        // 3. Manifest before signature
        self.advance();
        println!("\n📤 Uploading checksum manifest and signature...");
        self.upload(&mut run.manifest).await?;
        self.upload(&mut run.signature).await?;

        // 4. Platforms
        self.advance();
        println!("\n📤 Publishing {} platform(s)...", run.archives.len());
        let mut platforms = Vec::with_capacity(run.archives.len());
        for archive in &mut run.archives {
            platforms.push(self.publish_platform(&run.version, archive).await?);
        }

        // 5. Done
        self.advance();
        Ok((run.version, platforms, check.unlisted))
    }

    /// Register one archive and upload it to the returned target
    async fn publish_platform(
        &self,
        version: &str,
        archive: &mut Artifact,
    ) -> Result<PlatformOutcome, PublishError> {
        let (os, arch) = archive
            .platform()
            .map(|(os, arch)| (os.to_string(), arch.to_string()))
            .ok_or_else(|| {
                PublishError::classification(format!("{} is not a release archive", archive.name()))
            })?;
        let shasum = archive.digest(&self.digests).await?.to_string();

        let request = PlatformRequest {
            os: os.clone(),
            arch: arch.clone(),
            shasum: shasum.clone(),
            filename: archive.name().to_string(),
        };

        let mut outcome = PlatformOutcome {
            filename: request.filename.clone(),
            os,
            arch,
            shasum,
            status: PlatformStatus::Published,
        };

        match self.registry.create_platform(version, &request).await {
            Ok(target) => archive.assign_upload_target(target),
            Err(error) if self.config.skip_existing_platforms && error.status() == Some(409) => {
                println!(
                    "  ⏭️  {}/{} already registered, skipping {}",
                    outcome.os, outcome.arch, outcome.filename
                );
                outcome.status = PlatformStatus::Skipped;
                return Ok(outcome);
            }
            Err(error) => return Err(error),
        }

        self.upload(archive).await?;
        Ok(outcome)
    }

    /// Upload an artifact to its assigned target, consuming the target
    async fn upload(&self, artifact: &mut Artifact) -> Result<(), PublishError> {
        let target = artifact
            .take_upload_target()
            .ok_or_else(|| PublishError::Upload {
                target: "<none>".to_string(),
                path: artifact.path().to_path_buf(),
                status: None,
                message: "no upload target was assigned".to_string(),
            })?;

        self.registry
            .upload_to_target(&target, artifact.path())
            .await?;
        println!(
            "  ✅ Uploaded {} ({}) → {}",
            artifact.name(),
            artifact.kind(),
            SecureTokenManager::mask_url(&target)
        );
        Ok(())
    }

    /// Dry run: print the calls a real run would make
    async fn plan(&self, run: &mut PublishRun) -> Result<Vec<PlatformOutcome>, PublishError> {
        println!("\n🧪 Dry run, nothing will be sent to the registry");
        println!(
            "  - create version {} of {} (key {})",
            run.version,
            self.config.provider_address(),
            self.config.key_id
        );
        println!("  - upload {}", run.manifest.name());
        println!("  - upload {}", run.signature.name());

        let mut platforms = Vec::with_capacity(run.archives.len());
        for archive in &mut run.archives {
            let shasum = archive.digest(&self.digests).await?.to_string();
            let (os, arch) = archive
                .platform()
                .map(|(os, arch)| (os.to_string(), arch.to_string()))
                .unwrap_or_default();
            println!(
                "  - create platform {}/{} (sha256 {}) and upload {}",
                os,
                arch,
                shasum,
                archive.name()
            );
            platforms.push(PlatformOutcome {
                filename: archive.name().to_string(),
                os,
                arch,
                shasum,
                status: PlatformStatus::Planned,
            });
        }
        Ok(platforms)
    }
}

/// Publish the release in `config.dist_dir` using the real registry client
pub async fn publish(config: &PublishConfig) -> Result<PublishReport, PublishFailure> {
    let client = crate::registry::RegistryClient::new(config).map_err(|error| PublishFailure {
        stage: PublishStage::Initial,
        error,
        history: String::new(),
    })?;
    PublishOrchestrator::new(config, &client).run().await
}
