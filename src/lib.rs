pub mod artifacts;
pub mod core;
pub mod orchestration;
pub mod registry;
pub mod security;

pub use artifacts::{Artifact, ArtifactKind, ArtifactScanner, DigestComputer, PublishRun};
pub use core::*;
pub use orchestration::{
    PlatformOutcome, PlatformStatus, PublishFailure, PublishOrchestrator, PublishReport, exit_code,
    publish,
};
pub use registry::RegistryClient;
pub use security::SecureTokenManager;
