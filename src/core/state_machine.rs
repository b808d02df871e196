//! State machine for tracking the publish workflow
//!
//! The run moves through a fixed, linear sequence of stages. Any failure
//! moves it to `Failed`, which is terminal; there is no resume. Transitions
//! are kept in memory only and are used for the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publishing stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishStage {
    Initial,
    Scan,
    CreateVersion,
    UploadManifestPair,
    PublishPlatforms,
    Done,
    Failed,
}

impl PublishStage {
    /// The only stage that may follow this one on success
    pub fn next(self) -> Option<PublishStage> {
        match self {
            Self::Initial => Some(Self::Scan),
            Self::Scan => Some(Self::CreateVersion),
            Self::CreateVersion => Some(Self::UploadManifestPair),
            Self::UploadManifestPair => Some(Self::PublishPlatforms),
            Self::PublishPlatforms => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Scan => "scan",
            Self::CreateVersion => "create-version",
            Self::UploadManifestPair => "upload-manifest-pair",
            Self::PublishPlatforms => "publish-platforms",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTransition {
    pub from: PublishStage,
    pub to: PublishStage,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rejected transition request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stage transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: PublishStage,
    pub to: PublishStage,
}

/// Linear state machine for one publish run
#[derive(Debug)]
pub struct PublishStateMachine {
    current: PublishStage,
    transitions: Vec<StageTransition>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    pub fn new() -> Self {
        Self {
            current: PublishStage::Initial,
            transitions: Vec::new(),
        }
    }

    /// Advance to the next stage in sequence
    pub fn advance(&mut self) -> Result<PublishStage, InvalidTransition> {
        let to = self.current.next().ok_or(InvalidTransition {
            from: self.current,
            to: self.current,
        })?;
        self.push(to, None);
        Ok(to)
    }

    /// Move to `Failed`, recording the error message
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.current.is_terminal() {
            return Err(InvalidTransition {
                from: self.current,
                to: PublishStage::Failed,
            });
        }
        self.push(PublishStage::Failed, Some(error.into()));
        Ok(())
    }

    fn push(&mut self, to: PublishStage, error: Option<String>) {
        self.transitions.push(StageTransition {
            from: self.current,
            to,
            timestamp: Utc::now(),
            error,
        });
        self.current = to;
    }

    pub fn stage(&self) -> PublishStage {
        self.current
    }

    /// Transition history as human-readable lines
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                match &t.error {
                    Some(error) => format!("{}: {} → {} ({})", time, t.from, t.to, error),
                    None => format!("{}: {} → {}", time, t.from, t.to),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
