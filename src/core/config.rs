//! Run configuration for provider-publisher
//!
//! All settings come from the process environment and are collected into a
//! single [`PublishConfig`] at startup. The value is then passed by reference
//! to the registry client and the orchestrator, so tests can build one from
//! an in-memory map instead of touching the real environment.

use crate::core::error::PublishError;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_VAR: &str = "TF_TOKEN";
pub const KEY_ID_VAR: &str = "KEY_ID";
pub const ORGANIZATION_VAR: &str = "TF_ORGANIZATION";
pub const PROVIDER_VAR: &str = "TF_PROVIDER";
pub const API_URL_VAR: &str = "TF_API_URL";
pub const DIST_DIR_VAR: &str = "DIST_DIR";
pub const TIMEOUT_VAR: &str = "TF_HTTP_TIMEOUT_SECS";
pub const DRY_RUN_VAR: &str = "PUBLISH_DRY_RUN";
pub const SKIP_EXISTING_VAR: &str = "PUBLISH_SKIP_EXISTING_PLATFORMS";

/// Every variable the tool reads
pub const KNOWN_VARS: &[&str] = &[
    TOKEN_VAR,
    KEY_ID_VAR,
    ORGANIZATION_VAR,
    PROVIDER_VAR,
    API_URL_VAR,
    DIST_DIR_VAR,
    TIMEOUT_VAR,
    DRY_RUN_VAR,
    SKIP_EXISTING_VAR,
];

pub const DEFAULT_API_URL: &str = "https://app.terraform.io/api";
pub const DEFAULT_ORGANIZATION: &str = "reprise-digital";
pub const DEFAULT_PROVIDER: &str = "looker";
pub const DEFAULT_DIST_DIR: &str = "dist";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for one publish run
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Bearer token for the registry API
    pub token: SecretString,

    /// Signing key identifier registered with the registry
    pub key_id: String,

    /// Organization owning the private provider (also its namespace)
    pub organization: String,

    /// Provider name
    pub provider: String,

    /// Registry API base URL, without a trailing slash
    pub api_url: String,

    /// Directory holding the build output
    pub dist_dir: PathBuf,

    /// Timeout applied to every HTTP request
    pub timeout: Duration,

    /// Scan and plan only, no network calls
    pub dry_run: bool,

    /// Treat an already registered platform as published
    pub skip_existing_platforms: bool,
}

impl PublishConfig {
    /// Build the configuration from the process environment
    ///
    /// Only [`KNOWN_VARS`] are read; unrelated variables are never decoded.
    pub fn from_env() -> Result<Self, PublishError> {
        let vars = collect_vars(|name| std::env::var(name))?;
        Self::from_vars(&vars)
    }

    /// Build the configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, PublishError> {
        let token = required(vars, TOKEN_VAR)?;
        let key_id = required(vars, KEY_ID_VAR)?;

        let timeout_secs = match optional(vars, TIMEOUT_VAR) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                PublishError::config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    TIMEOUT_VAR, raw
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        if timeout_secs == 0 {
            return Err(PublishError::config(format!(
                "{} must be greater than zero",
                TIMEOUT_VAR
            )));
        }

        Ok(Self {
            token: SecretString::new(token.into()),
            key_id,
            organization: optional(vars, ORGANIZATION_VAR)
                .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
            provider: optional(vars, PROVIDER_VAR).unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            api_url: optional(vars, API_URL_VAR)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            dist_dir: optional(vars, DIST_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIST_DIR)),
            timeout: Duration::from_secs(timeout_secs),
            dry_run: flag(vars, DRY_RUN_VAR)?,
            skip_existing_platforms: flag(vars, SKIP_EXISTING_VAR)?,
        })
    }

    /// Registry address of the provider, as shown to users
    pub fn provider_address(&self) -> String {
        format!("{}/{}", self.organization, self.provider)
    }
}

fn collect_vars<F>(lookup: F) -> Result<HashMap<String, String>, PublishError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let mut vars = HashMap::new();
    for name in KNOWN_VARS {
        match lookup(name) {
            Ok(value) => {
                vars.insert(name.to_string(), value);
            }
            Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(_)) => {
                return Err(PublishError::config(format!("{} is not valid UTF-8", name)));
            }
        }
    }
    Ok(vars)
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, PublishError> {
    optional(vars, name)
        .ok_or_else(|| PublishError::config(format!("{} is not set", name)))
}

fn flag(vars: &HashMap<String, String>, name: &str) -> Result<bool, PublishError> {
    match optional(vars, name).map(|v| v.to_lowercase()).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(PublishError::config(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}
