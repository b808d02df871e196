//! HTTP client for the private provider registry
//!
//! Thin typed binding over the three calls a publish needs. Registration
//! calls are authenticated JSON:API POSTs; uploads are plain PUTs of the raw
//! file bytes to pre-signed, single-use URLs and carry no credentials.

use super::payload::{
    BINARY_UPLOAD_LINK, Document, JSON_API_CONTENT_TYPE, ResponseDocument, SHASUMS_SIG_UPLOAD_LINK,
    SHASUMS_UPLOAD_LINK,
};
use crate::core::config::PublishConfig;
use crate::core::error::PublishError;
use crate::core::traits::{PlatformRequest, RegistryApi, VersionUploadTargets};
use crate::security::SecureTokenManager;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, redirect};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Longest response excerpt kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Registry API client
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    tokens: SecureTokenManager,
    api_url: String,
    organization: String,
    provider: String,
}

impl RegistryClient {
    /// Build a client from the run configuration
    pub fn new(config: &PublishConfig) -> Result<Self, PublishError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("provider-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            tokens: SecureTokenManager::new(config.token.clone()),
            api_url: config.api_url.clone(),
            organization: config.organization.clone(),
            provider: config.provider.clone(),
        })
    }

    fn versions_url(&self) -> String {
        format!(
            "{}/v2/organizations/{org}/registry-providers/private/{org}/{}/versions",
            self.api_url,
            self.provider,
            org = self.organization,
        )
    }

    fn platforms_url(&self, version: &str) -> String {
        format!("{}/{}/platforms", self.versions_url(), version)
    }

    /// POST a JSON:API document and parse the response document
    async fn post_document<T: Serialize>(
        &self,
        operation: &str,
        url: &str,
        document: &T,
    ) -> Result<ResponseDocument, PublishError> {
        let conflict = |status: Option<u16>, message: String| PublishError::RegistryConflict {
            operation: operation.to_string(),
            status,
            message: self.tokens.mask_tokens_in_string(&message),
        };

        let body = serde_json::to_vec(document)
            .map_err(|e| conflict(None, format!("cannot encode request: {}", e)))?;

        debug!(%url, operation, "sending registry request");
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.tokens.bearer_header())
            .header(CONTENT_TYPE, JSON_API_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| conflict(None, describe_transport_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(conflict(Some(status.as_u16()), excerpt(&text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| conflict(Some(status.as_u16()), describe_transport_error(e)))?;
        serde_json::from_str::<ResponseDocument>(&text).map_err(|e| {
            conflict(
                Some(status.as_u16()),
                format!("unexpected response body ({}): {}", e, excerpt(&text)),
            )
        })
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn create_version(
        &self,
        version: &str,
        key_id: &str,
    ) -> Result<VersionUploadTargets, PublishError> {
        let operation = format!("create version {}", version);
        let document = self
            .post_document(
                &operation,
                &self.versions_url(),
                &Document::create_version(version, key_id),
            )
            .await?;

        let targets = VersionUploadTargets {
            shasums_upload: document.link(&operation, SHASUMS_UPLOAD_LINK)?,
            shasums_sig_upload: document.link(&operation, SHASUMS_SIG_UPLOAD_LINK)?,
        };
        info!(version, "registry version created");
        Ok(targets)
    }

    async fn create_platform(
        &self,
        version: &str,
        platform: &PlatformRequest,
    ) -> Result<String, PublishError> {
        let operation = format!(
            "create platform {}/{} for version {}",
            platform.os, platform.arch, version
        );
        let document = self
            .post_document(
                &operation,
                &self.platforms_url(version),
                &Document::create_platform(platform),
            )
            .await?;

        let target = document.link(&operation, BINARY_UPLOAD_LINK)?;
        info!(version, os = %platform.os, arch = %platform.arch, "registry platform created");
        Ok(target)
    }

    async fn upload_to_target(&self, target: &str, path: &Path) -> Result<(), PublishError> {
        let masked = SecureTokenManager::mask_url(target);
        let upload_error = |status: Option<u16>, message: String| PublishError::Upload {
            target: masked.clone(),
            path: path.to_path_buf(),
            status,
            message,
        };

        // Opened here, dropped when the request completes or fails.
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| PublishError::io(path, e))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| PublishError::io(path, e))?
            .len();

        debug!(upload = %masked, path = %path.display(), length, "uploading file");
        let response = self
            .http
            .put(target)
            .header(CONTENT_LENGTH, length)
            .body(Body::from(file))
            .send()
            .await
            .map_err(|e| upload_error(None, describe_transport_error(e)))?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let text = response.text().await.unwrap_or_default();
            return Err(upload_error(Some(status.as_u16()), excerpt(&text)));
        }

        Ok(())
    }
}

fn describe_transport_error(error: reqwest::Error) -> String {
    // Upload URLs are credentials; keep them out of the message.
    let error = error.without_url();
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        error.to_string()
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "empty response body".to_string();
    }
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
