//! JSON:API request and response bodies for the private provider registry

use crate::core::error::PublishError;
use crate::core::traits::PlatformRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";
pub const VERSION_RESOURCE: &str = "registry-provider-versions";
pub const PLATFORM_RESOURCE: &str = "registry-provider-version-platforms";
/// Plugin protocol versions advertised for every published version
pub const PROTOCOLS: &[&str] = &["5.0"];

pub const SHASUMS_UPLOAD_LINK: &str = "shasums-upload";
pub const SHASUMS_SIG_UPLOAD_LINK: &str = "shasums-sig-upload";
pub const BINARY_UPLOAD_LINK: &str = "provider-binary-upload";

/// Top-level request document
#[derive(Debug, Serialize)]
pub struct Document<A> {
    pub data: Resource<A>,
}

#[derive(Debug, Serialize)]
pub struct Resource<A> {
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub attributes: A,
}

#[derive(Debug, Serialize)]
pub struct VersionAttributes<'a> {
    pub version: &'a str,
    #[serde(rename = "key-id")]
    pub key_id: &'a str,
    pub protocols: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct PlatformAttributes<'a> {
    pub os: &'a str,
    pub arch: &'a str,
    pub shasum: &'a str,
    pub filename: &'a str,
}

impl<'a> Document<VersionAttributes<'a>> {
    pub fn create_version(version: &'a str, key_id: &'a str) -> Self {
        Self {
            data: Resource {
                resource_type: VERSION_RESOURCE,
                attributes: VersionAttributes {
                    version,
                    key_id,
                    protocols: PROTOCOLS,
                },
            },
        }
    }
}

impl<'a> Document<PlatformAttributes<'a>> {
    pub fn create_platform(platform: &'a PlatformRequest) -> Self {
        Self {
            data: Resource {
                resource_type: PLATFORM_RESOURCE,
                attributes: PlatformAttributes {
                    os: &platform.os,
                    arch: &platform.arch,
                    shasum: &platform.shasum,
                    filename: &platform.filename,
                },
            },
        }
    }
}

/// Response document; only the links are of interest
#[derive(Debug, Deserialize)]
pub struct ResponseDocument {
    pub data: ResponseData,
}

#[derive(Debug, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub links: HashMap<String, serde_json::Value>,
}

impl ResponseDocument {
    /// String value of `data.links.<name>`
    ///
    /// A missing, empty or non-string link is an error; the caller reports it
    /// exactly like a failed request.
    pub fn link(&self, operation: &str, name: &str) -> Result<String, PublishError> {
        self.data
            .links
            .get(name)
            .and_then(serde_json::Value::as_str)
            .filter(|link| !link.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PublishError::RegistryConflict {
                operation: operation.to_string(),
                status: None,
                message: format!("response has no data.links.{}", name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_version_document() {
        let document = Document::create_version("1.2.0", "34365D9472D7468F");
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(
            value,
            json!({
                "data": {
                    "type": "registry-provider-versions",
                    "attributes": {
                        "version": "1.2.0",
                        "key-id": "34365D9472D7468F",
                        "protocols": ["5.0"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_create_platform_document() {
        let request = PlatformRequest {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            shasum: "8f69533bc8afc227b40d15116358f91505bb638ce5919712fbb38a2dec1bba38".to_string(),
            filename: "acme_1.2.0_linux_amd64.zip".to_string(),
        };
        let value = serde_json::to_value(Document::create_platform(&request)).unwrap();

        assert_eq!(value["data"]["type"], "registry-provider-version-platforms");
        assert_eq!(value["data"]["attributes"]["os"], "linux");
        assert_eq!(value["data"]["attributes"]["arch"], "amd64");
        assert_eq!(value["data"]["attributes"]["filename"], "acme_1.2.0_linux_amd64.zip");
    }

    #[test]
    fn test_response_links() {
        let document: ResponseDocument = serde_json::from_value(json!({
            "data": {
                "id": "provver-y5KZUsSBRLV9zCtL",
                "links": {
                    "shasums-upload": "https://archivist.terraform.io/v1/object/a",
                    "shasums-sig-upload": "https://archivist.terraform.io/v1/object/b",
                    "broken": 42
                }
            }
        }))
        .unwrap();

        assert_eq!(
            document.link("create version", SHASUMS_UPLOAD_LINK).unwrap(),
            "https://archivist.terraform.io/v1/object/a"
        );
        assert!(document.link("create version", "broken").is_err());
        let err = document.link("create version", BINARY_UPLOAD_LINK).unwrap_err();
        assert!(err.to_string().contains("provider-binary-upload"));
    }

    #[test]
    fn test_response_without_links() {
        let document: ResponseDocument =
            serde_json::from_value(json!({ "data": { "id": "x" } })).unwrap();
        assert!(document.link("create platform", BINARY_UPLOAD_LINK).is_err());
    }
}
