//! Secure handling of the registry token and one-time upload URLs
//!
//! The API token is kept in a [`SecretString`] so it never shows up in
//! `Debug` output. Upload targets are pre-signed URLs: anyone holding one can
//! write to it, so they are masked before being printed or embedded in
//! errors.

use regex::Regex;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

/// Holds the registry token and masks secrets for display
#[derive(Clone)]
pub struct SecureTokenManager {
    token: SecretString,
}

impl SecureTokenManager {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    /// `Authorization` header value for registry API calls
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_publisher::security::SecureTokenManager;
    ///
    /// assert_eq!(SecureTokenManager::mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(SecureTokenManager::mask_token("short"), "****");
    /// ```
    pub fn mask_token(token: &str) -> String {
        if token.len() < 10
            || !token.is_char_boundary(3)
            || !token.is_char_boundary(token.len() - 3)
        {
            return "****".to_string();
        }

        let prefix = &token[..3];
        let suffix = &token[token.len() - 3..];
        format!("{}...{}", prefix, suffix)
    }

    /// Masks a one-time upload URL, keeping only scheme, host and port
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_publisher::security::SecureTokenManager;
    ///
    /// assert_eq!(
    ///     SecureTokenManager::mask_url("https://archivist.terraform.io/v1/object/dmF1bHQ6djE6"),
    ///     "https://archivist.terraform.io/****"
    /// );
    /// ```
    pub fn mask_url(url: &str) -> String {
        match Url::parse(url) {
            Ok(parsed) if parsed.has_host() => {
                format!("{}/****", parsed.origin().ascii_serialization())
            }
            _ => "****".to_string(),
        }
    }

    /// Replaces every occurrence of the token in `text` with its masked form
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        let token = self.token.expose_secret();
        if token.is_empty() {
            return text.to_string();
        }

        match Regex::new(&regex::escape(token)) {
            Ok(regex) => regex
                .replace_all(text, Self::mask_token(token).as_str())
                .into_owned(),
            Err(_) => text.replace(token, "****"),
        }
    }
}

impl std::fmt::Debug for SecureTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTokenManager")
            .field("token", &"****")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(token: &str) -> SecureTokenManager {
        SecureTokenManager::new(SecretString::new(token.to_string().into()))
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(manager("tok.abc").bearer_header(), "Bearer tok.abc");
    }

    #[test]
    fn test_mask_token_with_short_token() {
        assert_eq!(SecureTokenManager::mask_token("short"), "****");
        assert_eq!(SecureTokenManager::mask_token(""), "****");
    }

    #[test]
    fn test_mask_token_with_long_token() {
        assert_eq!(SecureTokenManager::mask_token("abcdef123456"), "abc...456");
        assert_eq!(
            SecureTokenManager::mask_token("very-long-token-string"),
            "ver...ing"
        );
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            SecureTokenManager::mask_url("http://127.0.0.1:8080/upload/abc?sig=1"),
            "http://127.0.0.1:8080/****"
        );
        assert_eq!(SecureTokenManager::mask_url("not a url"), "****");
    }

    #[test]
    fn test_mask_tokens_in_string() {
        let manager = manager("secret.token+with*chars");
        let output = manager
            .mask_tokens_in_string("sent secret.token+with*chars twice: secret.token+with*chars");

        assert!(!output.contains("secret.token+with*chars"));
        assert_eq!(output.matches("sec...ars").count(), 2);
    }

    #[test]
    fn test_mask_tokens_in_string_no_tokens() {
        let manager = manager("secret-token-12345");
        let input = "This is a safe string with no tokens";
        assert_eq!(manager.mask_tokens_in_string(input), input);
    }

    #[test]
    fn test_debug_is_redacted() {
        let manager = manager("secret-token-12345");
        assert!(!format!("{:?}", manager).contains("secret-token-12345"));
    }
}
