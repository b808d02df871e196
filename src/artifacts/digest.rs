//! Streaming SHA-256 digests of build artifacts

use crate::core::error::PublishError;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Default read buffer size
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Computes content digests by streaming files in fixed-size chunks
#[derive(Debug, Clone, Copy)]
pub struct DigestComputer {
    chunk_size: usize,
}

impl Default for DigestComputer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl DigestComputer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Compute the SHA-256 digest of a file.
    ///
    /// Reads the whole file and returns the lowercase hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Io`] if the file cannot be opened or read to
    /// completion.
    pub async fn compute(&self, path: &Path) -> Result<String, PublishError> {
        let mut file = File::open(path)
            .await
            .map_err(|e| PublishError::io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let bytes_read = file
                .read(&mut buffer)
                .await
                .map_err(|e| PublishError::io(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
