//! Input resolution: validate the caller's key before any store I/O.
//!
//! A [`SourceReference`] can only be built from a key that names a file
//! strictly inside the source namespace. Keys are `/`-separated; a single
//! leading `/` is tolerated and dropped. Blank keys, empty or dot segments,
//! backslashes and control characters are rejected, so no store adapter ever
//! sees a key that could climb out of its namespace.

use crate::error::SplitError;
use std::fmt;
use tracing::debug;

/// PDF magic bytes every document must start with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A validated key within the source namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    key: String,
}

impl SourceReference {
    /// Validate `raw` and normalise it into a source reference.
    pub fn parse(raw: &str) -> Result<Self, SplitError> {
        let invalid = |reason: &str| SplitError::Validation {
            key: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("a source key is required"));
        }

        let key = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if key.contains('\\') {
            return Err(invalid("backslashes are not allowed"));
        }
        if key.chars().any(char::is_control) {
            return Err(invalid("control characters are not allowed"));
        }
        for segment in key.split('/') {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("relative path segments are not allowed")),
                _ => {}
            }
        }

        debug!("Resolved source key: {}", key);
        Ok(Self {
            key: key.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Final path segment of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// First four bytes of `bytes`, zero-padded when shorter.
pub fn leading_magic(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    magic
}

/// `true` when `bytes` start with the PDF magic.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}
