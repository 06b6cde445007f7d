//! Error types for the pdfsplit library.
//!
//! Each pipeline stage owns a narrow error type that knows nothing about the
//! request it is serving:
//!
//! * [`crate::pipeline::render::DecodeError`]: the document could not be
//!   opened or a page could not be rasterised.
//! * [`crate::pipeline::encode::EncodeError`]: a raster page could not be
//!   turned into a JPEG.
//! * [`crate::store::StoreError`]: an object store call failed.
//!
//! The orchestrator wraps those into [`SplitError`], attaching the offending
//! key, namespace and page number. A `SplitError` is always terminal: the
//! whole request failed and must be resubmitted. Transport adapters use
//! [`SplitError::kind`] to choose a client- or server-fault response and
//! [`SplitError::to_body`] to render the details.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// All fatal errors returned by a split request.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Client faults ─────────────────────────────────────────────────────
    /// The source key is missing, blank, or escapes the source namespace.
    #[error("Invalid source key '{key}': {reason}")]
    Validation { key: String, reason: String },

    /// No object exists at the source key.
    #[error("Source document '{key}' not found in namespace '{namespace}'")]
    NotFound { namespace: String, key: String },

    // ── Pipeline faults ───────────────────────────────────────────────────
    /// The fetched bytes are not a readable PDF, or a page failed to render.
    #[error("Cannot decode document '{key}': {detail}")]
    Decode { key: String, detail: String },

    /// A rendered page could not be encoded as JPEG.
    #[error("Cannot encode page {page} of '{key}': {detail}")]
    Encode {
        key: String,
        page: usize,
        detail: String,
    },

    /// The object store failed on a read, existence check, delete or write.
    #[error("Object store {operation} failed for '{namespace}/{key}': {detail}")]
    Store {
        operation: StoreOperation,
        namespace: String,
        key: String,
        detail: String,
    },

    /// The request did not finish within the configured deadline.
    #[error("Splitting '{key}' exceeded the {secs}s deadline")]
    DeadlineExceeded { key: String, secs: u64 },

    // ── Setup faults ──────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set --pdfium-lib (or PDFIUM_LIB_PATH) to the directory holding libpdfium,\n\
or install libpdfium where the system loader can find it."
    )]
    EngineUnavailable(String),

    /// Builder or store configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The store call that failed, carried by [`SplitError::Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Get,
    Exists,
    Delete,
    Put,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreOperation::Get => "get",
            StoreOperation::Exists => "exists",
            StoreOperation::Delete => "delete",
            StoreOperation::Put => "put",
        })
    }
}

/// Coarse classification of a [`SplitError`] for transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Decode,
    Encode,
    Store,
    DeadlineExceeded,
    Configuration,
    Internal,
}

impl ErrorKind {
    /// `true` when the caller sent something wrong and retrying unchanged is pointless.
    pub fn is_client_fault(self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::NotFound)
    }

    /// HTTP status an adapter should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::DeadlineExceeded => 504,
            _ => 500,
        }
    }
}

/// Serialisable failure description returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    /// Offending key, when the failure is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl SplitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SplitError::Validation { .. } => ErrorKind::Validation,
            SplitError::NotFound { .. } => ErrorKind::NotFound,
            SplitError::Decode { .. } => ErrorKind::Decode,
            SplitError::Encode { .. } => ErrorKind::Encode,
            SplitError::Store { .. } => ErrorKind::Store,
            SplitError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            SplitError::EngineUnavailable(_) | SplitError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            SplitError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The key the failure is about, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            SplitError::Validation { key, .. }
            | SplitError::NotFound { key, .. }
            | SplitError::Decode { key, .. }
            | SplitError::Encode { key, .. }
            | SplitError::Store { key, .. }
            | SplitError::DeadlineExceeded { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            key: self.key().map(str::to_string),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_display_names_operation_and_key() {
        let e = SplitError::Store {
            operation: StoreOperation::Put,
            namespace: "output".into(),
            key: "report-003.jpg".into(),
            detail: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("put"), "got: {msg}");
        assert!(msg.contains("output/report-003.jpg"), "got: {msg}");
        assert!(msg.contains("HTTP 503"), "got: {msg}");
    }

    #[test]
    fn client_faults_map_to_4xx() {
        let e = SplitError::Validation {
            key: "".into(),
            reason: "empty".into(),
        };
        assert!(e.kind().is_client_fault());
        assert_eq!(e.kind().http_status(), 400);

        let e = SplitError::NotFound {
            namespace: "intake".into(),
            key: "missing.pdf".into(),
        };
        assert!(e.kind().is_client_fault());
        assert_eq!(e.kind().http_status(), 404);
    }

    #[test]
    fn server_faults_map_to_5xx() {
        let decode = SplitError::Decode {
            key: "a.pdf".into(),
            detail: "bad xref".into(),
        };
        let encode = SplitError::Encode {
            key: "a.pdf".into(),
            page: 2,
            detail: "zero width".into(),
        };
        let deadline = SplitError::DeadlineExceeded {
            key: "a.pdf".into(),
            secs: 30,
        };
        assert!(!decode.kind().is_client_fault());
        assert_eq!(decode.kind().http_status(), 500);
        assert_eq!(encode.kind().http_status(), 500);
        assert_eq!(deadline.kind().http_status(), 504);
        assert_eq!(
            SplitError::EngineUnavailable("no lib".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn body_carries_kind_and_key() {
        let e = SplitError::NotFound {
            namespace: "intake".into(),
            key: "nonexistent.pdf".into(),
        };
        let body = e.to_body();
        assert_eq!(body.kind, ErrorKind::NotFound);
        assert_eq!(body.key.as_deref(), Some("nonexistent.pdf"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["key"], "nonexistent.pdf");
    }

    #[test]
    fn body_omits_key_for_setup_errors() {
        let body = SplitError::InvalidConfig("dpi".into()).to_body();
        assert!(body.key.is_none());
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("\"key\""), "got: {json}");
    }
}
