//! The split orchestrator: one document in, one stored JPEG per page out.
//!
//! A request moves through
//! `Validating → Fetching → Decoding → (Encoding → Naming → Storing)* → Completed`
//! and may jump to failure from any state. Pages are handled strictly in
//! document order on the calling task; the only awaits are the store fetch,
//! each existence check, delete and write, and pulling the next rendered
//! page. Dropping the returned future (caller gone, deadline hit) therefore
//! stops work at the next of those points. Nothing is rolled back: pages
//! already written stay written, and the request is reported as failed.

use crate::config::{SplitConfig, OUTPUT_JPEG_QUALITY};
use crate::error::{SplitError, StoreOperation};
use crate::output::{OutputLocation, SplitRequest, SplitResult};
use crate::pipeline::encode::{ImageEncoder, JpegEncoder};
use crate::pipeline::input::SourceReference;
use crate::pipeline::naming::derive_page_key;
use crate::pipeline::render::{DecodeError, DocumentDecoder, PdfiumDecoder};
use crate::store::{ObjectStore, StoreError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Splits documents from one store using one decoder and encoder.
///
/// Holds no per-request state, so a single `Splitter` can serve any number
/// of concurrent requests.
#[derive(Clone)]
pub struct Splitter {
    store: Arc<dyn ObjectStore>,
    decoder: Arc<dyn DocumentDecoder>,
    encoder: Arc<dyn ImageEncoder>,
    config: SplitConfig,
}

impl Splitter {
    /// Splitter using pdfium for decoding and JPEG for encoding.
    pub fn new(store: Arc<dyn ObjectStore>, config: SplitConfig) -> Self {
        let decoder = Arc::new(PdfiumDecoder::from_config(&config));
        Self::with_components(store, decoder, Arc::new(JpegEncoder), config)
    }

    /// Splitter with explicit decoder and encoder implementations.
    pub fn with_components(
        store: Arc<dyn ObjectStore>,
        decoder: Arc<dyn DocumentDecoder>,
        encoder: Arc<dyn ImageEncoder>,
        config: SplitConfig,
    ) -> Self {
        Self {
            store,
            decoder,
            encoder,
            config,
        }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Handle an inbound request.
    pub async fn handle(&self, request: &SplitRequest) -> Result<SplitResult, SplitError> {
        self.split(&request.blob_path).await
    }

    /// Split the document at `source_key` into per-page images.
    ///
    /// # Errors
    /// - `Validation`: blank key or a key escaping the source namespace;
    ///   no store I/O happens
    /// - `NotFound`: nothing stored at the key
    /// - `Decode` / `Encode`: unreadable document or page
    /// - `Store`: any other store failure; earlier pages stay stored
    /// - `DeadlineExceeded`: `timeout_secs` elapsed
    pub async fn split(&self, source_key: &str) -> Result<SplitResult, SplitError> {
        match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.run(source_key))
                .await
                .map_err(|_| {
                    warn!("Deadline of {}s exceeded splitting {}", secs, source_key);
                    SplitError::DeadlineExceeded {
                        key: source_key.to_string(),
                        secs,
                    }
                })?,
            None => self.run(source_key).await,
        }
    }

    async fn run(&self, source_key: &str) -> Result<SplitResult, SplitError> {
        let total_start = Instant::now();
        info!("Processing {}", source_key);

        // ── Step 1: Validate ─────────────────────────────────────────────
        let source = SourceReference::parse(source_key)?;
        let source_ns = self.config.source_namespace.as_str();
        let output_ns = self.config.output_namespace.as_str();

        // ── Step 2: Fetch ────────────────────────────────────────────────
        let bytes = self
            .store
            .get(source_ns, source.key())
            .await
            .map_err(|e| store_failure(StoreOperation::Get, source_ns, source.key(), e))?;
        debug!("Fetched {} ({} bytes)", source, bytes.len());

        // ── Step 3: Open decode stream ───────────────────────────────────
        let document = self
            .decoder
            .decode(bytes)
            .await
            .map_err(|e| decode_failure(&source, e))?;
        let total_pages = document.page_count;
        let mut pages = document.pages;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_split_start(total_pages);
        }

        // ── Step 4: Encode → name → store, page by page ──────────────────
        let mut result = SplitResult::with_capacity(total_pages);
        let mut expected_page = 1;
        while let Some(item) = pages.next().await {
            let page = item.map_err(|e| decode_failure(&source, e))?;
            if page.page_num() != expected_page {
                return Err(SplitError::Decode {
                    key: source.key().to_string(),
                    detail: format!(
                        "decoder yielded page {} where page {} was expected",
                        page.page_num(),
                        expected_page
                    ),
                });
            }

            let artifact = self
                .encoder
                .encode(&page, OUTPUT_JPEG_QUALITY)
                .map_err(|e| SplitError::Encode {
                    key: source.key().to_string(),
                    page: expected_page,
                    detail: e.to_string(),
                })?;
            drop(page);

            let output_key = derive_page_key(source.key(), expected_page, total_pages);
            info!("Writing output file {}", output_key);
            self.replace(output_ns, &output_key, artifact.bytes, artifact.content_type)
                .await?;

            let location = self.store.location(output_ns, &output_key);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_page_stored(expected_page, total_pages, &location);
            }
            result.push(OutputLocation::new(location));
            expected_page += 1;
        }

        if result.len() != total_pages {
            return Err(SplitError::Decode {
                key: source.key().to_string(),
                detail: format!(
                    "decoder stopped after {} of {} pages",
                    result.len(),
                    total_pages
                ),
            });
        }

        // ── Step 5: Done ─────────────────────────────────────────────────
        info!(
            "Split {} into {} pages in {}ms",
            source,
            result.len(),
            total_start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_split_complete(result.len());
        }
        Ok(result)
    }

    /// Write `bytes` at `namespace/key`, deleting any earlier artifact first.
    async fn replace(
        &self,
        namespace: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), SplitError> {
        let exists = self
            .store
            .exists(namespace, key)
            .await
            .map_err(|e| store_failure(StoreOperation::Exists, namespace, key, e))?;
        if exists {
            warn!("Replacing existing artifact {}/{}", namespace, key);
            self.store
                .delete(namespace, key)
                .await
                .map_err(|e| store_failure(StoreOperation::Delete, namespace, key, e))?;
        }

        self.store
            .put(namespace, key, bytes, content_type)
            .await
            .map_err(|e| store_failure(StoreOperation::Put, namespace, key, e))
    }
}

/// Split the document at `source_key` using pdfium and JPEG encoding.
///
/// Convenience wrapper around [`Splitter::new`] + [`Splitter::split`].
pub async fn split(
    source_key: impl AsRef<str>,
    store: Arc<dyn ObjectStore>,
    config: &SplitConfig,
) -> Result<SplitResult, SplitError> {
    Splitter::new(store, config.clone())
        .split(source_key.as_ref())
        .await
}

/// Synchronous wrapper around [`split`].
///
/// Creates a temporary tokio runtime internally.
pub fn split_sync(
    source_key: impl AsRef<str>,
    store: Arc<dyn ObjectStore>,
    config: &SplitConfig,
) -> Result<SplitResult, SplitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SplitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(split(source_key, store, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn store_failure(
    operation: StoreOperation,
    namespace: &str,
    key: &str,
    err: StoreError,
) -> SplitError {
    match err {
        StoreError::NotFound { namespace, key } if operation == StoreOperation::Get => {
            SplitError::NotFound { namespace, key }
        }
        other => SplitError::Store {
            operation,
            namespace: namespace.to_string(),
            key: key.to_string(),
            detail: other.to_string(),
        },
    }
}

fn decode_failure(source: &SourceReference, err: DecodeError) -> SplitError {
    match err {
        DecodeError::EngineUnavailable(detail) => SplitError::EngineUnavailable(detail),
        other => SplitError::Decode {
            key: source.key().to_string(),
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_on_get_is_client_fault() {
        let e = store_failure(
            StoreOperation::Get,
            "intake",
            "a.pdf",
            StoreError::NotFound {
                namespace: "intake".into(),
                key: "a.pdf".into(),
            },
        );
        assert!(matches!(e, SplitError::NotFound { ref key, .. } if key == "a.pdf"));
    }

    #[test]
    fn not_found_elsewhere_is_store_error() {
        let e = store_failure(
            StoreOperation::Delete,
            "output",
            "a-001.jpg",
            StoreError::NotFound {
                namespace: "output".into(),
                key: "a-001.jpg".into(),
            },
        );
        assert!(matches!(
            e,
            SplitError::Store {
                operation: StoreOperation::Delete,
                ..
            }
        ));
    }

    #[test]
    fn engine_failure_is_not_a_document_fault() {
        let source = SourceReference::parse("a.pdf").unwrap();
        let e = decode_failure(&source, DecodeError::EngineUnavailable("missing".into()));
        assert!(matches!(e, SplitError::EngineUnavailable(_)));

        let e = decode_failure(&source, DecodeError::Corrupt("xref".into()));
        assert!(matches!(e, SplitError::Decode { ref key, .. } if key == "a.pdf"));
    }
}
