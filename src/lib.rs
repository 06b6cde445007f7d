//! # pdfsplit
//!
//! Split a multi-page PDF held in an object store into one JPEG per page,
//! written back to the store under predictable names.
//!
//! ## Why this crate?
//!
//! Downstream consumers (OCR, thumbnails, human review queues) usually want
//! a page at a time, as a plain image, at a stable address. This crate
//! fetches the document, rasterises each page with pdfium, encodes it as a
//! maximum-quality JPEG and stores it as `{name}-{NNN}.jpg`, returning the
//! location of every page in document order. Re-running a request replaces
//! the earlier images in place.
//!
//! ## Pipeline Overview
//!
//! ```text
//! intake/{key}.pdf
//!  │
//!  ├─ 1. Validate  reject blank or escaping keys before any I/O
//!  ├─ 2. Fetch     whole document from the source namespace
//!  ├─ 3. Decode    lazy page stream via pdfium (spawn_blocking)
//!  ├─ 4. Encode    RGBA raster → JPEG, quality 100
//!  ├─ 5. Name      {name}-001.jpg, {name}-002.jpg, …
//!  └─ 6. Store     delete-if-exists, then write to the output namespace
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsplit::{open_store, split, SplitConfig, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = open_store(&StoreConfig::LocalFs { root: "./blobs".into() })?;
//!     let config = SplitConfig::default();
//!     let result = split("reports/q1.pdf", store, &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsplit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfsplit = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod split;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SplitConfig, SplitConfigBuilder, OUTPUT_JPEG_QUALITY};
pub use error::{ErrorBody, ErrorKind, SplitError, StoreOperation};
pub use output::{OutputLocation, SplitRequest, SplitResult};
pub use pipeline::encode::{EncodeError, EncodedArtifact, ImageEncoder, JpegEncoder};
pub use pipeline::naming::{derive_output_key, derive_page_key};
pub use pipeline::render::{
    DecodeError, DecodedDocument, DocumentDecoder, PageStream, PdfiumDecoder, RasterPage,
};
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use split::{split, split_sync, Splitter};
pub use store::{
    open_store, AzureBlobStore, AzureCredential, AzureSettings, InMemoryObjectStore,
    LocalFsObjectStore, ObjectStore, StoreConfig, StoreError,
};
