//! PDF rasterisation: document bytes → lazy stream of [`RasterPage`]s.
//!
//! ## Why a channel of capacity one?
//!
//! pdfium is a blocking C++ library with thread-local state, so rendering
//! runs on a `spawn_blocking` thread. That thread hands pages to the async
//! side through a bounded `mpsc` channel of capacity 1: it can be at most one
//! page ahead of the consumer. Peak memory is therefore a couple of pages no
//! matter how long the document is, and a consumer that stops pulling (error,
//! cancellation, deadline) makes the next `blocking_send` fail, which ends
//! the render loop.
//!
//! The stream is forward-only and single-use. Decoding the same bytes again
//! needs a fresh [`DocumentDecoder::decode`] call.

use crate::config::SplitConfig;
use crate::pipeline::input::{has_pdf_magic, leading_magic};
use async_trait::async_trait;
use futures::Stream;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// One decoded page: straight (non-premultiplied) RGBA8 pixels, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterPage {
    page_num: usize,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterPage {
    /// Wrap a raw RGBA8 buffer. The buffer is not checked here; the encoder
    /// rejects pages whose length disagrees with their dimensions.
    pub fn new(page_num: usize, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            page_num,
            width,
            height,
            pixels,
        }
    }

    pub fn from_image(page_num: usize, image: DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(page_num, width, height, rgba.into_raw())
    }

    /// 1-indexed position of the page in its document.
    pub fn page_num(&self) -> usize {
        self.page_num
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Buffer length implied by the dimensions, or None on overflow.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }
}

impl fmt::Debug for RasterPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterPage")
            .field("page_num", &self.page_num)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("<{} bytes>", self.pixels.len()))
            .finish()
    }
}

/// Why a document could not be opened or a page could not be rendered.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    #[error("document is corrupt: {0}")]
    Corrupt(String),

    #[error("document is encrypted and requires a password")]
    PasswordRequired,

    #[error("wrong password for encrypted document")]
    WrongPassword,

    #[error("rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// No usable pdfium library; a deployment problem, not a document problem.
    #[error("{0}")]
    EngineUnavailable(String),

    #[error("decoder stopped unexpectedly: {0}")]
    Interrupted(String),
}

/// Pages in document order. Each item is produced only when pulled.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<RasterPage, DecodeError>> + Send>>;

/// An opened document.
pub struct DecodedDocument {
    /// Number of pages the stream will yield if nothing fails.
    pub page_count: usize,
    pub pages: PageStream,
}

impl fmt::Debug for DecodedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedDocument")
            .field("page_count", &self.page_count)
            .finish_non_exhaustive()
    }
}

/// Opens document bytes as a lazy page sequence.
#[async_trait]
pub trait DocumentDecoder: Send + Sync {
    /// Fails if `bytes` are not a readable document; page-level failures
    /// surface later as `Err` items of the stream.
    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedDocument, DecodeError>;
}

/// Rendering parameters, detached from [`SplitConfig`] so they can move
/// onto the blocking thread.
#[derive(Clone, Default)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub password: Option<String>,
    pub pdfium_lib_path: Option<PathBuf>,
}

impl fmt::Debug for RenderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSettings")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl From<&SplitConfig> for RenderSettings {
    fn from(config: &SplitConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        }
    }
}

/// [`DocumentDecoder`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumDecoder {
    settings: RenderSettings,
}

impl PdfiumDecoder {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &SplitConfig) -> Self {
        Self::new(RenderSettings::from(config))
    }
}

#[async_trait]
impl DocumentDecoder for PdfiumDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedDocument, DecodeError> {
        // Reject obvious non-PDFs before paying for an engine bind.
        if !has_pdf_magic(&bytes) {
            return Err(DecodeError::NotAPdf {
                magic: leading_magic(&bytes),
            });
        }

        let settings = self.settings.clone();
        let (opened_tx, opened_rx) = oneshot::channel();
        let (page_tx, page_rx) = mpsc::channel(1);

        tokio::task::spawn_blocking(move || {
            render_document_blocking(bytes, &settings, opened_tx, page_tx)
        });

        let page_count = opened_rx.await.map_err(|_| {
            DecodeError::Interrupted("render task exited before opening the document".into())
        })??;

        Ok(DecodedDocument {
            page_count,
            pages: Box::pin(ReceiverStream::new(page_rx)),
        })
    }
}

/// Blocking half of [`PdfiumDecoder::decode`].
///
/// Reports the open outcome on `opened`, then feeds pages into `pages_tx`
/// until the document is exhausted, a page fails, or the receiver is gone.
fn render_document_blocking(
    bytes: Vec<u8>,
    settings: &RenderSettings,
    opened: oneshot::Sender<Result<usize, DecodeError>>,
    pages_tx: mpsc::Sender<Result<RasterPage, DecodeError>>,
) {
    let pdfium = match bind_pdfium(settings.pdfium_lib_path.as_deref()) {
        Ok(pdfium) => pdfium,
        Err(e) => {
            let _ = opened.send(Err(e));
            return;
        }
    };

    let password = settings.password.as_deref();
    let document = match pdfium.load_pdf_from_byte_vec(bytes, password) {
        Ok(document) => document,
        Err(e) => {
            let _ = opened.send(Err(classify_load_error(&e, password.is_some())));
            return;
        }
    };

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);
    if opened.send(Ok(total_pages)).is_err() {
        return;
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.dpi as f32 / 72.0)
        .set_maximum_width(settings.max_rendered_pixels as i32)
        .set_maximum_height(settings.max_rendered_pixels as i32);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let item = page
            .render_with_config(&render_config)
            .map(|bitmap| RasterPage::from_image(page_num, bitmap.as_image()))
            .map_err(|e| DecodeError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            });

        let failed = item.is_err();
        if let Ok(ref raster) = item {
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                raster.width(),
                raster.height()
            );
        }

        if pages_tx.blocking_send(item).is_err() {
            debug!("Page consumer dropped; stopping after page {}", page_num);
            return;
        }
        if failed {
            return;
        }
    }
}

/// Bind pdfium from `lib_path` (a directory or the library file), else from
/// the working directory, else from the system search path.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, DecodeError> {
    let bindings = match lib_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| DecodeError::EngineUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn classify_load_error(err: &PdfiumError, password_given: bool) -> DecodeError {
    let detail = format!("{:?}", err);
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            DecodeError::WrongPassword
        } else {
            DecodeError::PasswordRequired
        }
    } else {
        DecodeError::Corrupt(detail)
    }
}
