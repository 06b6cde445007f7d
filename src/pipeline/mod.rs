//! Pipeline stages for splitting a document into page images.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the decoder or encoder can be swapped without
//! touching the orchestrator in [`crate::split`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ (store get) ──▶ render ──▶ encode ──▶ naming ──▶ (store put)
//! (key)                    (pdfium)   (JPEG)    (key-NNN.jpg)
//! ```
//!
//! 1. [`input`]: validate the caller's key into a [`input::SourceReference`]
//! 2. [`render`]: open the bytes and stream pages lazily from a blocking
//!    pdfium thread
//! 3. [`encode`]: flatten alpha and JPEG-encode one page
//! 4. [`naming`]: derive the deterministic output key for a page

pub mod encode;
pub mod input;
pub mod naming;
pub mod render;
