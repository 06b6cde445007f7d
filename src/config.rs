//! Configuration types for document splitting.
//!
//! Every knob of one split lives in [`SplitConfig`], built via
//! [`SplitConfigBuilder`]. The config is cheap to clone and is shared
//! read-only by concurrent requests; nothing in it is mutated during a split.
//!
//! Store credentials are deliberately absent here: they belong to
//! [`crate::store::StoreConfig`] and are consumed once when the store adapter
//! is constructed.

use crate::error::SplitError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// JPEG quality used for every page image.
pub const OUTPUT_JPEG_QUALITY: u8 = 100;

/// Namespace holding the input documents by default.
pub const DEFAULT_SOURCE_NAMESPACE: &str = "intake";

/// Namespace receiving the page images by default.
pub const DEFAULT_OUTPUT_NAMESPACE: &str = "output";

/// Configuration for splitting a document into page images.
///
/// # Example
/// ```rust
/// use pdfsplit::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .source_namespace("intake")
///     .output_namespace("output")
///     .dpi(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Namespace the source key is resolved in. Default: `"intake"`.
    pub source_namespace: String,

    /// Namespace page images are written to. Default: `"output"`.
    pub output_namespace: String,

    /// Rendering resolution. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Cap on either edge of a rendered page, in pixels. Default: 4000.
    ///
    /// Keeps a poster-sized page from allocating hundreds of megabytes. The
    /// other edge scales proportionally.
    pub max_rendered_pixels: u32,

    /// User password for encrypted documents.
    pub password: Option<String>,

    /// Directory containing libpdfium, or the library file itself.
    /// If None, the system library search path is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Deadline for a whole request, in seconds. None means no deadline.
    pub timeout_secs: Option<u64>,

    /// Receives per-page events. None disables reporting.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            source_namespace: DEFAULT_SOURCE_NAMESPACE.to_string(),
            output_namespace: DEFAULT_OUTPUT_NAMESPACE.to_string(),
            dpi: 300,
            max_rendered_pixels: 4000,
            password: None,
            pdfium_lib_path: None,
            timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("source_namespace", &self.source_namespace)
            .field("output_namespace", &self.output_namespace)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SplitConfig`].
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl fmt::Debug for SplitConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SplitConfigBuilder {
    pub fn source_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.source_namespace = namespace.into();
        self
    }

    pub fn output_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.output_namespace = namespace.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<SplitConfig, SplitError> {
        let source = self.config.source_namespace.trim().to_string();
        let output = self.config.output_namespace.trim().to_string();
        if source.is_empty() || output.is_empty() {
            return Err(SplitError::InvalidConfig(
                "Namespaces must not be empty".into(),
            ));
        }
        if source == output {
            return Err(SplitError::InvalidConfig(format!(
                "Source and output namespaces must differ, both are '{}'",
                source
            )));
        }
        if self.config.timeout_secs == Some(0) {
            return Err(SplitError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        self.config.source_namespace = source;
        self.config.output_namespace = output;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_intake_and_output() {
        let c = SplitConfig::default();
        assert_eq!(c.source_namespace, "intake");
        assert_eq!(c.output_namespace, "output");
        assert_eq!(c.dpi, 300);
        assert!(c.timeout_secs.is_none());
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn builder_clamps_dpi_and_pixels() {
        let c = SplitConfig::builder()
            .dpi(10)
            .max_rendered_pixels(5)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.max_rendered_pixels, 100);

        let c = SplitConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn builder_rejects_same_namespaces() {
        let err = SplitConfig::builder()
            .source_namespace("docs")
            .output_namespace("docs")
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_namespace() {
        let err = SplitConfig::builder()
            .output_namespace("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(SplitConfig::builder().timeout_secs(0).build().is_err());
        assert_eq!(
            SplitConfig::builder()
                .timeout_secs(30)
                .build()
                .unwrap()
                .timeout_secs,
            Some(30)
        );
    }

    #[test]
    fn debug_redacts_password() {
        let c = SplitConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn builder_stores_trimmed_namespaces() {
        let c = SplitConfig::builder()
            .source_namespace(" intake")
            .output_namespace("pages \t")
            .build()
            .unwrap();
        assert_eq!(c.source_namespace, "intake");
        assert_eq!(c.output_namespace, "pages");
    }

    #[test]
    fn namespaces_equal_after_trim_are_rejected() {
        let err = SplitConfig::builder()
            .source_namespace("shared")
            .output_namespace(" shared ")
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }
}
