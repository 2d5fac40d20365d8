//! Error types for the edgequake-md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] is **fatal**: the job cannot proceed at all (bad margin
//!   configuration, input file missing, archive could not be written).
//!   Returned as `Err(Md2PdfError)` from the top-level functions. Margin
//!   errors are raised before any document is touched.
//!
//! * [`ItemError`] is **non-fatal**: a single document failed (not UTF-8,
//!   backend fault, timeout) but the rest of the batch is fine. Stored inside
//!   [`crate::output::ConversionResult`] so one bad file never costs the
//!   caller the whole batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-md2pdf library.
///
/// Item-level failures use [`ItemError`] and are stored in
/// [`crate::output::ConversionResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A batch was started with nothing to convert.
    #[error("No input documents were given")]
    NoInputs,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// One page margin is outside the accepted range.
    #[error("Invalid configuration: {side} margin {value}mm exceeds the {max}mm limit")]
    MarginOutOfRange {
        side: &'static str,
        value: u32,
        max: u32,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// A single-document conversion failed.
    ///
    /// Only returned by the single-document entry points; batch calls keep
    /// the [`ItemError`] inside the item's result instead.
    #[error(transparent)]
    Conversion(#[from] ItemError),

    /// Some documents converted but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any item failure as an error.
    #[error("{failed}/{total} documents failed during conversion")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The ZIP archive could not be assembled.
    #[error("Failed to build ZIP archive: {0}")]
    ArchiveFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2PdfError {
    /// True for errors caused by the job-wide configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Md2PdfError::InvalidConfig(_) | Md2PdfError::MarginOutOfRange { .. }
        )
    }
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::ConversionResult`] when an item fails.
/// The batch continues with the next item.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// Input bytes are not valid UTF-8.
    #[error("{name}: not valid UTF-8 text: {detail}")]
    Decode { name: String, detail: String },

    /// The PDF backend could not produce output.
    #[error("{name}: PDF rendering failed: {detail}")]
    RenderFailed { name: String, detail: String },

    /// The PDF backend did not finish within the render timeout.
    #[error("{name}: PDF rendering timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    /// The batch was cancelled before this item started.
    #[error("{name}: cancelled before conversion started")]
    Cancelled { name: String },
}

/// Coarse classification of an [`ItemError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ItemErrorKind {
    Decode,
    Render,
    Cancelled,
}

impl ItemError {
    /// Which class of failure this is. Timeouts count as render failures.
    pub fn kind(&self) -> ItemErrorKind {
        match self {
            ItemError::Decode { .. } => ItemErrorKind::Decode,
            ItemError::RenderFailed { .. } | ItemError::Timeout { .. } => ItemErrorKind::Render,
            ItemError::Cancelled { .. } => ItemErrorKind::Cancelled,
        }
    }

    /// Source name of the document this error belongs to.
    pub fn name(&self) -> &str {
        match self {
            ItemError::Decode { name, .. }
            | ItemError::RenderFailed { name, .. }
            | ItemError::Timeout { name, .. }
            | ItemError::Cancelled { name } => name,
        }
    }
}

/// Failure reported by a [`crate::backend::PdfBackend`].
///
/// Carries the backend's own description; the pipeline wraps it into
/// [`ItemError::RenderFailed`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}
