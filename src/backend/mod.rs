//! PDF backends: turn a composed HTML document into PDF bytes.
//!
//! Every backend implements [`PdfBackend`] and honours the same contract:
//! `(ComposedDocument, MarginConfig) -> PDF bytes`, A4 pages, the four
//! margins applied verbatim, the same output for the same input.
//!
//! | Backend | Feature | Layout |
//! |---------|---------|--------|
//! | [`ChromeBackend`] | `chrome` (default) | full CSS layout via headless Chromium |
//! | [`SimpleBackend`] | always | HTML subset, ASCII only, standard Type 1 fonts |
//!
//! Backend-specific input restrictions (image stripping, ASCII
//! transliteration) live in [`sanitize`] and are applied by the backend that
//! needs them, never by the renderer or composer.

#[cfg(feature = "chrome")]
mod chrome;
mod html;
mod layout;
pub mod sanitize;
mod simple;

#[cfg(feature = "chrome")]
pub use chrome::ChromeBackend;
pub use simple::SimpleBackend;

use crate::config::{ConversionConfig, MarginConfig};
use crate::error::BackendError;
use crate::pipeline::compose::ComposedDocument;
use std::sync::Arc;

/// A synchronous HTML → PDF engine.
///
/// Implementations may block for seconds; callers on an async runtime go
/// through [`crate::pipeline::render::render_to_pdf`], which moves the call
/// onto the blocking pool and applies the render timeout.
pub trait PdfBackend: Send + Sync {
    /// Short identifier used in logs and `Debug` output.
    fn name(&self) -> &'static str;

    /// Render one document. The returned bytes must be a complete PDF.
    fn render_pdf(&self, doc: &ComposedDocument, margin: MarginConfig)
        -> Result<Vec<u8>, BackendError>;
}

/// The backend compiled in as the default for this build.
#[cfg(feature = "chrome")]
pub fn default_backend() -> Arc<dyn PdfBackend> {
    Arc::new(ChromeBackend::new())
}

/// The backend compiled in as the default for this build.
#[cfg(not(feature = "chrome"))]
pub fn default_backend() -> Arc<dyn PdfBackend> {
    Arc::new(SimpleBackend::new())
}

/// Backend for a job: the configured one if set, else [`default_backend`].
pub fn resolve_backend(config: &ConversionConfig) -> Arc<dyn PdfBackend> {
    match &config.backend {
        Some(backend) => Arc::clone(backend),
        None => default_backend(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_backend_wins() {
        let config = ConversionConfig::builder()
            .backend(Arc::new(SimpleBackend::new()))
            .build()
            .unwrap();
        assert_eq!(resolve_backend(&config).name(), "simple");
    }

    #[test]
    fn default_backend_matches_features() {
        let name = default_backend().name();
        if cfg!(feature = "chrome") {
            assert_eq!(name, "chrome");
        } else {
            assert_eq!(name, "simple");
        }
    }
}
