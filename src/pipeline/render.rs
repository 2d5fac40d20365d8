//! Run a [`PdfBackend`] from async code.
//!
//! ## Why spawn_blocking?
//!
//! Backends are synchronous: Chromium printing blocks on a DevTools round
//! trip and the constrained writer is CPU-bound. `spawn_blocking` keeps both
//! off the Tokio worker threads so other documents in the batch keep moving.
//!
//! ## Timeouts
//!
//! The blocking task cannot be interrupted. On timeout the caller gets
//! [`ItemError::Timeout`] immediately and the detached task runs to
//! completion in the background; its result is discarded.

use crate::backend::PdfBackend;
use crate::config::MarginConfig;
use crate::error::ItemError;
use crate::pipeline::compose::ComposedDocument;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Render `doc` with `backend` on the blocking pool, bounded by `timeout_secs`.
///
/// `name` identifies the document in the returned error.
pub async fn render_to_pdf(
    backend: &Arc<dyn PdfBackend>,
    doc: ComposedDocument,
    margin: MarginConfig,
    timeout_secs: u64,
    name: &str,
) -> Result<Vec<u8>, ItemError> {
    let backend = Arc::clone(backend);
    let backend_name = backend.name();
    let task = tokio::task::spawn_blocking(move || backend.render_pdf(&doc, margin));

    let joined = tokio::time::timeout(Duration::from_secs(timeout_secs), task)
        .await
        .map_err(|_| ItemError::Timeout {
            name: name.to_string(),
            secs: timeout_secs,
        })?;

    let rendered = joined.map_err(|e| ItemError::RenderFailed {
        name: name.to_string(),
        detail: format!("render task panicked: {e}"),
    })?;

    let bytes = rendered.map_err(|e| ItemError::RenderFailed {
        name: name.to_string(),
        detail: e.to_string(),
    })?;

    debug!("{name}: {backend_name} backend produced {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, ItemErrorKind};

    struct Scripted {
        delay: Duration,
        fail: bool,
    }

    impl PdfBackend for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn render_pdf(
            &self,
            _doc: &ComposedDocument,
            _margin: MarginConfig,
        ) -> Result<Vec<u8>, BackendError> {
            std::thread::sleep(self.delay);
            if self.fail {
                Err(BackendError::new("engine exploded"))
            } else {
                Ok(b"%PDF-1.7 fake".to_vec())
            }
        }
    }

    fn doc() -> ComposedDocument {
        ComposedDocument {
            full_html: "<p>x</p>".into(),
        }
    }

    #[tokio::test]
    async fn success_passes_bytes_through() {
        let backend: Arc<dyn PdfBackend> = Arc::new(Scripted {
            delay: Duration::ZERO,
            fail: false,
        });
        let bytes = render_to_pdf(&backend, doc(), MarginConfig::default(), 5, "a.md")
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn backend_error_becomes_render_failure() {
        let backend: Arc<dyn PdfBackend> = Arc::new(Scripted {
            delay: Duration::ZERO,
            fail: true,
        });
        let err = render_to_pdf(&backend, doc(), MarginConfig::default(), 5, "a.md")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Render);
        assert!(err.to_string().contains("engine exploded"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let backend: Arc<dyn PdfBackend> = Arc::new(Scripted {
            delay: Duration::from_millis(1500),
            fail: false,
        });
        let err = render_to_pdf(&backend, doc(), MarginConfig::default(), 1, "slow.md")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ItemError::Timeout {
                name: "slow.md".into(),
                secs: 1
            }
        );
    }
}
