//! Single-document entry points.
//!
//! [`convert`] takes one decoded document through the whole pipeline and
//! returns its PDF. Batches go through [`crate::batch`] instead, which keeps
//! per-document failures as data rather than returning early.

use crate::backend::{resolve_backend, PdfBackend};
use crate::config::{ConversionConfig, MarginConfig};
use crate::error::{ItemError, Md2PdfError};
use crate::output::ConvertedPdf;
use crate::pipeline::compose::{compose, ComposeMode};
use crate::pipeline::input::{self, MarkdownDocument};
use crate::pipeline::markdown::render_markdown;
use crate::pipeline::render::render_to_pdf;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert one Markdown document to PDF.
///
/// The margin is validated before anything is rendered. A rendering failure
/// or timeout comes back as [`Md2PdfError::Conversion`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{convert, ConversionConfig, MarkdownDocument};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let doc = MarkdownDocument::new("notes.md", "# Notes\n\nHello.");
/// let config = ConversionConfig::builder().margin_top(25).build()?;
/// let pdf = convert(&doc, &config).await?;
/// std::fs::write(&pdf.output_name, &pdf.pdf_bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    doc: &MarkdownDocument,
    config: &ConversionConfig,
) -> Result<ConvertedPdf, Md2PdfError> {
    config.validate()?;
    let start = Instant::now();
    let backend = resolve_backend(config);
    info!(
        "Converting {} with {} backend",
        doc.suggested_output_name,
        backend.name()
    );

    let pdf_bytes = render_document(
        &backend,
        doc,
        config.margin,
        config.render_timeout_secs,
        &doc.source_name,
    )
    .await?;

    info!(
        "Converted {} ({} bytes) in {}ms",
        doc.suggested_output_name,
        pdf_bytes.len(),
        start.elapsed().as_millis()
    );
    Ok(ConvertedPdf {
        output_name: doc.suggested_output_name.clone(),
        pdf_bytes,
    })
}

/// Convert a file path or URL and write the PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConvertedPdf, Md2PdfError> {
    config.validate()?;
    let input_file = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let doc = MarkdownDocument::from_input(input_file)?;
    let output = convert(&doc, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Md2PdfError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf_bytes)
        .await
        .map_err(|e| Md2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Md2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!("Wrote {}", path.display());
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    doc: &MarkdownDocument,
    config: &ConversionConfig,
) -> Result<ConvertedPdf, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(doc, config))
}

/// The complete HTML document a backend would receive for `source`.
pub fn render_html(source: &str) -> String {
    compose(&render_markdown(source), ComposeMode::PrintDocument).full_html
}

/// A self-contained preview fragment for embedding in another page.
///
/// Styles are scoped under `.md2pdf-preview`, so the host page is unaffected.
pub fn preview_html(source: &str) -> String {
    compose(&render_markdown(source), ComposeMode::PreviewFragment).full_html
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Markdown → HTML → composed document → PDF bytes for one document.
pub(crate) async fn render_document(
    backend: &Arc<dyn PdfBackend>,
    doc: &MarkdownDocument,
    margin: MarginConfig,
    timeout_secs: u64,
    name: &str,
) -> Result<Vec<u8>, ItemError> {
    let rendered = render_markdown(&doc.source_text);
    let composed = compose(&rendered, ComposeMode::PrintDocument);
    debug!(
        "{name}: composed {} bytes of HTML",
        composed.full_html.len()
    );
    render_to_pdf(backend, composed, margin, timeout_secs, name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimpleBackend;

    fn simple_config() -> ConversionConfig {
        ConversionConfig::builder()
            .backend(Arc::new(SimpleBackend::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn convert_names_output_after_source() {
        let doc = MarkdownDocument::new("report.md", "# Report\n\nBody text.");
        let pdf = convert(&doc, &simple_config()).await.unwrap();
        assert_eq!(pdf.output_name, "report.pdf");
        assert!(pdf.pdf_bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn convert_rejects_bad_margin_before_rendering() {
        let mut config = simple_config();
        config.margin.left_mm = 90;
        let doc = MarkdownDocument::new("a.md", "x");
        let err = convert(&doc, &config).await.unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn convert_to_file_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.md");
        std::fs::write(&src, "# In\n\ntext").unwrap();
        let out = dir.path().join("nested/out.pdf");

        let pdf = convert_to_file(src.to_str().unwrap(), &out, &simple_config())
            .await
            .unwrap();
        assert_eq!(pdf.output_name, "in.pdf");
        assert_eq!(std::fs::read(&out).unwrap(), pdf.pdf_bytes);
        assert!(!out.with_extension("pdf.tmp").exists());
    }

    #[tokio::test]
    async fn convert_to_file_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bin.md");
        std::fs::write(&src, [0xFFu8, 0xFE, 0x00]).unwrap();
        let err = convert_to_file(src.to_str().unwrap(), dir.path().join("x.pdf"), &simple_config())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Md2PdfError::Conversion(ItemError::Decode { .. })
        ));
    }

    #[test]
    fn convert_sync_works_outside_a_runtime() {
        let doc = MarkdownDocument::new("s.md", "sync");
        let pdf = convert_sync(&doc, &simple_config()).unwrap();
        assert!(pdf.pdf_bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn render_html_is_a_full_document() {
        let html = render_html("# Title");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1 id=\"title\">Title</h1>"));
    }

    #[test]
    fn preview_html_is_a_scoped_fragment() {
        let html = preview_html("*hi*");
        assert!(html.contains("<div class=\"md2pdf-preview\">"));
        assert!(html.contains("<em>hi</em>"));
        assert!(!html.contains("<!DOCTYPE"));
    }
}
