//! Eager batch conversion: wait for every document, then return them all.
//!
//! One bad document never fails the batch. Its [`ConversionResult`] carries
//! the [`crate::error::ItemError`] and every other document is converted as
//! usual. Only job-wide problems (invalid margins, an empty batch) are
//! returned as `Err`, and those are detected before anything is rendered.
//!
//! Use [`crate::stream::convert_stream`] to handle results as they arrive.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::output::{BatchOutput, BatchStats, ConversionResult};
use crate::pipeline::input::{InputFile, MarkdownDocument};
use crate::stream::{convert_files_stream, convert_stream, ResultStream};
use futures::StreamExt;
use std::time::Instant;
use tracing::info;

/// Convert every document under one configuration.
///
/// # Returns
/// `Ok(BatchOutput)` with exactly one result per input, in input order
/// (`results[i].index == i`), even when some documents failed. Check
/// `output.stats.failed` or call [`BatchOutput::into_result`].
///
/// # Errors
/// - [`Md2PdfError::MarginOutOfRange`] / [`Md2PdfError::InvalidConfig`]
/// - [`Md2PdfError::NoInputs`] for an empty batch
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{convert_all, ConversionConfig, MarkdownDocument, ARCHIVE_NAME};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let docs = vec![
///     MarkdownDocument::new("intro.md", "# Intro"),
///     MarkdownDocument::new("usage.md", "# Usage"),
/// ];
/// let output = convert_all(docs, &ConversionConfig::default()).await?;
/// std::fs::write(ARCHIVE_NAME, output.to_zip_archive()?)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_all(
    items: Vec<MarkdownDocument>,
    config: &ConversionConfig,
) -> Result<BatchOutput, Md2PdfError> {
    let start = Instant::now();
    let stream = convert_stream(items, config)?;
    Ok(collect(stream, start).await)
}

/// Decode and convert raw files.
///
/// Files that are not valid UTF-8 get an `ItemError::Decode` result and do
/// not stop the batch.
pub async fn convert_files(
    files: Vec<InputFile>,
    config: &ConversionConfig,
) -> Result<BatchOutput, Md2PdfError> {
    let start = Instant::now();
    let stream = convert_files_stream(files, config)?;
    Ok(collect(stream, start).await)
}

async fn collect(stream: ResultStream, start: Instant) -> BatchOutput {
    let results: Vec<ConversionResult> = stream.collect().await;
    let stats = BatchStats::from_results(&results, start.elapsed().as_millis() as u64);
    info!(
        "Batch finished: {} ok, {} failed, {} cancelled, {}ms",
        stats.succeeded, stats.failed, stats.cancelled, stats.total_duration_ms
    );
    BatchOutput { results, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimpleBackend;
    use std::sync::Arc;

    fn config() -> ConversionConfig {
        ConversionConfig::builder()
            .backend(Arc::new(SimpleBackend::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_names_are_made_unique() {
        let docs = vec![
            MarkdownDocument::new("a/readme.md", "one"),
            MarkdownDocument::new("b/readme.md", "two"),
            MarkdownDocument::new("readme.markdown", "three"),
        ];
        let output = convert_all(docs, &config()).await.unwrap();
        let names: Vec<&str> = output.results.iter().map(|r| r.output_name.as_str()).collect();
        assert_eq!(names, vec!["readme.pdf", "readme-2.pdf", "readme-3.pdf"]);
    }

    #[tokio::test]
    async fn stats_reflect_results() {
        let files = vec![
            InputFile::new("a.md", "# A"),
            InputFile::new("b.md", vec![0xFF]),
        ];
        let output = convert_files(files, &config()).await.unwrap();
        assert_eq!(output.stats.total, 2);
        assert_eq!(output.stats.succeeded, 1);
        assert_eq!(output.stats.failed, 1);
        assert!(output.stats.total_pdf_bytes > 0);
        assert!(output.into_result().is_err());
    }

    #[tokio::test]
    async fn invalid_margin_fails_the_whole_job() {
        let mut cfg = config();
        cfg.margin.top_mm = 51;
        let err = convert_all(vec![MarkdownDocument::new("a.md", "x")], &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::MarginOutOfRange { side: "top", .. }));
    }
}
