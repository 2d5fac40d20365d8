//! # edgequake-md2pdf
//!
//! Convert Markdown documents to print-ready PDF, one at a time or in
//! batches, with a ZIP of the results and an HTML preview.
//!
//! ## Why this crate?
//!
//! Markdown renders well in browsers, but sharing a document usually means
//! sending a PDF. This crate fixes the whole chain in one place: a fixed set
//! of Markdown extensions, one embedded style sheet with sensible page-break
//! rules, configurable A4 margins, and a pluggable PDF engine. Batches keep
//! going when one document fails.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Input     read a file, download a URL, or take text directly
//!  ├─ 2. Render    pulldown-cmark with tables, smart typography, anchors, …
//!  ├─ 3. Compose   full HTML5 document with the embedded style sheet
//!  ├─ 4. Print     PdfBackend on the blocking pool, under a timeout
//!  └─ 5. Package   ordered results, stats, optional ZIP archive
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2pdf::{convert_all, ConversionConfig, MarkdownDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .margin_top(25)
//!         .margin_bottom(25)
//!         .build()?;
//!     let docs = vec![
//!         MarkdownDocument::new("report.md", std::fs::read_to_string("report.md")?),
//!         MarkdownDocument::new("notes.md", std::fs::read_to_string("notes.md")?),
//!     ];
//!     let output = convert_all(docs, &config).await?;
//!     for result in output.successes() {
//!         eprintln!("{} ok", result.output_name);
//!     }
//!     std::fs::write("converted_pdfs.zip", output.to_zip_archive()?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `md2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `chrome` | on      | Full-layout backend via headless Chromium (`headless_chrome`) |
//!
//! Without `chrome` the default backend is [`SimpleBackend`], which needs no
//! browser but only understands an HTML subset and prints ASCII text:
//! ```toml
//! edgequake-md2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod backend;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{to_zip_archive, ARCHIVE_NAME};
#[cfg(feature = "chrome")]
pub use backend::ChromeBackend;
pub use backend::{default_backend, PdfBackend, SimpleBackend};
pub use batch::{convert_all, convert_files};
pub use config::{ConversionConfig, ConversionConfigBuilder, MarginConfig};
pub use convert::{convert, convert_sync, convert_to_file, preview_html, render_html};
pub use error::{BackendError, ItemError, ItemErrorKind, Md2PdfError};
pub use output::{BatchOutput, BatchStats, ConversionResult, ConvertedPdf};
pub use pipeline::compose::ComposedDocument;
pub use pipeline::input::{pdf_file_name, InputFile, MarkdownDocument};
pub use progress::{
    CancellationFlag, ConversionProgressCallback, NoopProgressCallback, ProgressCallback,
};
pub use stream::{convert_files_stream, convert_stream, ResultStream};
