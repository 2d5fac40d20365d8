//! Streaming batch API: yield each document's result as soon as it and every
//! document before it have finished.
//!
//! ## Why stream?
//!
//! Large batches take a while. A stream lets callers write PDFs to disk,
//! update a UI or stop early without buffering the whole batch in memory.
//!
//! Results arrive in input order (`futures::StreamExt::buffered`), with up to
//! `config.concurrency` documents rendering at once. This is the engine behind
//! [`crate::batch::convert_all`] as well.

use crate::backend::{resolve_backend, PdfBackend};
use crate::config::{ConversionConfig, MarginConfig};
use crate::convert::render_document;
use crate::error::{ItemError, Md2PdfError};
use crate::output::ConversionResult;
use crate::pipeline::input::{pdf_file_name, unique_output_names, InputFile, MarkdownDocument};
use crate::progress::{CancellationFlag, ProgressCallback};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of per-document results, in input order.
pub type ResultStream = Pin<Box<dyn Stream<Item = ConversionResult> + Send>>;

/// Convert documents, streaming results in input order.
///
/// # Returns
/// - `Ok(ResultStream)`: exactly one [`ConversionResult`] per input
/// - `Err(Md2PdfError)`: invalid configuration or no inputs; nothing was
///   rendered
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{convert_stream, ConversionConfig, MarkdownDocument};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let docs = vec![
///     MarkdownDocument::new("a.md", "# A"),
///     MarkdownDocument::new("b.md", "# B"),
/// ];
/// let mut stream = convert_stream(docs, &ConversionConfig::default())?;
/// while let Some(result) = stream.next().await {
///     match result.pdf_bytes() {
///         Some(pdf) => std::fs::write(&result.output_name, pdf)?,
///         None => eprintln!("{}: {:?}", result.source_name, result.error()),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_stream(
    items: Vec<MarkdownDocument>,
    config: &ConversionConfig,
) -> Result<ResultStream, Md2PdfError> {
    let jobs = items
        .into_iter()
        .map(|doc| {
            (
                doc.source_name.clone(),
                doc.suggested_output_name.clone(),
                Ok(doc),
            )
        })
        .collect();
    job_stream(jobs, config)
}

/// Like [`convert_stream`], decoding raw files first.
///
/// Files that are not valid UTF-8 yield an [`ItemError::Decode`] result in
/// their slot; the rest of the batch is unaffected.
pub fn convert_files_stream(
    files: Vec<InputFile>,
    config: &ConversionConfig,
) -> Result<ResultStream, Md2PdfError> {
    let jobs = files
        .into_iter()
        .map(|file| {
            let source_name = file.file_name.clone();
            let output_name = pdf_file_name(&source_name);
            (source_name, output_name, MarkdownDocument::from_input(file))
        })
        .collect();
    job_stream(jobs, config)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// `(source_name, output_name, decoded document or decode error)`.
type Job = (String, String, Result<MarkdownDocument, ItemError>);

/// Everything one in-flight document needs, owned so the stream is `'static`.
#[derive(Clone)]
struct Shared {
    backend: Arc<dyn PdfBackend>,
    margin: MarginConfig,
    timeout_secs: u64,
    callback: Option<ProgressCallback>,
    cancellation: CancellationFlag,
    total: usize,
    completed: Arc<AtomicUsize>,
    succeeded: Arc<AtomicUsize>,
}

fn job_stream(jobs: Vec<Job>, config: &ConversionConfig) -> Result<ResultStream, Md2PdfError> {
    config.validate()?;
    if jobs.is_empty() {
        return Err(Md2PdfError::NoInputs);
    }

    let total = jobs.len();
    let backend = resolve_backend(config);
    info!(
        "Starting batch: {} documents, {} backend, concurrency {}, margin {}",
        total,
        backend.name(),
        config.concurrency,
        config.margin
    );

    let output_names = unique_output_names(jobs.iter().map(|(_, out, _)| out.as_str()));
    let shared = Shared {
        backend,
        margin: config.margin,
        timeout_secs: config.render_timeout_secs,
        callback: config.progress_callback.clone(),
        cancellation: config.cancellation.clone(),
        total,
        completed: Arc::new(AtomicUsize::new(0)),
        succeeded: Arc::new(AtomicUsize::new(0)),
    };

    let start_cb = shared.clone();
    let batch_start = stream::once(async move {
        if let Some(cb) = &start_cb.callback {
            cb.on_batch_start(start_cb.total);
        }
    })
    .filter_map(|()| async { None::<ConversionResult> });

    let work_shared = shared.clone();
    let work = stream::iter(jobs.into_iter().zip(output_names).enumerate())
        .map(move |(index, ((source_name, _, doc), output_name))| {
            run_job(work_shared.clone(), index, source_name, output_name, doc)
        })
        .buffered(config.concurrency.max(1));

    let end_cb = shared;
    let batch_end = stream::once(async move {
        let succeeded = end_cb.succeeded.load(Ordering::SeqCst);
        info!("Batch complete: {}/{} succeeded", succeeded, end_cb.total);
        if let Some(cb) = &end_cb.callback {
            cb.on_batch_complete(end_cb.total, succeeded);
        }
    })
    .filter_map(|()| async { None::<ConversionResult> });

    Ok(Box::pin(batch_start.chain(work).chain(batch_end)))
}

async fn run_job(
    shared: Shared,
    index: usize,
    source_name: String,
    output_name: String,
    doc: Result<MarkdownDocument, ItemError>,
) -> ConversionResult {
    let started = Instant::now();

    let outcome = if shared.cancellation.is_cancelled() {
        debug!("{source_name}: skipped, batch cancelled");
        Err(ItemError::Cancelled {
            name: source_name.clone(),
        })
    } else {
        if let Some(cb) = &shared.callback {
            cb.on_item_start(index, shared.total, &source_name);
        }
        match doc {
            Ok(doc) => {
                render_document(
                    &shared.backend,
                    &doc,
                    shared.margin,
                    shared.timeout_secs,
                    &source_name,
                )
                .await
            }
            Err(e) => Err(e),
        }
    };

    // Futures of one `buffered` stream are polled by a single task, so the
    // increment and the callback below never interleave with another item's.
    let completed = shared.completed.fetch_add(1, Ordering::SeqCst) + 1;
    match &outcome {
        Ok(bytes) => {
            shared.succeeded.fetch_add(1, Ordering::SeqCst);
            debug!("[{completed}/{}] {output_name}: {} bytes", shared.total, bytes.len());
            if let Some(cb) = &shared.callback {
                cb.on_item_complete(completed, shared.total, &output_name, bytes.len());
            }
        }
        Err(e) => {
            warn!("[{completed}/{}] {e}", shared.total);
            if let Some(cb) = &shared.callback {
                cb.on_item_error(completed, shared.total, &output_name, &e.to_string());
            }
        }
    }

    ConversionResult {
        index,
        source_name,
        output_name,
        outcome,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
