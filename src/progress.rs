//! Side channels of a batch: progress events and cooperative cancellation.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the batch converts each document. The conversion functions keep
//! returning plain values; progress never flows through their return types.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, completed: usize, _total: usize, _name: &str, _pdf_len: usize) {
//!         self.completed.store(completed, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Called by the batch converter as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Ordering
///
/// Events are delivered from the task driving the batch, one at a time.
/// The `completed` argument of [`on_item_complete`](Self::on_item_complete)
/// and [`on_item_error`](Self::on_item_error) grows by exactly one per call,
/// from 1 to `total`. With `concurrency > 1` the *index* of the finishing
/// document may not be monotonic, but the completed count always is.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any document is rendered.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a document enters the pipeline.
    ///
    /// # Arguments
    /// * `index` — 0-based position in the batch
    /// * `total` — batch size
    /// * `name`  — source file name
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document converted successfully.
    ///
    /// # Arguments
    /// * `completed` — documents finished so far, including this one
    /// * `total`     — batch size
    /// * `name`      — output file name
    /// * `pdf_len`   — size of the produced PDF in bytes
    fn on_item_complete(&self, completed: usize, total: usize, name: &str, pdf_len: usize) {
        let _ = (completed, total, name, pdf_len);
    }

    /// Called when a document failed (decode, render, timeout or cancellation).
    fn on_item_error(&self, completed: usize, total: usize, name: &str, error: &str) {
        let _ = (completed, total, name, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Shared flag used to stop a batch between documents.
///
/// Clones share the same flag. Documents already being rendered finish
/// normally; documents not yet started are reported as
/// [`crate::error::ItemError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
