//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the PDF backend can be swapped without touching
//! the stages before it.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ markdown ──▶ compose ──▶ render
//! (path/URL)  (pulldown)   (+ style)   (PdfBackend)
//! ```
//!
//! 1. [`input`]: read a path or download a URL, decode UTF-8, name the output
//! 2. [`markdown`]: Markdown → HTML fragment with the fixed extension set
//! 3. [`compose`]: wrap the fragment with [`style`] into a print document
//!    or a scoped preview fragment
//! 4. [`render`]: run the configured backend on the blocking pool under a
//!    timeout

pub mod compose;
pub mod input;
pub mod markdown;
pub mod render;
pub mod style;
