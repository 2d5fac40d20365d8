//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One config describes one job: the
//! same margins, timeout and backend apply to every document in a batch.
//!
//! Margins live in their own [`MarginConfig`] value because they are passed
//! by value into every backend call and validated once per job.

use crate::backend::PdfBackend;
use crate::error::Md2PdfError;
use crate::progress::{CancellationFlag, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Largest margin accepted on any side unless the caller raises the cap.
pub const DEFAULT_MAX_MARGIN_MM: u32 = 50;

/// Hard ceiling for [`ConversionConfig::max_margin_mm`]. Two margins of this
/// size still leave a 10mm wide text column on A4.
pub const MARGIN_CAP_CEILING_MM: u32 = 100;

/// ISO A4 paper size in millimetres (width, height).
pub const A4_MM: (f32, f32) = (210.0, 297.0);

const MM_PER_INCH: f32 = 25.4;
const POINTS_PER_INCH: f32 = 72.0;

/// Page margins in whole millimetres.
///
/// Immutable once built; `Copy` so it can be handed to each backend call.
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::MarginConfig;
///
/// let m = MarginConfig::new(25, 20, 25, 20);
/// assert!(m.validate(50).is_ok());
/// assert!(MarginConfig::uniform(60).validate(50).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarginConfig {
    pub top_mm: u32,
    pub right_mm: u32,
    pub bottom_mm: u32,
    pub left_mm: u32,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self::uniform(20)
    }
}

impl MarginConfig {
    /// Margins in CSS order: top, right, bottom, left.
    pub const fn new(top_mm: u32, right_mm: u32, bottom_mm: u32, left_mm: u32) -> Self {
        Self {
            top_mm,
            right_mm,
            bottom_mm,
            left_mm,
        }
    }

    /// The same margin on all four sides.
    pub const fn uniform(mm: u32) -> Self {
        Self::new(mm, mm, mm, mm)
    }

    /// `(name, value)` for each side, in CSS order.
    pub fn sides(&self) -> [(&'static str, u32); 4] {
        [
            ("top", self.top_mm),
            ("right", self.right_mm),
            ("bottom", self.bottom_mm),
            ("left", self.left_mm),
        ]
    }

    /// Check every side against `max_mm`.
    ///
    /// Each side is bounded independently; the first offending side is
    /// reported.
    pub fn validate(&self, max_mm: u32) -> Result<(), Md2PdfError> {
        for (side, value) in self.sides() {
            if value > max_mm {
                return Err(Md2PdfError::MarginOutOfRange {
                    side,
                    value,
                    max: max_mm,
                });
            }
        }
        Ok(())
    }

    /// Margins in inches (top, right, bottom, left), as print-to-PDF expects.
    pub fn to_inches(&self) -> [f64; 4] {
        self.sides()
            .map(|(_, mm)| f64::from(mm) / f64::from(MM_PER_INCH))
    }

    /// Margins in PDF points (top, right, bottom, left).
    pub fn to_points(&self) -> [f32; 4] {
        self.sides().map(|(_, mm)| mm_to_points(mm as f32))
    }

    /// CSS shorthand, e.g. `20mm 15mm 20mm 15mm`.
    pub fn to_css(&self) -> String {
        format!(
            "{}mm {}mm {}mm {}mm",
            self.top_mm, self.right_mm, self.bottom_mm, self.left_mm
        )
    }
}

impl fmt::Display for MarginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Convert millimetres to PDF points.
pub fn mm_to_points(mm: f32) -> f32 {
    mm / MM_PER_INCH * POINTS_PER_INCH
}

/// Configuration for a Markdown-to-PDF job.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::{ConversionConfig, MarginConfig};
///
/// let config = ConversionConfig::builder()
///     .margin(MarginConfig::new(25, 20, 25, 20))
///     .concurrency(4)
///     .render_timeout_secs(45)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Page margins applied to every document of the job. Default: 20mm all round.
    pub margin: MarginConfig,

    /// Largest accepted margin on any side. Default: 50.
    pub max_margin_mm: u32,

    /// Maximum number of documents rendered at the same time. Default: 2.
    ///
    /// Each in-flight document holds one browser tab (or one blocking
    /// thread for the constrained backend). Results are always returned in
    /// input order regardless of this value.
    pub concurrency: usize,

    /// Per-document render timeout in seconds. Default: 30.
    ///
    /// Composed documents have no network dependencies so rendering normally
    /// settles in well under a second; the timeout only guards against a
    /// wedged backend.
    pub render_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed PDF backend. When `None`, [`crate::backend::default_backend`]
    /// picks the backend compiled into this build.
    pub backend: Option<Arc<dyn PdfBackend>>,

    /// Receives batch progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Checked between documents; set it to stop a batch early.
    pub cancellation: CancellationFlag,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            margin: MarginConfig::default(),
            max_margin_mm: DEFAULT_MAX_MARGIN_MM,
            concurrency: 2,
            render_timeout_secs: 30,
            download_timeout_secs: 120,
            backend: None,
            progress_callback: None,
            cancellation: CancellationFlag::new(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("margin", &self.margin)
            .field("max_margin_mm", &self.max_margin_mm)
            .field("concurrency", &self.concurrency)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Validate the job-wide settings.
    ///
    /// Called at the start of every conversion entry point so a config whose
    /// public fields were edited after `build()` is still checked before any
    /// document is rendered.
    pub fn validate(&self) -> Result<(), Md2PdfError> {
        if self.max_margin_mm > MARGIN_CAP_CEILING_MM {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Margin cap must be ≤ {MARGIN_CAP_CEILING_MM}mm, got {}mm",
                self.max_margin_mm
            )));
        }
        self.margin.validate(self.max_margin_mm)?;
        if self.concurrency == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if self.render_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Render timeout must be ≥ 1s".into(),
            ));
        }
        if self.download_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Download timeout must be ≥ 1s".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn margin(mut self, margin: MarginConfig) -> Self {
        self.config.margin = margin;
        self
    }

    pub fn margin_top(mut self, mm: u32) -> Self {
        self.config.margin.top_mm = mm;
        self
    }

    pub fn margin_right(mut self, mm: u32) -> Self {
        self.config.margin.right_mm = mm;
        self
    }

    pub fn margin_bottom(mut self, mm: u32) -> Self {
        self.config.margin.bottom_mm = mm;
        self
    }

    pub fn margin_left(mut self, mm: u32) -> Self {
        self.config.margin.left_mm = mm;
        self
    }

    pub fn max_margin_mm(mut self, mm: u32) -> Self {
        self.config.max_margin_mm = mm;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancellation(mut self, flag: CancellationFlag) -> Self {
        self.config.cancellation = flag;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_margins_are_twenty_mm() {
        let m = MarginConfig::default();
        assert_eq!(m, MarginConfig::new(20, 20, 20, 20));
        assert_eq!(m.to_css(), "20mm 20mm 20mm 20mm");
    }

    #[test]
    fn validate_reports_first_offending_side() {
        let err = MarginConfig::new(10, 51, 60, 0).validate(50).unwrap_err();
        match err {
            Md2PdfError::MarginOutOfRange { side, value, max } => {
                assert_eq!(side, "right");
                assert_eq!(value, 51);
                assert_eq!(max, 50);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(MarginConfig::uniform(0).validate(50).is_ok());
        assert!(MarginConfig::uniform(50).validate(50).is_ok());
    }

    #[test]
    fn unit_conversions() {
        let m = MarginConfig::new(254, 0, 0, 0);
        assert!((m.to_inches()[0] - 10.0).abs() < 1e-9);
        let pts = MarginConfig::uniform(25).to_points();
        assert!((pts[0] - 70.866).abs() < 0.01);
    }

    #[test]
    fn builder_rejects_large_margin() {
        let err = ConversionConfig::builder().margin_top(70).build().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn builder_allows_raised_cap() {
        let config = ConversionConfig::builder()
            .max_margin_mm(80)
            .margin_left(70)
            .build()
            .expect("valid config");
        assert_eq!(config.margin.left_mm, 70);
    }

    #[test]
    fn builder_rejects_cap_above_ceiling() {
        assert!(ConversionConfig::builder()
            .max_margin_mm(150)
            .build()
            .is_err());
    }

    #[test]
    fn builder_clamps_concurrency_and_timeout() {
        let config = ConversionConfig::builder()
            .concurrency(0)
            .render_timeout_secs(0)
            .download_timeout_secs(0)
            .build()
            .expect("clamped values are valid");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.render_timeout_secs, 1);
        assert_eq!(config.download_timeout_secs, 1);
    }

    #[test]
    fn validate_catches_edited_fields() {
        let mut config = ConversionConfig::default();
        config.margin.bottom_mm = 99;
        assert!(config.validate().is_err());

        let mut config = ConversionConfig::default();
        config.download_timeout_secs = 0;
        assert!(config.validate().unwrap_err().is_config_error());
    }
}
