//! Result types returned by the conversion entry points.

use crate::archive;
use crate::error::{ItemError, ItemErrorKind, Md2PdfError};
use serde::{Deserialize, Serialize};

/// Output of a single-document conversion.
#[derive(Debug, Clone)]
pub struct ConvertedPdf {
    /// File name for the PDF, derived from the source name.
    pub output_name: String,
    /// A complete, self-contained PDF document.
    pub pdf_bytes: Vec<u8>,
}

/// Outcome for one document of a batch.
///
/// `index` is the document's position in the input, so
/// `results[i].index == i` always holds for a returned batch.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub index: usize,
    /// Name the document was submitted under.
    pub source_name: String,
    /// PDF file name, unique within its batch.
    pub output_name: String,
    /// PDF bytes, or the reason this document has none.
    pub outcome: Result<Vec<u8>, ItemError>,
    /// Wall-clock time spent on this document.
    pub duration_ms: u64,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn pdf_bytes(&self) -> Option<&[u8]> {
        self.outcome.as_ref().ok().map(Vec::as_slice)
    }

    pub fn error(&self) -> Option<&ItemError> {
        self.outcome.as_ref().err()
    }

    /// Consume into `(output_name, pdf_bytes)` for successful items.
    pub fn into_pdf(self) -> Option<(String, Vec<u8>)> {
        match self.outcome {
            Ok(bytes) => Some((self.output_name, bytes)),
            Err(_) => None,
        }
    }
}

/// Aggregate numbers for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    /// Decode and render failures.
    pub failed: usize,
    /// Items skipped because the batch was cancelled.
    pub cancelled: usize,
    pub total_pdf_bytes: u64,
    pub total_duration_ms: u64,
}

impl BatchStats {
    pub(crate) fn from_results(results: &[ConversionResult], total_duration_ms: u64) -> Self {
        let mut stats = BatchStats {
            total: results.len(),
            total_duration_ms,
            ..Default::default()
        };
        for r in results {
            match &r.outcome {
                Ok(bytes) => {
                    stats.succeeded += 1;
                    stats.total_pdf_bytes += bytes.len() as u64;
                }
                Err(e) if e.kind() == ItemErrorKind::Cancelled => stats.cancelled += 1,
                Err(_) => stats.failed += 1,
            }
        }
        stats
    }
}

/// Every result of a batch, in input order, plus summary stats.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub results: Vec<ConversionResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Successful results only, in input order.
    pub fn successes(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Failed and cancelled results, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Package the successful PDFs as a deflate ZIP archive.
    ///
    /// See [`crate::archive::to_zip_archive`].
    pub fn to_zip_archive(&self) -> Result<Vec<u8>, Md2PdfError> {
        archive::to_zip_archive(&self.results)
    }

    /// Treat any failed item as an error.
    pub fn into_result(self) -> Result<Self, Md2PdfError> {
        let failed = self.stats.total - self.stats.succeeded;
        if failed == 0 {
            Ok(self)
        } else {
            Err(Md2PdfError::PartialFailure {
                success: self.stats.succeeded,
                failed,
                total: self.stats.total,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(index: usize, name: &str, len: usize) -> ConversionResult {
        ConversionResult {
            index,
            source_name: format!("{name}.md"),
            output_name: format!("{name}.pdf"),
            outcome: Ok(vec![b'%'; len]),
            duration_ms: 1,
        }
    }

    fn failed(index: usize, error: ItemError) -> ConversionResult {
        ConversionResult {
            index,
            source_name: error.name().to_string(),
            output_name: "x.pdf".into(),
            outcome: Err(error),
            duration_ms: 0,
        }
    }

    #[test]
    fn stats_split_failures_and_cancellations() {
        let results = vec![
            ok(0, "a", 10),
            failed(
                1,
                ItemError::Decode {
                    name: "b.md".into(),
                    detail: "bad byte".into(),
                },
            ),
            failed(2, ItemError::Cancelled { name: "c.md".into() }),
            ok(3, "d", 5),
        ];
        let stats = BatchStats::from_results(&results, 42);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_pdf_bytes, 15);
        assert_eq!(stats.total_duration_ms, 42);
    }

    #[test]
    fn into_result_counts_cancellations_as_failures() {
        let results = vec![ok(0, "a", 1), failed(1, ItemError::Cancelled { name: "b.md".into() })];
        let stats = BatchStats::from_results(&results, 0);
        let err = BatchOutput { results, stats }.into_result().unwrap_err();
        assert!(err.to_string().contains("1/2"));
    }

    #[test]
    fn into_pdf_only_for_successes() {
        assert_eq!(ok(0, "a", 2).into_pdf().map(|(n, _)| n), Some("a.pdf".into()));
        assert!(failed(0, ItemError::Cancelled { name: "a.md".into() })
            .into_pdf()
            .is_none());
    }

    #[test]
    fn stats_and_item_errors_serialise_for_reports() {
        let results = vec![ok(0, "a", 3), failed(1, ItemError::Cancelled { name: "b.md".into() })];
        let stats = BatchStats::from_results(&results, 7);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["cancelled"], 1);
        assert_eq!(json["total_pdf_bytes"], 3);

        let err = serde_json::to_value(results[1].error()).unwrap();
        assert_eq!(err["Cancelled"]["name"], "b.md");
    }
}
