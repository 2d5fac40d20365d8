//! ZIP packaging of a batch's PDFs.

use crate::error::Md2PdfError;
use crate::output::ConversionResult;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// File name under which a batch archive is offered for download.
pub const ARCHIVE_NAME: &str = "converted_pdfs.zip";

/// Pack every successful result into one deflate-compressed ZIP.
///
/// Entries appear in result order, named by `output_name`. Failed and
/// cancelled results are skipped. Entry timestamps are fixed, so the same
/// results always produce the same archive bytes.
pub fn to_zip_archive(results: &[ConversionResult]) -> Result<Vec<u8>, Md2PdfError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut entries = 0usize;
    for (name, bytes) in results
        .iter()
        .filter_map(|r| r.pdf_bytes().map(|b| (&r.output_name, b)))
    {
        zip.start_file(name.as_str(), options)
            .map_err(|e| Md2PdfError::ArchiveFailed(format!("{name}: {e}")))?;
        zip.write_all(bytes)
            .map_err(|e| Md2PdfError::ArchiveFailed(format!("{name}: {e}")))?;
        entries += 1;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Md2PdfError::ArchiveFailed(e.to_string()))?;
    let bytes = cursor.into_inner();
    debug!("Archive: {} entries, {} bytes", entries, bytes.len());
    Ok(bytes)
}
