//! Inputs: resolve paths and URLs to bytes, decode them, name the outputs.
//!
//! Markdown is small, so unlike binary inputs there is no temp-file staging:
//! local files are read into memory and URLs are downloaded straight into an
//! [`InputFile`].

use crate::error::{ItemError, Md2PdfError};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Raw bytes of one document plus the name it was submitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A decoded Markdown document, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    /// Name the document was submitted under, e.g. `notes.md`.
    pub source_name: String,
    pub source_text: String,
    pub suggested_output_name: String,
}

impl MarkdownDocument {
    /// Build from text. The output name is derived from `source_name`.
    pub fn new(source_name: &str, source_text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.to_string(),
            source_text: source_text.into(),
            suggested_output_name: pdf_file_name(source_name),
        }
    }

    /// Decode an input as UTF-8, stripping a leading byte-order mark.
    pub fn from_input(input: InputFile) -> Result<Self, ItemError> {
        let InputFile { file_name, bytes } = input;
        let mut text = String::from_utf8(bytes).map_err(|e| ItemError::Decode {
            name: file_name.clone(),
            detail: e.utf8_error().to_string(),
        })?;
        if text.starts_with('\u{FEFF}') {
            text.drain(..'\u{FEFF}'.len_utf8());
        }
        Ok(Self::new(&file_name, text))
    }
}

/// Output name for a source file name.
///
/// A trailing `.md` or `.markdown` (any case) becomes `.pdf`; any other name
/// gets `.pdf` appended. Directory components are dropped, and an empty stem
/// falls back to `document.pdf`.
pub fn pdf_file_name(source_name: &str) -> String {
    let base = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name)
        .trim();

    let lower = base.to_ascii_lowercase();
    let stem = if lower.ends_with(".markdown") {
        &base[..base.len() - ".markdown".len()]
    } else if lower.ends_with(".md") {
        &base[..base.len() - ".md".len()]
    } else {
        base
    };

    if stem.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

/// Make names unique within one batch: the second `a.pdf` becomes `a-2.pdf`,
/// the third `a-3.pdf`, skipping names that are already taken.
pub fn unique_output_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let names: Vec<&str> = names.into_iter().collect();
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        if !taken.contains_key(name) {
            taken.insert(name.to_string(), 1);
            out.push(name.to_string());
            continue;
        }
        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };
        let mut n = taken.get(name).copied().unwrap_or(1);
        let candidate = loop {
            n += 1;
            let candidate = format!("{stem}-{n}{ext}");
            if !taken.contains_key(&candidate) {
                break candidate;
            }
        };
        taken.insert(name.to_string(), n);
        taken.insert(candidate.clone(), 1);
        out.push(candidate);
    }
    out
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or HTTP(S) URL to its bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<InputFile, Md2PdfError> {
    if input.trim().is_empty() {
        return Err(Md2PdfError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<InputFile, Md2PdfError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Md2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Md2PdfError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(InputFile { file_name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<InputFile, Md2PdfError> {
    info!("Downloading Markdown from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| Md2PdfError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Md2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Md2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Md2PdfError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(parsed.clone()).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(Md2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    let file_name = file_name_from_url(&parsed);
    info!("Downloaded {} bytes as {}", bytes.len(), file_name);

    Ok(InputFile {
        file_name,
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment of the URL, or `downloaded.md`.
fn file_name_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded.md".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.md"));
        assert!(is_url("http://example.com/doc.md"));
        assert!(!is_url("/tmp/doc.md"));
        assert!(!is_url("doc.md"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("report.md"), "report.pdf");
        assert_eq!(pdf_file_name("notes.markdown"), "notes.pdf");
        assert_eq!(pdf_file_name("readme"), "readme.pdf");
        assert_eq!(pdf_file_name("README.MD"), "README.pdf");
        assert_eq!(pdf_file_name("Notes.Markdown"), "Notes.pdf");
        assert_eq!(pdf_file_name("docs/guide.md"), "guide.pdf");
        assert_eq!(pdf_file_name("C:\\docs\\guide.md"), "guide.pdf");
        assert_eq!(pdf_file_name(".md"), "document.pdf");
        assert_eq!(pdf_file_name(""), "document.pdf");
    }

    #[test]
    fn test_only_the_suffix_is_replaced() {
        // A name like "my.md.notes.md" must not lose its middle ".md".
        assert_eq!(pdf_file_name("my.md.notes.md"), "my.md.notes.pdf");
        assert_eq!(pdf_file_name("cmd"), "cmd.pdf");
    }

    #[test]
    fn test_unique_output_names() {
        let names = unique_output_names(["a.pdf", "b.pdf", "a.pdf", "a.pdf", "a-2.pdf"]);
        assert_eq!(names, vec!["a.pdf", "b.pdf", "a-2.pdf", "a-3.pdf", "a-2-2.pdf"]);
    }

    #[test]
    fn test_from_input_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"# Title");
        let doc = MarkdownDocument::from_input(InputFile::new("t.md", bytes)).unwrap();
        assert_eq!(doc.source_text, "# Title");
        assert_eq!(doc.suggested_output_name, "t.pdf");
    }

    #[test]
    fn test_from_input_rejects_invalid_utf8() {
        let err = MarkdownDocument::from_input(InputFile::new("bad.md", vec![b'a', 0xFF, 0xFE]))
            .unwrap_err();
        assert!(matches!(err, ItemError::Decode { ref name, .. } if name == "bad.md"));
    }

    #[test]
    fn test_file_name_from_url() {
        let url = reqwest::Url::parse("https://example.com/docs/guide.md").unwrap();
        assert_eq!(file_name_from_url(&url), "guide.md");
        let url = reqwest::Url::parse("https://example.com/").unwrap();
        assert_eq!(file_name_from_url(&url), "downloaded.md");
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let err = resolve_input("/definitely/not/here.md", 5).await.unwrap_err();
        assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.md");
        std::fs::write(&path, "hello").unwrap();
        let input = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(input.file_name, "local.md");
        assert_eq!(input.bytes, b"hello");
    }
}
