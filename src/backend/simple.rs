//! Constrained backend: HTML subset → PDF with `pdf-writer`.
//!
//! No external process, no network, no fonts to embed. The document is
//! sanitised to ASCII, parsed into blocks, laid out on A4 and written with the
//! three standard Type 1 fonts. Output is byte-for-byte deterministic: no
//! creation date, no document ID, uncompressed content streams.

use super::html::parse_blocks;
use super::layout::{layout_blocks, page_size, Font, Op, Page};
use super::sanitize::sanitize_html;
use super::PdfBackend;
use crate::config::MarginConfig;
use crate::error::BackendError;
use crate::pipeline::compose::ComposedDocument;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use tracing::debug;

const FONT_REGULAR: Name<'static> = Name(b"F1");
const FONT_BOLD: Name<'static> = Name(b"F2");
const FONT_MONO: Name<'static> = Name(b"F3");

#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleBackend;

impl SimpleBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for SimpleBackend {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn render_pdf(
        &self,
        doc: &ComposedDocument,
        margin: MarginConfig,
    ) -> Result<Vec<u8>, BackendError> {
        let html = sanitize_html(doc.as_str());
        let blocks = parse_blocks(&html);
        let pages = layout_blocks(&blocks, margin);
        debug!(
            "Simple backend: {} blocks laid out on {} pages",
            blocks.len(),
            pages.len()
        );
        write_pdf(&pages)
    }
}

fn font_name(font: Font) -> Name<'static> {
    match font {
        Font::Regular => FONT_REGULAR,
        Font::Bold => FONT_BOLD,
        Font::Mono => FONT_MONO,
    }
}

fn page_content(page: &Page) -> Vec<u8> {
    let mut content = Content::new();
    for op in &page.ops {
        match op {
            Op::Text {
                font,
                size,
                x,
                y,
                text,
            } => {
                content.begin_text();
                content.set_font(font_name(*font), *size);
                content.next_line(*x, *y);
                content.show(Str(text.as_bytes()));
                content.end_text();
            }
            Op::Rule { x1, x2, y, width } => {
                content.set_line_width(*width);
                content.move_to(*x1, *y);
                content.line_to(*x2, *y);
                content.stroke();
            }
        }
    }
    content.finish().to_vec()
}

fn write_pdf(pages: &[Page]) -> Result<Vec<u8>, BackendError> {
    if pages.is_empty() {
        return Err(BackendError::new("layout produced no pages"));
    }

    let mut next = 1;
    let mut bump = || {
        let id = Ref::new(next);
        next += 1;
        id
    };

    let catalog_id = bump();
    let page_tree_id = bump();
    let fonts = [
        (FONT_REGULAR, Name(b"Helvetica"), bump()),
        (FONT_BOLD, Name(b"Helvetica-Bold"), bump()),
        (FONT_MONO, Name(b"Courier"), bump()),
    ];
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (bump(), bump())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(pages.len() as i32);

    for (_, base_font, id) in &fonts {
        pdf.type1_font(*id).base_font(*base_font);
    }

    let (width, height) = page_size();
    for (page, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        {
            let mut pdf_page = pdf.page(*page_id);
            pdf_page.media_box(Rect::new(0.0, 0.0, width, height));
            pdf_page.parent(page_tree_id);
            pdf_page.contents(*content_id);
            let mut resources = pdf_page.resources();
            let mut font_dict = resources.fonts();
            for (name, _, id) in &fonts {
                font_dict.pair(*name, *id);
            }
        }
        pdf.stream(*content_id, &page_content(page));
    }

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compose::{compose, ComposeMode};
    use crate::pipeline::markdown::render_markdown;

    fn render(md: &str, margin: MarginConfig) -> Vec<u8> {
        let doc = compose(&render_markdown(md), ComposeMode::PrintDocument);
        SimpleBackend::new().render_pdf(&doc, margin).unwrap()
    }

    fn page_count(pdf: &[u8]) -> usize {
        let text = String::from_utf8_lossy(pdf);
        text.matches("/Type /Page\n").count() + text.matches("/Type /Page ").count()
    }

    #[test]
    fn test_output_is_a_pdf() {
        let pdf = render("# Hello\n\nWorld", MarginConfig::default());
        assert!(pdf.starts_with(b"%PDF-"));
        let tail = String::from_utf8_lossy(&pdf[pdf.len().saturating_sub(32)..]).into_owned();
        assert!(tail.contains("%%EOF"));
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("(Hello) Tj"));
        assert!(text.contains("/Helvetica-Bold"));
    }

    #[test]
    fn test_deterministic() {
        let md = "# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```\ncode\n```\n";
        assert_eq!(
            render(md, MarginConfig::default()),
            render(md, MarginConfig::default())
        );
    }

    #[test]
    fn test_empty_document_still_one_page() {
        let pdf = render("", MarginConfig::default());
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(String::from_utf8_lossy(&pdf).contains("/Count 1"));
    }

    #[test]
    fn test_page_break_class() {
        let pdf = render("one\n{: .page-break}\n\ntwo", MarginConfig::default());
        assert!(String::from_utf8_lossy(&pdf).contains("/Count 2"));
        assert!(page_count(&pdf) >= 2);
    }

    #[test]
    fn test_content_is_ascii_without_images() {
        let md = "┌──┐ — “quoted” → ✓\n\n![diagram](chart.png)\n";
        let pdf = render(md, MarginConfig::default());
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("[Image removed]"));
        assert!(!text.contains("chart.png"));
        assert!(text.contains("(+--+ - \"quoted\" -> v) Tj"));
    }
}
