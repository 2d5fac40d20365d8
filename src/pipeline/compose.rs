//! Wrap a rendered fragment into something a consumer can use.
//!
//! * [`ComposeMode::PrintDocument`]: a complete HTML5 document, UTF-8, with
//!   the print style sheet inlined. This is what the PDF backends receive.
//! * [`ComposeMode::PreviewFragment`]: a `<div class="md2pdf-preview">` with
//!   a scoped `<style>` block, ready to be dropped into any host page.

use super::markdown::RenderedHtml;
use super::style::{preview_css, print_css, PREVIEW_SCOPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    PrintDocument,
    PreviewFragment,
}

/// HTML ready for a PDF backend or a preview pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    pub full_html: String,
}

impl ComposedDocument {
    pub fn as_str(&self) -> &str {
        &self.full_html
    }
}

pub fn compose(rendered: &RenderedHtml, mode: ComposeMode) -> ComposedDocument {
    let body = &rendered.body_fragment;
    let full_html = match mode {
        ComposeMode::PrintDocument => {
            let css = print_css();
            let mut html = String::with_capacity(body.len() + css.len() + 256);
            html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
            html.push_str("<meta charset=\"utf-8\">\n");
            html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
            html.push_str("<style>");
            html.push_str(css);
            html.push_str("</style>\n</head>\n<body>\n");
            html.push_str(body);
            html.push_str("</body>\n</html>\n");
            html
        }
        ComposeMode::PreviewFragment => {
            let css = preview_css();
            let mut html = String::with_capacity(body.len() + css.len() + 128);
            html.push_str("<style>\n");
            html.push_str(css);
            html.push_str("</style>\n");
            html.push_str(&format!("<div class=\"{PREVIEW_SCOPE}\">\n"));
            html.push_str(body);
            html.push_str("</div>\n");
            html
        }
    };
    ComposedDocument { full_html }
}
