//! Markdown → HTML fragment.
//!
//! Wraps `pulldown-cmark` with one fixed set of extensions, all active at
//! once:
//!
//! | Extension | How |
//! |-----------|-----|
//! | fenced code | CommonMark core; blocks wrapped in `<div class="codehilite">` |
//! | tables | `ENABLE_TABLES` |
//! | newline → `<br />` | soft breaks rewritten to hard breaks |
//! | sane lists | CommonMark list rules (bullet/ordered changes start a new list) |
//! | smart typography | `ENABLE_SMART_PUNCTUATION` |
//! | heading anchors | every heading gets an `id` (explicit ids win) |
//! | attribute lists | `{#id .class key=value}` on headings, or alone on a paragraph's last line |
//!
//! Rendering never fails: unparsable constructs fall back to literal text.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;

/// HTML fragment produced from Markdown (no `<html>`/`<body>` wrapper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHtml {
    pub body_fragment: String,
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// Render Markdown source to an HTML fragment.
pub fn render_markdown(source: &str) -> RenderedHtml {
    let mut events: Vec<Event<'_>> = Vec::new();
    for event in Parser::new_ext(source, parser_options()) {
        let event = match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        };
        // Smart punctuation splits text runs; merge them back.
        if let (Event::Text(text), Some(Event::Text(prev))) = (&event, events.last_mut()) {
            let mut merged = prev.to_string();
            merged.push_str(text);
            *prev = CowStr::from(merged);
            continue;
        }
        events.push(event);
    }

    let events = decorate(events);

    let mut body_fragment = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut body_fragment, events.into_iter());
    RenderedHtml { body_fragment }
}

/// Assign heading ids, apply paragraph attribute lists and wrap code blocks.
fn decorate(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut ids = HeadingIds::default();
    let mut out = Vec::with_capacity(events.len() + 8);
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let inner: Vec<Event<'_>> = iter
                    .by_ref()
                    .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
                    .collect();

                let id = match id {
                    Some(explicit) => {
                        ids.reserve(&explicit);
                        explicit
                    }
                    None => CowStr::from(ids.unique(&slugify(&plain_text(&inner)))),
                };

                out.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(id),
                    classes,
                    attrs,
                }));
                out.extend(inner);
                out.push(Event::End(TagEnd::Heading(level)));
            }
            Event::Start(Tag::Paragraph) => {
                let mut inner: Vec<Event<'_>> = iter
                    .by_ref()
                    .take_while(|e| !matches!(e, Event::End(TagEnd::Paragraph)))
                    .collect();

                match take_trailing_attributes(&mut inner) {
                    Some(attrs) => {
                        if let Some(id) = &attrs.id {
                            ids.reserve(id);
                        }
                        out.push(Event::Html(CowStr::from(format!("<p{}>", attrs.to_html()))));
                        out.extend(inner);
                        out.push(Event::Html(CowStr::Borrowed("</p>\n")));
                    }
                    None => {
                        out.push(Event::Start(Tag::Paragraph));
                        out.extend(inner);
                        out.push(Event::End(TagEnd::Paragraph));
                    }
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                out.push(Event::Html(CowStr::Borrowed("<div class=\"codehilite\">")));
                out.push(Event::Start(Tag::CodeBlock(kind)));
            }
            Event::End(TagEnd::CodeBlock) => {
                out.push(Event::End(TagEnd::CodeBlock));
                out.push(Event::Html(CowStr::Borrowed("</div>\n")));
            }
            other => out.push(other),
        }
    }

    out
}

/// Concatenated text content of inline events.
fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::HardBreak | Event::SoftBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// GitHub-style slug: lowercase ASCII words joined by hyphens.
pub fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Tracks anchors already used in one document.
#[derive(Default)]
struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    /// `slug`, or `slug_1`, `slug_2`, … when taken.
    fn unique(&mut self, slug: &str) -> String {
        let base = if slug.is_empty() { "section" } else { slug };
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

// ── Attribute lists ──────────────────────────────────────────────────────────

/// A whole line `{: #id .class key=value}` (colon optional).
static RE_TRAILING_ATTRS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\{:?\s*([^{}]*[#.=][^{}]*)\}\s*$").unwrap());

/// One `key=value`, `key="value"`, `#id` or `.class` token. Smart punctuation
/// may already have turned straight quotes into curly ones.
static RE_ATTR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w:-]*)=(?:["“”]([^"“”]*)["“”]|['‘’]([^'‘’]*)['‘’]|(\S+))|#([\w:-]+)|\.([\w-]+)"#)
        .unwrap()
});

#[derive(Debug, Default, PartialEq, Eq)]
struct BlockAttributes {
    id: Option<String>,
    classes: Vec<String>,
    pairs: Vec<(String, String)>,
}

impl BlockAttributes {
    fn parse(spec: &str) -> Option<Self> {
        let mut attrs = BlockAttributes::default();
        for caps in RE_ATTR_TOKEN.captures_iter(spec) {
            if let Some(key) = caps.get(1) {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map_or("", |m| m.as_str());
                attrs.pairs.push((key.as_str().to_string(), value.to_string()));
            } else if let Some(id) = caps.get(5) {
                attrs.id = Some(id.as_str().to_string());
            } else if let Some(class) = caps.get(6) {
                attrs.classes.push(class.as_str().to_string());
            }
        }
        if attrs == BlockAttributes::default() {
            None
        } else {
            Some(attrs)
        }
    }

    fn to_html(&self) -> String {
        let mut html = String::new();
        if let Some(id) = &self.id {
            html.push_str(&format!(" id=\"{}\"", escape_attr(id)));
        }
        if !self.classes.is_empty() {
            html.push_str(&format!(" class=\"{}\"", escape_attr(&self.classes.join(" "))));
        }
        for (key, value) in &self.pairs {
            html.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
        }
        html
    }
}

/// Strip an attribute list written on the paragraph's last line.
///
/// Braces on the same line as the text are prose and stay literal.
fn take_trailing_attributes(inner: &mut Vec<Event<'_>>) -> Option<BlockAttributes> {
    let [.., Event::HardBreak, Event::Text(last)] = inner.as_slice() else {
        return None;
    };
    let caps = RE_TRAILING_ATTRS.captures(last)?;
    let attrs = BlockAttributes::parse(&caps[1])?;

    inner.truncate(inner.len() - 2);
    Some(attrs)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        render_markdown(md).body_fragment
    }

    #[test]
    fn fragment_has_no_document_wrapper() {
        let html = render("# Title\n\nBody");
        assert!(!html.contains("<html"));
        assert!(!html.contains("<body"));
    }

    #[test]
    fn fenced_code_is_wrapped_and_escaped() {
        let html = render("```rust\nfn main() { let a = 1 < 2; }\n```\n");
        let div = html.find("<div class=\"codehilite\">").expect("wrapper");
        let pre = html.find("<pre><code class=\"language-rust\">").expect("code block");
        assert!(div < pre);
        assert!(html.contains("1 &lt; 2"));
        assert!(html.contains("</code></pre>\n</div>"));
    }

    #[test]
    fn tables_render() {
        let html = render("| A | B |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>A</th>"));
        assert!(html.contains("<td>2</td>"));
    }

    #[test]
    fn newlines_become_line_breaks() {
        let html = render("first line\nsecond line");
        assert!(html.contains("first line<br />"), "got: {html}");
    }

    #[test]
    fn smart_typography() {
        let html = render("\"quoted\" -- and --- wait...");
        assert!(html.contains('“') && html.contains('”'), "got: {html}");
        assert!(html.contains('–'));
        assert!(html.contains('—'));
        assert!(html.contains('…'));
    }

    #[test]
    fn headings_get_unique_anchors() {
        let html = render("# Getting Started\n\n## Getting Started\n\n## Getting Started");
        assert!(html.contains("<h1 id=\"getting-started\">"));
        assert!(html.contains("<h2 id=\"getting-started_1\">"));
        assert!(html.contains("<h2 id=\"getting-started_2\">"));
    }

    #[test]
    fn explicit_heading_id_wins() {
        let html = render("# Intro {#start .lead}\n\n# Start");
        assert!(html.contains("id=\"start\""));
        assert!(html.contains("class=\"lead\""));
        assert!(html.contains("<h1 id=\"start_1\">Start</h1>"), "got: {html}");
    }

    #[test]
    fn empty_heading_gets_fallback_anchor() {
        let html = render("# !!!");
        assert!(html.contains("id=\"section\""), "got: {html}");
    }

    #[test]
    fn paragraph_attribute_list() {
        let html = render("A paragraph.\n{: #intro .page-break }");
        assert!(
            html.contains("<p id=\"intro\" class=\"page-break\">A paragraph.</p>"),
            "got: {html}"
        );
    }

    #[test]
    fn same_line_braces_are_prose() {
        for (md, expected) in [
            ("Elements of the set {a.b}", "<p>Elements of the set {a.b}</p>"),
            ("Pass the options {verbose=true}", "<p>Pass the options {verbose=true}</p>"),
            ("See the id {#ref}", "<p>See the id {#ref}</p>"),
        ] {
            let html = render(md);
            assert!(html.contains(expected), "{md:?} rendered as {html}");
        }
    }

    #[test]
    fn lone_attribute_line_is_not_applied_to_an_empty_paragraph() {
        let html = render("{: .page-break}");
        assert!(html.contains("<p>{: .page-break}</p>"), "got: {html}");
    }

    #[test]
    fn paragraph_attribute_list_on_own_line() {
        let html = render("Closing words\n{: .page-break}");
        assert!(html.contains("<p class=\"page-break\">Closing words</p>"), "got: {html}");
    }

    #[test]
    fn key_value_attributes_survive_smart_quotes() {
        let html = render("Note\n{: title=\"hello world\"}");
        assert!(html.contains("<p title=\"hello world\">Note</p>"), "got: {html}");
    }

    #[test]
    fn braces_without_attributes_stay_literal() {
        let html = render("Use {braces} freely");
        assert!(html.contains("<p>Use {braces} freely</p>"), "got: {html}");
    }

    #[test]
    fn ordered_list_keeps_start_and_types_do_not_mix() {
        let html = render("3. three\n4. four\n\n- bullet\n");
        assert!(html.contains("<ol start=\"3\">"));
        assert!(html.contains("<ul>"));
    }

    #[test]
    fn malformed_markdown_does_not_fail() {
        let html = render("```\nunterminated fence\n\n| broken | table\n**bold");
        assert!(html.contains("unterminated fence"));
        let html = render("");
        assert!(html.is_empty());
    }

    #[test]
    fn slugify_examples() {
        assert_eq!(slugify("Chapter One"), "chapter-one");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
