//! The embedded style sheet shared by print output and preview.
//!
//! [`PRINT_CSS`] is inlined into every composed document so the PDF backend
//! never fetches styling from the network or the file system. Pagination is
//! controlled from here, not from the backends:
//!
//! * headings never end a page (`page-break-after: avoid`)
//! * `pre`, `blockquote`, `table` and `img` never split across pages when
//!   they fit on one (`page-break-inside: avoid`)
//! * an element with class `page-break` forces a new page after it
//!
//! The preview variant is derived once from the same rules, with every
//! selector scoped under [`PREVIEW_SCOPE`] so a host page's chrome is not
//! restyled.

use once_cell::sync::Lazy;

/// Class of the container wrapping preview fragments.
pub const PREVIEW_SCOPE: &str = "md2pdf-preview";

/// Print/screen style sheet embedded in every composed document.
pub const PRINT_CSS: &str = r#"
* {
  box-sizing: border-box;
}

body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
  padding: 40px 60px;
  line-height: 1.6;
  color: #24292f;
  max-width: 1200px;
  margin: 0 auto;
}

h1, h2, h3, h4, h5, h6 {
  margin-top: 24px;
  margin-bottom: 16px;
  font-weight: 600;
  line-height: 1.25;
  page-break-after: avoid;
  break-after: avoid-page;
}

h1 {
  font-size: 2em;
  border-bottom: 2px solid #d0d7de;
  padding-bottom: 0.3em;
  margin-top: 0;
}

h2 {
  font-size: 1.5em;
  border-bottom: 1px solid #d0d7de;
  padding-bottom: 0.3em;
}

h3 { font-size: 1.25em; }
h4 { font-size: 1em; }
h5 { font-size: 0.875em; }
h6 { font-size: 0.85em; color: #57606a; }

p {
  margin-top: 0;
  margin-bottom: 16px;
}

a {
  color: #0969da;
  text-decoration: none;
}

ul, ol {
  margin-top: 0;
  margin-bottom: 16px;
  padding-left: 2em;
}

li {
  margin-bottom: 4px;
}

li > p {
  margin-bottom: 8px;
}

code {
  font-family: 'Consolas', 'Monaco', 'Courier New', monospace;
  font-size: 0.85em;
  background-color: #f6f8fa;
  padding: 0.2em 0.4em;
  border-radius: 3px;
}

pre {
  background-color: #f6f8fa;
  border-radius: 6px;
  padding: 16px;
  overflow-x: auto;
  margin-bottom: 16px;
  white-space: pre-wrap;
  page-break-inside: avoid;
  break-inside: avoid;
}

pre code {
  background-color: transparent;
  padding: 0;
  font-size: 0.9em;
  line-height: 1.45;
}

blockquote {
  margin: 0 0 16px 0;
  padding: 0 1em;
  color: #57606a;
  border-left: 4px solid #d0d7de;
  page-break-inside: avoid;
  break-inside: avoid;
}

hr {
  height: 2px;
  padding: 0;
  margin: 24px 0;
  background-color: #d0d7de;
  border: 0;
}

table {
  border-collapse: collapse;
  width: 100%;
  margin: 16px 0;
  border: 1px solid #d0d7de;
  page-break-inside: avoid;
  break-inside: avoid;
}

thead {
  background-color: #f6f8fa;
}

th, td {
  border: 1px solid #d0d7de;
  padding: 10px 13px;
  text-align: left;
  vertical-align: top;
}

th {
  font-weight: 600;
}

tr:nth-child(even) td {
  background-color: #fafbfc;
}

img {
  max-width: 100%;
  height: auto;
  display: block;
  margin: 16px 0;
  page-break-inside: avoid;
  break-inside: avoid;
}

.page-break {
  page-break-after: always;
  break-after: page;
}

@media print {
  body {
    padding: 20px;
  }

  h1, h2, h3, h4, h5, h6 {
    page-break-after: avoid;
  }

  pre, blockquote, table {
    page-break-inside: avoid;
  }

  img {
    page-break-inside: avoid;
  }
}
"#;

static PREVIEW_CSS: Lazy<String> = Lazy::new(|| scope_css(PRINT_CSS, PREVIEW_SCOPE));

/// Style sheet for print documents.
pub fn print_css() -> &'static str {
    PRINT_CSS
}

/// [`PRINT_CSS`] with every selector scoped under `.md2pdf-preview`.
pub fn preview_css() -> &'static str {
    PREVIEW_CSS.as_str()
}

/// Rewrite a flat style sheet so each rule only matches inside `.{scope}`.
///
/// `body` maps onto the container itself, `*` onto the container and its
/// descendants. At-rule blocks (`@media print`, …) are dropped: a preview is
/// always on screen. The input is trusted, well-formed CSS without nested
/// braces inside rule bodies.
pub fn scope_css(css: &str, scope: &str) -> String {
    let container = format!(".{scope}");
    let mut out = String::with_capacity(css.len() + css.len() / 2);
    let mut rest = css;

    while let Some(open) = rest.find('{') {
        let selector = rest[..open].trim();

        if selector.starts_with('@') {
            // Skip the whole at-rule block, including its nested rules.
            let mut depth = 0usize;
            let mut end = rest.len();
            for (i, c) in rest[open..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = open + i + 1;
                            break;
                        }
                    }
                    _ => {}
                }
            }
            rest = &rest[end..];
            continue;
        }

        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        let body = rest[open + 1..close].trim();

        let scoped: Vec<String> = selector
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "body" | "html" => container.clone(),
                "*" => format!("{container}, {container} *"),
                other => format!("{container} {other}"),
            })
            .collect();

        out.push_str(&scoped.join(", "));
        out.push_str(" {\n  ");
        out.push_str(&body.split('\n').map(str::trim).collect::<Vec<_>>().join("\n  "));
        out.push_str("\n}\n");

        rest = &rest[close + 1..];
    }

    out
}
