//! Parse the HTML subset the constrained backend understands into blocks.
//!
//! Recognised: `h1`–`h6`, `p`, `br`, `pre`, `blockquote`, nested `ul`/`ol`
//! with `li`, `table`/`tr`/`th`/`td`, `hr`, and the `page-break` class on any
//! block element. `head`, `style`, `script` and comments are skipped; every
//! other tag is ignored and its text flows into the surrounding block.
//!
//! Input is expected to be ASCII already (see [`super::sanitize`]); entity
//! decoding can reintroduce non-ASCII characters, so decoded text goes
//! through the transliteration pass again.

use super::sanitize::to_ascii;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading { level: u8, text: String },
    /// Lines are separated by `'\n'` (from `<br>`).
    Paragraph { text: String },
    /// `marker` is empty for continuation paragraphs of an item.
    ListItem { marker: String, text: String },
    Code { lines: Vec<String> },
    TableRow { cells: Vec<String>, header: bool },
    Rule,
    PageBreak,
}

/// One block plus its nesting depth (block quotes and lists).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub indent: usize,
}

struct ListContext {
    ordered: bool,
    next: u64,
}

#[derive(Default)]
struct Parser {
    blocks: Vec<Block>,
    text: String,
    lists: Vec<ListContext>,
    quote_depth: usize,
    heading: Option<u8>,
    in_pre: bool,
    pending_marker: Option<String>,
    row: Option<(Vec<String>, bool)>,
    in_cell: bool,
    /// Open block elements and whether each carries `page-break`.
    open: Vec<(String, bool)>,
}

const SKIPPED: &[&str] = &["head", "style", "script", "title"];
const BLOCKS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "table",
];

pub fn parse_blocks(html: &str) -> Vec<Block> {
    let mut parser = Parser::default();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            parser.push_text(rest);
            break;
        };
        if lt > 0 {
            parser.push_text(&rest[..lt]);
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        let Some(gt) = rest.find('>') else {
            // A lone '<' is text.
            parser.push_text(rest);
            break;
        };
        let tag = &rest[1..gt];
        rest = &rest[gt + 1..];

        if tag.starts_with('!') || tag.starts_with('?') {
            continue;
        }

        let (closing, tag) = match tag.strip_prefix('/') {
            Some(t) => (true, t),
            None => (false, tag),
        };
        let name_end = tag
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(tag.len());
        let name = tag[..name_end].to_ascii_lowercase();
        let attrs = &tag[name_end..];

        if !closing && SKIPPED.contains(&name.as_str()) {
            rest = skip_element(rest, &name);
            continue;
        }

        if closing {
            parser.end_tag(&name);
        } else {
            parser.start_tag(&name, attrs);
        }
    }

    parser.flush_text();
    parser.blocks
}

/// Position just past `</name>`, or the end of input.
fn skip_element<'a>(rest: &'a str, name: &str) -> &'a str {
    let needle = format!("</{name}");
    let lower = rest.to_ascii_lowercase();
    match lower.find(&needle) {
        Some(pos) => match rest[pos..].find('>') {
            Some(gt) => &rest[pos + gt + 1..],
            None => "",
        },
        None => "",
    }
}

impl Parser {
    fn indent(&self) -> usize {
        self.quote_depth + self.lists.len()
    }

    fn push_block(&mut self, kind: BlockKind) {
        let indent = self.indent();
        self.blocks.push(Block { kind, indent });
    }

    fn push_text(&mut self, raw: &str) {
        let decoded = to_ascii(&decode_entities(raw));
        if self.in_pre {
            self.text.push_str(&decoded);
            return;
        }
        if self.row.is_some() && !self.in_cell {
            return;
        }
        for c in decoded.chars() {
            if c.is_whitespace() {
                if !self.text.ends_with(' ') && !self.text.ends_with('\n') && !self.text.is_empty() {
                    self.text.push(' ');
                }
            } else {
                self.text.push(c);
            }
        }
    }

    /// Emit buffered inline text as the block the context calls for.
    fn flush_text(&mut self) {
        let text = std::mem::take(&mut self.text);
        let text = text
            .split('\n')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim_matches('\n')
            .to_string();

        if text.is_empty() {
            return;
        }

        if let Some(level) = self.heading {
            self.push_block(BlockKind::Heading { level, text });
        } else if let Some(marker) = self.pending_marker.take() {
            self.push_block(BlockKind::ListItem { marker, text });
        } else if !self.lists.is_empty() {
            self.push_block(BlockKind::ListItem {
                marker: String::new(),
                text,
            });
        } else {
            self.push_block(BlockKind::Paragraph { text });
        }
    }

    fn start_tag(&mut self, name: &str, attrs: &str) {
        if self.in_pre {
            // Markup inside <pre> (e.g. <code>) is transparent.
            return;
        }

        let page_break = has_class(attrs, "page-break");
        if BLOCKS.contains(&name) {
            self.open.push((name.to_string(), page_break));
        }

        match name {
            "br" => self.text.push('\n'),
            "p" | "div" => self.flush_text(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_text();
                self.heading = name[1..].parse().ok();
            }
            "ul" | "ol" => {
                self.flush_text();
                let start = attr_value(attrs, "start")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                self.lists.push(ListContext {
                    ordered: name == "ol",
                    next: start,
                });
            }
            "li" => {
                self.flush_text();
                let marker = match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let m = format!("{}.", list.next);
                        list.next += 1;
                        m
                    }
                    _ => "*".to_string(),
                };
                self.pending_marker = Some(marker);
            }
            "blockquote" => {
                self.flush_text();
                self.quote_depth += 1;
            }
            "pre" => {
                self.flush_text();
                self.in_pre = true;
            }
            "table" => self.flush_text(),
            "tr" => self.row = Some((Vec::new(), false)),
            "th" | "td" => {
                self.text.clear();
                self.in_cell = true;
                if name == "th" {
                    if let Some((_, header)) = self.row.as_mut() {
                        *header = true;
                    }
                }
            }
            "hr" => {
                self.flush_text();
                self.push_block(BlockKind::Rule);
                if page_break {
                    self.push_block(BlockKind::PageBreak);
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        if self.in_pre && name != "pre" {
            return;
        }

        match name {
            "p" | "div" => self.flush_text(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_text();
                self.heading = None;
            }
            "li" => {
                self.flush_text();
                self.pending_marker = None;
            }
            "ul" | "ol" => {
                self.flush_text();
                self.lists.pop();
            }
            "blockquote" => {
                self.flush_text();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            "pre" => {
                let raw = std::mem::take(&mut self.text);
                let raw = raw.strip_suffix('\n').unwrap_or(&raw);
                let lines = raw.split('\n').map(|l| l.replace('\t', "    ")).collect();
                self.in_pre = false;
                self.push_block(BlockKind::Code { lines });
            }
            "th" | "td" => {
                let cell = std::mem::take(&mut self.text).trim().replace('\n', " ");
                if let Some((cells, _)) = self.row.as_mut() {
                    cells.push(cell);
                }
                self.in_cell = false;
            }
            "tr" => {
                if let Some((cells, header)) = self.row.take() {
                    if !cells.is_empty() {
                        self.push_block(BlockKind::TableRow { cells, header });
                    }
                }
            }
            _ => {}
        }

        if BLOCKS.contains(&name) {
            if let Some(pos) = self.open.iter().rposition(|(n, _)| n == name) {
                let (_, page_break) = self.open.remove(pos);
                self.open.truncate(pos);
                if page_break {
                    self.push_block(BlockKind::PageBreak);
                }
            }
        }
    }
}

// ── Attributes & entities ────────────────────────────────────────────────────

static RE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-\w:.]*)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+)))?"#).unwrap()
});

fn attr_value(attrs: &str, key: &str) -> Option<String> {
    RE_ATTR.captures_iter(attrs).find_map(|caps| {
        if caps[1].eq_ignore_ascii_case(key) {
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4));
            Some(value.map_or(String::new(), |m| m.as_str().to_string()))
        } else {
            None
        }
    })
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr_value(attrs, "class").is_some_and(|v| v.split_whitespace().any(|c| c == class))
}

/// Decode named and numeric character references.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}
