//! A4 page layout for the constrained backend.
//!
//! Turns parsed [`Block`]s into positioned text runs and rules, page by page.
//! Widths come from the standard Type 1 font metrics (Helvetica, Courier);
//! bold text uses a scaled Helvetica width, close enough for line breaking.
//!
//! Page-break policy:
//!
//! * a heading is never the last line on a page
//! * a code block or table row that would split moves to a fresh page when
//!   it fits on one page; taller code blocks split line by line
//! * [`BlockKind::PageBreak`] starts a new page unless the current one is
//!   still empty

use super::html::{Block, BlockKind};
use crate::config::{mm_to_points, MarginConfig, A4_MM};

/// A4 `(width, height)` in PDF points.
pub fn page_size() -> (f32, f32) {
    (mm_to_points(A4_MM.0), mm_to_points(A4_MM.1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Mono,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Text with its baseline starting at `(x, y)`.
    Text {
        font: Font,
        size: f32,
        x: f32,
        y: f32,
        text: String,
    },
    /// Horizontal rule from `x1` to `x2` at height `y`.
    Rule { x1: f32, x2: f32, y: f32, width: f32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<Op>,
}

// ── Metrics ──────────────────────────────────────────────────────────────────

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.5;
const TABLE_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 1.45;
const BLOCK_GAP: f32 = 8.0;
const INDENT: f32 = 18.0;
const CELL_PAD: f32 = 4.0;

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [\]^_`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {|}~
];

const BOLD_SCALE: f32 = 1.07;
const COURIER: f32 = 600.0;

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: f32 = text
        .bytes()
        .map(|b| match font {
            Font::Mono => COURIER,
            Font::Regular | Font::Bold => {
                let w = (b as usize)
                    .checked_sub(32)
                    .and_then(|i| HELVETICA.get(i))
                    .copied()
                    .unwrap_or(556);
                f32::from(w)
            }
        })
        .sum();
    let scale = if font == Font::Bold { BOLD_SCALE } else { 1.0 };
    units * size / 1000.0 * scale
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 22.0,
        2 => 18.0,
        3 => 15.0,
        4 => 13.0,
        5 => 11.5,
        _ => 11.0,
    }
}

/// Greedy word wrap. Explicit `'\n'` always breaks; a word wider than the
/// line is split by characters.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.split('\n') {
        let mut current = String::new();
        for word in source_line.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, font, size) <= max_width {
                current = word.to_string();
            } else {
                for piece in split_long(word, font, size, max_width) {
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                    }
                    current = piece;
                }
            }
        }
        lines.push(current);
    }
    lines
}

fn split_long(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        current.push(c);
        if text_width(&current, font, size) > max_width && current.len() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

// ── Layout ───────────────────────────────────────────────────────────────────

pub struct Layout {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    pages: Vec<Page>,
    /// Top of the free area on the current page, in PDF user space.
    cursor: f32,
}

impl Layout {
    pub fn new(margin: MarginConfig) -> Self {
        let [top, right, bottom, left] = margin.to_points();
        let (page_width, page_height) = page_size();
        Self {
            left,
            right: page_width - right,
            top: page_height - top,
            bottom,
            pages: vec![Page::default()],
            cursor: page_height - top,
        }
    }

    fn content_height(&self) -> f32 {
        self.top - self.bottom
    }

    fn content_width(&self, indent: f32) -> f32 {
        (self.right - self.left - indent).max(1.0)
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().is_none_or(|p| p.ops.is_empty())
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = self.top;
    }

    /// Start a new page unless `height` fits below the cursor.
    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < self.bottom && !self.page_is_empty() {
            self.new_page();
        }
    }

    /// Like [`ensure_space`](Self::ensure_space), but only moves when the
    /// whole unit fits on a fresh page.
    fn keep_together(&mut self, height: f32) {
        if height <= self.content_height() {
            self.ensure_space(height);
        }
    }

    fn push(&mut self, op: Op) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn line(&mut self, font: Font, size: f32, x: f32, text: String) {
        let height = size * LINE_HEIGHT;
        self.ensure_space(height);
        let baseline = self.cursor - size;
        if !text.is_empty() {
            self.push(Op::Text {
                font,
                size,
                x,
                y: baseline,
                text,
            });
        }
        self.cursor -= height;
    }

    fn gap(&mut self, height: f32) {
        if !self.page_is_empty() {
            self.cursor -= height;
        }
    }

    pub fn place(&mut self, block: &Block) {
        let indent = block.indent as f32 * INDENT;
        let x = self.left + indent;

        match &block.kind {
            BlockKind::Heading { level, text } => {
                let size = heading_size(*level);
                let lines = wrap(text, Font::Bold, size, self.content_width(indent));
                self.gap(size * 0.6);
                let height = lines.len() as f32 * size * LINE_HEIGHT + BODY_SIZE * LINE_HEIGHT;
                self.keep_together(height);
                for line in lines {
                    self.line(Font::Bold, size, x, line);
                }
                if *level <= 2 {
                    let y = self.cursor + size * 0.3;
                    self.push(Op::Rule {
                        x1: self.left,
                        x2: self.right,
                        y,
                        width: if *level == 1 { 1.5 } else { 0.75 },
                    });
                }
                self.cursor -= BLOCK_GAP / 2.0;
            }
            BlockKind::Paragraph { text } => {
                for line in wrap(text, Font::Regular, BODY_SIZE, self.content_width(indent)) {
                    self.line(Font::Regular, BODY_SIZE, x, line);
                }
                self.cursor -= BLOCK_GAP;
            }
            BlockKind::ListItem { marker, text } => {
                let lines = wrap(text, Font::Regular, BODY_SIZE, self.content_width(indent));
                let mut first = true;
                for line in lines {
                    self.ensure_space(BODY_SIZE * LINE_HEIGHT);
                    if first && !marker.is_empty() {
                        let mx = x - text_width(marker, Font::Regular, BODY_SIZE) - 4.0;
                        self.push(Op::Text {
                            font: Font::Regular,
                            size: BODY_SIZE,
                            x: mx.max(self.left),
                            y: self.cursor - BODY_SIZE,
                            text: marker.clone(),
                        });
                    }
                    first = false;
                    self.line(Font::Regular, BODY_SIZE, x, line);
                }
                self.cursor -= BLOCK_GAP / 3.0;
            }
            BlockKind::Code { lines } => {
                let width = self.content_width(indent + CELL_PAD * 2.0);
                let wrapped: Vec<String> = lines
                    .iter()
                    .flat_map(|l| {
                        if l.is_empty() {
                            vec![String::new()]
                        } else {
                            split_long(l, Font::Mono, CODE_SIZE, width)
                        }
                    })
                    .collect();
                let height = wrapped.len() as f32 * CODE_SIZE * LINE_HEIGHT;
                self.keep_together(height);
                for line in wrapped {
                    self.line(Font::Mono, CODE_SIZE, x + CELL_PAD, line);
                }
                self.cursor -= BLOCK_GAP;
            }
            BlockKind::TableRow { cells, header } => {
                let columns = cells.len().max(1);
                let col_width = self.content_width(indent) / columns as f32;
                let font = if *header { Font::Bold } else { Font::Regular };
                let wrapped: Vec<Vec<String>> = cells
                    .iter()
                    .map(|c| wrap(c, font, TABLE_SIZE, (col_width - CELL_PAD * 2.0).max(1.0)))
                    .collect();
                let rows = wrapped.iter().map(Vec::len).max().unwrap_or(1);
                let line_height = TABLE_SIZE * LINE_HEIGHT;
                let height = rows as f32 * line_height + CELL_PAD;
                self.keep_together(height);
                self.ensure_space(height);

                let top = self.cursor;
                for (col, lines) in wrapped.into_iter().enumerate() {
                    let cx = x + col as f32 * col_width + CELL_PAD;
                    for (i, text) in lines.into_iter().enumerate() {
                        if text.is_empty() {
                            continue;
                        }
                        self.push(Op::Text {
                            font,
                            size: TABLE_SIZE,
                            x: cx,
                            y: top - TABLE_SIZE - i as f32 * line_height,
                            text,
                        });
                    }
                }
                self.cursor = top - height;
                self.push(Op::Rule {
                    x1: x,
                    x2: self.right,
                    y: self.cursor + CELL_PAD / 2.0,
                    width: if *header { 0.75 } else { 0.25 },
                });
            }
            BlockKind::Rule => {
                self.gap(BLOCK_GAP);
                self.ensure_space(BLOCK_GAP);
                self.push(Op::Rule {
                    x1: self.left,
                    x2: self.right,
                    y: self.cursor,
                    width: 1.0,
                });
                self.cursor -= BLOCK_GAP;
            }
            BlockKind::PageBreak => {
                if !self.page_is_empty() {
                    self.new_page();
                }
            }
        }
    }

    /// Finish layout. Always returns at least one page.
    pub fn finish(mut self) -> Vec<Page> {
        if self.pages.len() > 1 && self.page_is_empty() {
            self.pages.pop();
        }
        self.pages
    }
}

pub fn layout_blocks(blocks: &[Block], margin: MarginConfig) -> Vec<Page> {
    let mut layout = Layout::new(margin);
    for block in blocks {
        layout.place(block);
    }
    layout.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> Block {
        Block {
            kind: BlockKind::Paragraph { text: text.into() },
            indent: 0,
        }
    }

    fn texts(page: &Page) -> Vec<&str> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text { text, .. } => Some(text.as_str()),
                Op::Rule { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_text_width() {
        assert!((text_width("i", Font::Regular, 10.0) - 2.22).abs() < 1e-3);
        assert!((text_width("ii", Font::Mono, 10.0) - 12.0).abs() < 1e-3);
        assert!(text_width("Word", Font::Bold, 10.0) > text_width("Word", Font::Regular, 10.0));
    }

    #[test]
    fn test_wrap_respects_width_and_breaks() {
        let lines = wrap("alpha beta gamma delta", Font::Regular, 10.0, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 10.0) <= 60.0);
        }
        assert_eq!(wrap("a\nb", Font::Regular, 10.0, 500.0), vec!["a", "b"]);
    }

    #[test]
    fn test_wrap_splits_overlong_words() {
        let word = "x".repeat(200);
        let lines = wrap(&word, Font::Mono, 10.0, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_empty_document_has_one_page() {
        assert_eq!(layout_blocks(&[], MarginConfig::default()).len(), 1);
        let only_break = [Block {
            kind: BlockKind::PageBreak,
            indent: 0,
        }];
        assert_eq!(layout_blocks(&only_break, MarginConfig::default()).len(), 1);
    }

    #[test]
    fn test_page_size_is_a4_in_points() {
        let (w, h) = page_size();
        assert!((w - 595.28).abs() < 0.05, "width {w}");
        assert!((h - 841.89).abs() < 0.05, "height {h}");
    }

    #[test]
    fn test_text_stays_inside_margins() {
        let margin = MarginConfig::new(30, 25, 30, 40);
        let long = "lorem ipsum dolor sit amet ".repeat(400);
        let pages = layout_blocks(&[para(&long)], margin);
        let [top, right, bottom, left] = margin.to_points();
        let (w, h) = page_size();
        assert!(pages.len() > 1);
        for page in &pages {
            for op in &page.ops {
                if let Op::Text { x, y, text, size, font } = op {
                    assert!(*x >= left - 0.01);
                    assert!(x + text_width(text, *font, *size) <= w - right + 0.01);
                    assert!(*y >= bottom - 0.01);
                    assert!(*y <= h - top);
                }
            }
        }
    }

    #[test]
    fn test_larger_top_margin_adds_pages() {
        // Find the largest paragraph count that still fits one page at 20mm.
        let base = MarginConfig::uniform(20);
        let mut blocks = Vec::new();
        loop {
            blocks.push(para("A line of body text."));
            if layout_blocks(&blocks, base).len() > 1 {
                blocks.pop();
                break;
            }
        }
        assert_eq!(layout_blocks(&blocks, base).len(), 1);

        let taller = MarginConfig { top_mm: 40, ..base };
        assert!(layout_blocks(&blocks, taller).len() > 1);
    }

    #[test]
    fn test_heading_keeps_with_next() {
        let mut blocks = Vec::new();
        loop {
            blocks.push(para("filler"));
            if layout_blocks(&blocks, MarginConfig::default()).len() > 1 {
                blocks.pop();
                break;
            }
        }
        blocks.push(Block {
            kind: BlockKind::Heading {
                level: 2,
                text: "Next Section".into(),
            },
            indent: 0,
        });
        blocks.push(para("section body"));
        let pages = layout_blocks(&blocks, MarginConfig::default());
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[1]), vec!["Next Section", "section body"]);
    }

    #[test]
    fn test_code_block_moves_to_fresh_page() {
        let mut blocks: Vec<Block> = (0..25).map(|_| para("filler")).collect();
        blocks.push(Block {
            kind: BlockKind::Code {
                lines: (0..20).map(|i| format!("line {i}")).collect(),
            },
            indent: 0,
        });
        let pages = layout_blocks(&blocks, MarginConfig::default());
        let holder: Vec<usize> = pages
            .iter()
            .enumerate()
            .filter(|(_, p)| texts(p).iter().any(|t| t.starts_with("line ")))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(holder.len(), 1, "code block was split across pages");
    }

    #[test]
    fn test_page_break_forces_new_page() {
        let blocks = [
            para("one"),
            Block {
                kind: BlockKind::PageBreak,
                indent: 0,
            },
            para("two"),
        ];
        let pages = layout_blocks(&blocks, MarginConfig::default());
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[0]), vec!["one"]);
        assert_eq!(texts(&pages[1]), vec!["two"]);
    }
}
