//! Input restrictions of the constrained backend.
//!
//! [`SimpleBackend`](super::SimpleBackend) only has the standard Type 1 fonts
//! with their single-byte encoding, and cannot embed bitmaps. Before its HTML
//! parser sees a document, two deterministic passes run:
//!
//! 1. `<img>` tags are replaced by the literal marker [`IMAGE_MARKER`].
//! 2. Typographic and box-drawing characters are transliterated to ASCII,
//!    and every remaining non-ASCII character is dropped.
//!
//! The degradation is lossy and silent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Text left where an image was.
pub const IMAGE_MARKER: &str = "[Image removed]";

/// Apply both passes to a composed HTML document.
pub fn sanitize_html(html: &str) -> String {
    let s = strip_images(html);
    to_ascii(&s)
}

// ── Pass 1: images ───────────────────────────────────────────────────────────

static RE_IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());

pub fn strip_images(html: &str) -> String {
    RE_IMG.replace_all(html, IMAGE_MARKER).into_owned()
}

// ── Pass 2: ASCII ────────────────────────────────────────────────────────────

/// ASCII stand-in for one character, or `None` to drop it.
pub fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        // Box drawing: corners and joints become '+'.
        '┌' | '┐' | '└' | '┘' | '├' | '┤' | '┬' | '┴' | '┼' | '╭' | '╮' | '╯' | '╰' => "+",
        '╔' | '╗' | '╚' | '╝' | '╠' | '╣' | '╦' | '╩' | '╬' => "+",
        '─' | '━' | '┄' | '┈' => "-",
        '│' | '┃' | '┆' | '┊' | '║' => "|",
        '═' => "=",

        // Quotes
        '‘' | '’' | '‚' | '′' => "'",
        '“' | '”' | '„' | '″' | '«' | '»' => "\"",

        // Dashes, ellipsis
        '–' | '—' | '‒' | '―' | '−' => "-",
        '…' => "...",

        // Arrows
        '→' | '⟶' => "->",
        '←' | '⟵' => "<-",
        '↔' => "<->",
        '⇒' => "=>",
        '⇐' => "<=",
        '↑' => "^",
        '↓' => "v",

        // Marks
        '✓' | '✔' | '☑' => "v",
        '✗' | '✘' | '✕' | '☒' => "x",
        '•' | '◦' | '▪' | '‣' | '●' => "*",

        // Spaces
        '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2009}' | '\u{202F}' => " ",

        // Symbols
        '©' => "(c)",
        '®' => "(R)",
        '™' => "(TM)",
        '×' => "x",
        '°' => " deg",

        _ => return None,
    };
    Some(s)
}

/// Transliterate known characters, drop every other non-ASCII one.
pub fn to_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii() {
            out.push(c);
        } else if let Some(s) = transliterate(c) {
            out.push_str(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_images() {
        let html = r#"<p>Before <img src="a.png" alt="A"> after <IMG
            SRC='b.png'/></p>"#;
        let out = strip_images(html);
        assert!(!out.to_lowercase().contains("<img"));
        assert_eq!(out.matches(IMAGE_MARKER).count(), 2);
    }

    #[test]
    fn test_box_drawing() {
        assert_eq!(to_ascii("┌──┐\n│ab│\n└──┘"), "+--+\n|ab|\n+--+");
        assert_eq!(to_ascii("╔═╗"), "+=+");
    }

    #[test]
    fn test_typography() {
        assert_eq!(to_ascii("“Hi” — it’s 1–2…"), "\"Hi\" - it's 1-2...");
    }

    #[test]
    fn test_arrows_and_marks() {
        assert_eq!(to_ascii("a → b ← c ↔ d ⇒ e"), "a -> b <- c <-> d => e");
        assert_eq!(to_ascii("✓ done ✗ failed • item"), "v done x failed * item");
    }

    #[test]
    fn test_unknown_non_ascii_is_dropped() {
        assert_eq!(to_ascii("naïve 日本 ok"), "nave  ok");
        assert!(to_ascii("😀 emoji").is_ascii());
    }

    #[test]
    fn test_sanitize_html_full() {
        let html = "<p>“Q” ─ <img src=\"x.png\"> ✓</p>";
        let out = sanitize_html(html);
        assert!(out.is_ascii());
        assert_eq!(out, "<p>\"Q\" - [Image removed] v</p>");
    }
}
