//! Minimal s-expression reader for KiCad files.
//!
//! Every node keeps the byte range it came from so callers can patch the
//! original text in place instead of re-serializing the whole file.

use std::ops::Range;

use anyhow::{bail, Result};

/// A parsed s-expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    /// A parenthesized list and its span, parentheses included.
    List(Vec<Sexp>, Range<usize>),
    /// An atom with quotes and escapes removed, and its span in the source.
    Atom(String, Range<usize>),
}

impl Sexp {
    pub fn span(&self) -> Range<usize> {
        match self {
            Sexp::List(_, span) | Sexp::Atom(_, span) => span.clone(),
        }
    }

    pub fn items(&self) -> &[Sexp] {
        match self {
            Sexp::List(items, _) => items,
            Sexp::Atom(..) => &[],
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(text, _) => Some(text),
            Sexp::List(..) => None,
        }
    }

    /// The leading atom of a list, e.g. `footprint` for `(footprint ...)`.
    pub fn head(&self) -> Option<&str> {
        self.items().first().and_then(Sexp::as_atom)
    }

    /// Atom at position `index` of a list.
    pub fn atom(&self, index: usize) -> Option<&str> {
        self.items().get(index).and_then(Sexp::as_atom)
    }

    /// Atom at position `index`, parsed as a number.
    pub fn number(&self, index: usize) -> Option<f64> {
        self.atom(index)?.parse().ok()
    }

    /// Direct child lists whose head is `head`.
    pub fn children<'a>(&'a self, head: &'a str) -> impl Iterator<Item = &'a Sexp> + 'a {
        self.items()
            .iter()
            .filter(move |item| item.head() == Some(head))
    }

    /// First direct child list whose head is `head`.
    pub fn child(&self, head: &str) -> Option<&Sexp> {
        self.items().iter().find(|item| item.head() == Some(head))
    }

    /// True if a bare atom `text` appears directly in this list.
    pub fn has_atom(&self, text: &str) -> bool {
        self.items().iter().skip(1).any(|item| item.as_atom() == Some(text))
    }
}

/// Parse a document holding a single top-level list.
pub fn parse(src: &str) -> Result<Sexp> {
    let bytes = src.as_bytes();
    let mut stack: Vec<(usize, Vec<Sexp>)> = Vec::new();
    let mut top: Option<Sexp> = None;
    let mut i = 0;

    while i < bytes.len() {
        let node = match bytes[i] {
            b'(' => {
                stack.push((i, Vec::new()));
                i += 1;
                continue;
            }
            b')' => {
                let Some((start, items)) = stack.pop() else {
                    bail!("Unbalanced ')' at byte {}", i);
                };
                i += 1;
                Sexp::List(items, start..i)
            }
            b'"' => {
                let start = i;
                let end = string_end(bytes, i)?;
                i = end + 1;
                Sexp::Atom(unescape(&src[start + 1..end]), start..i)
            }
            b if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                Sexp::Atom(src[start..i].to_string(), start..i)
            }
        };

        match stack.last_mut() {
            Some((_, parent)) => parent.push(node),
            None if top.is_none() && matches!(node, Sexp::List(..)) => top = Some(node),
            None => bail!("Unexpected content outside the top-level expression at byte {}", node.span().start),
        }
    }

    if let Some((start, _)) = stack.last() {
        bail!("Unbalanced '(' at byte {}", start);
    }

    match top {
        Some(node) => Ok(node),
        None => bail!("Empty document"),
    }
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'(' || b == b')' || b == b'"'
}

/// Index of the closing quote of the string opening at `start`.
fn string_end(bytes: &[u8], start: usize) -> Result<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i),
            _ => i += 1,
        }
    }
    bail!("Unterminated string starting at byte {}", start)
}

fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Format a coordinate the way KiCad writes them: no trailing zeros.
pub fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let src = r#"(kicad_pcb (version 20240108) (footprint "R_0402" (at 10 20.5 90)))"#;
        let root = parse(src).unwrap();

        assert_eq!(root.head(), Some("kicad_pcb"));
        assert_eq!(root.child("version").and_then(|v| v.number(1)), Some(20240108.0));

        let fp = root.child("footprint").unwrap();
        assert_eq!(fp.atom(1), Some("R_0402"));
        let at = fp.child("at").unwrap();
        assert_eq!(at.number(3), Some(90.0));
        assert_eq!(&src[at.items()[2].span()], "20.5");
    }

    #[test]
    fn test_strings_may_hold_parens_and_quotes() {
        let src = r#"(a (property "Value" "10k (1%) \"x\"") b)"#;
        let root = parse(src).unwrap();
        let prop = root.child("property").unwrap();
        assert_eq!(prop.atom(2), Some("10k (1%) \"x\""));
        assert!(root.has_atom("b"));
    }

    #[test]
    fn test_unbalanced_input() {
        assert!(parse("(a (b)").is_err());
        assert!(parse("(a))").is_err());
        assert!(parse("(a \"open)").is_err());
        assert!(parse("").is_err());
        assert!(parse("(a) (b)").is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(-4.25), "-4.25");
        assert_eq!(format_number(100.123456789), "100.123457");
    }
}
