//! Debug-line filtering and tokenization
//!
//! Submissions may interleave debug lines with their answer. A line whose
//! first non-whitespace text starts with the debug marker is dropped before
//! tokenization, so it never shifts token positions.

use std::str::{Lines, SplitWhitespace};

/// Marker used when none is configured
pub const DEFAULT_DEBUG_MARKER: &str = "#";

/// Whether `line` is debug noise. An empty marker disables filtering.
pub fn is_debug_line(line: &str, marker: &str) -> bool {
    !marker.is_empty() && line.trim_start().starts_with(marker)
}

/// Iterator over the lines of a text that are not debug lines
#[derive(Debug, Clone)]
pub struct SignificantLines<'a> {
    lines: Lines<'a>,
    marker: &'a str,
}

impl<'a> Iterator for SignificantLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            if !is_debug_line(line, self.marker) {
                return Some(line);
            }
        }
    }
}

pub fn significant_lines<'a>(text: &'a str, marker: &'a str) -> SignificantLines<'a> {
    SignificantLines {
        lines: text.lines(),
        marker,
    }
}

/// Whitespace-delimited tokens of the significant lines, produced lazily
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    lines: SignificantLines<'a>,
    current: Option<SplitWhitespace<'a>>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.current.as_mut().and_then(|words| words.next()) {
                return Some(token);
            }
            self.current = Some(self.lines.next()?.split_whitespace());
        }
    }
}

pub fn tokens<'a>(text: &'a str, marker: &'a str) -> Tokens<'a> {
    Tokens {
        lines: significant_lines(text, marker),
        current: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_line_detection() {
        assert!(is_debug_line("# note", "#"));
        assert!(is_debug_line("   #indented", "#"));
        assert!(!is_debug_line("5 # trailing", "#"));
        assert!(!is_debug_line("", "#"));
        assert!(!is_debug_line("# note", ""));
    }

    #[test]
    fn test_significant_lines_skip_debug() {
        let text = "# This should still work\n5\n";
        let lines: Vec<_> = significant_lines(text, "#").collect();
        assert_eq!(lines, vec!["5"]);
    }

    #[test]
    fn test_tokens_span_lines() {
        let text = "1 2\n\n  3\t4\r\n# 9 9 9\n5";
        let toks: Vec<_> = tokens(text, "#").collect();
        assert_eq!(toks, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_tokens_custom_marker() {
        let toks: Vec<_> = tokens("// trace\n7\n# kept\n", "//").collect();
        assert_eq!(toks, vec!["7", "#", "kept"]);
    }

    #[test]
    fn test_tokens_empty_input() {
        assert_eq!(tokens("", "#").count(), 0);
        assert_eq!(tokens("\n\n# only debug\n", "#").count(), 0);
    }

    #[test]
    fn test_tokens_is_lazy() {
        let mut toks = tokens("a b\nc", "#");
        assert_eq!(toks.next(), Some("a"));
        assert_eq!(toks.next(), Some("b"));
        assert_eq!(toks.next(), Some("c"));
        assert_eq!(toks.next(), None);
    }
}
