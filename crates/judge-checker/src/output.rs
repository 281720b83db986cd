//! Expected and captured output values

use std::borrow::Cow;

use crate::tokenize::{self, Tokens};

/// Reference answer supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedOutput {
    text: String,
}

impl ExpectedOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Build from an explicit token sequence, one line, single spaces
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens<'a>(&'a self, debug_marker: &'a str) -> Tokens<'a> {
        tokenize::tokens(&self.text, debug_marker)
    }
}

impl From<&str> for ExpectedOutput {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ExpectedOutput {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Standard output collected from a run, possibly cut short by a kill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CapturedOutput {
    pub fn new(bytes: Vec<u8>, truncated: bool) -> Self {
        Self { bytes, truncated }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Output decoded as UTF-8; invalid sequences become U+FFFD
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Set when bytes were discarded because the capture cap was reached
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for CapturedOutput {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes().to_vec(), false)
    }
}

impl From<Vec<u8>> for CapturedOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_from_tokens() {
        let expected = ExpectedOutput::from_tokens(["5", "4"]);
        assert_eq!(expected.text(), "5 4");
        assert_eq!(expected.tokens("#").collect::<Vec<_>>(), vec!["5", "4"]);
    }

    #[test]
    fn test_captured_lossy_text() {
        let captured = CapturedOutput::from(vec![b'o', b'k', 0xff]);
        assert_eq!(captured.text(), "ok\u{fffd}");
        assert_eq!(captured.len(), 3);
        assert!(!captured.is_truncated());
    }

    #[test]
    fn test_captured_empty() {
        assert!(CapturedOutput::default().is_empty());
    }
}
