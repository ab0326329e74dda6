//! Byte-level view of a configuration file.
//!
//! Captures everything needed to rewrite a file exactly as it was read:
//! the detected encoding, whether a BOM was present, the first line
//! separator encountered, and whether the file ended with one. The
//! separator is inferred once and reused verbatim for every line on
//! save, so mixed-separator files are normalized to their first style.

use crate::encoding::TextEncoding;

/// A decoded file, split into lines, plus the formatting needed to
/// reproduce its bytes.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Encoding chosen by [`TextEncoding::detect`].
    pub encoding: TextEncoding,
    /// Whether the decoded text started with U+FEFF.
    pub has_bom: bool,
    /// The first line break found: `"\r\n"`, `"\r"`, `"\n"`, or `""` for
    /// a file with no line break.
    pub separator: String,
    /// Whether the file ended with a line break.
    pub trailing_separator: bool,
    /// The logical lines, separators stripped. Never empty; an empty
    /// file yields one empty line.
    pub lines: Vec<String>,
}

impl RawDocument {
    /// Decode raw file bytes, detecting encoding, BOM, and separator.
    pub fn from_bytes(bytes: &[u8], supplied: Option<TextEncoding>) -> Self {
        let prefix = &bytes[..bytes.len().min(8)];
        let encoding = TextEncoding::detect(prefix, supplied);
        let decoded = encoding.decode(bytes);
        let (has_bom, text) = match decoded.strip_prefix('\u{FEFF}') {
            Some(rest) => (true, rest.to_string()),
            None => (false, decoded),
        };
        let separator = detect_separator(&text);
        let (lines, trailing_separator) = split_lines(&text);
        Self {
            encoding,
            has_bom,
            separator,
            trailing_separator,
            lines,
        }
    }

    /// Re-encode the document: join lines with the detected separator,
    /// restore the trailing separator and BOM, and encode.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut text = String::new();
        if self.has_bom {
            text.push('\u{FEFF}');
        }
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                text.push_str(&self.separator);
            }
            text.push_str(line);
        }
        if self.trailing_separator {
            text.push_str(&self.separator);
        }
        self.encoding.encode(&text)
    }
}

/// The exact CR/LF sequence between the first two lines.
fn detect_separator(text: &str) -> String {
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                let separator = if chars.next() == Some('\n') { "\r\n" } else { "\r" };
                return separator.to_string();
            }
            '\n' => return "\n".to_string(),
            _ => {}
        }
    }
    String::new()
}

/// Split on any of CRLF/CR/LF, preserving blank lines. Returns the lines
/// and whether the text ended with a line break.
fn split_lines(text: &str) -> (Vec<String>, bool) {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
        (lines, false)
    } else {
        (lines, true)
    }
}
