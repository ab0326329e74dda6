//! Character-encoding detection and text codec.
//!
//! Responsibilities:
//! - Choose an encoding from the first bytes of a file (BOM, caller
//!   override, byte-pattern heuristic, UTF-8 fallback — in that order).
//! - Decode raw bytes to text and encode text back to the same bytes.
//!
//! Does NOT handle:
//! - BOM presence (observed during decode as a leading U+FEFF, see `raw.rs`).
//! - Line separators or any INI structure.
//!
//! Invariants / Assumptions:
//! - A detected BOM overrides a caller-supplied encoding; the byte-pattern
//!   heuristic does not.
//! - `encode(decode(bytes)) == bytes` for well-formed input in every
//!   supported encoding.

use encoding_rs::{UTF_8, UTF_16BE, UTF_16LE};

/// The character encodings the detector can produce.
///
/// `encoding_rs` covers the UTF-8/UTF-16 decode paths; UTF-32 and the
/// non-UTF-8 encode paths are implemented here because the Encoding
/// Standard deliberately omits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
}

/// Known byte-order marks, longest prefix first so that the four-byte
/// UTF-32 LE mark is never misread as the two-byte UTF-16 LE mark.
const KNOWN_BOMS: [(TextEncoding, &[u8]); 5] = [
    (TextEncoding::Utf32Be, &[0x00, 0x00, 0xFE, 0xFF]),
    (TextEncoding::Utf32Le, &[0xFF, 0xFE, 0x00, 0x00]),
    (TextEncoding::Utf8, &[0xEF, 0xBB, 0xBF]),
    (TextEncoding::Utf16Be, &[0xFE, 0xFF]),
    (TextEncoding::Utf16Le, &[0xFF, 0xFE]),
];

impl TextEncoding {
    /// Detect the encoding from the first up-to-8 raw bytes of a file.
    ///
    /// Priority: BOM match, then the caller-supplied encoding, then a
    /// zero-byte heuristic over the first 4 bytes, then UTF-8. Files
    /// shorter than 2 bytes always fall through to UTF-8.
    pub fn detect(prefix: &[u8], supplied: Option<TextEncoding>) -> TextEncoding {
        for (encoding, bom) in KNOWN_BOMS {
            if prefix.starts_with(bom) {
                return encoding;
            }
        }

        if let Some(encoding) = supplied {
            return encoding;
        }

        if prefix.len() >= 4 {
            if prefix[0] == 0 && prefix[1] == 0 && prefix[2] == 0 && prefix[3] != 0 {
                return TextEncoding::Utf32Be;
            }
            if prefix[0] != 0 && prefix[1] == 0 && prefix[2] == 0 && prefix[3] == 0 {
                return TextEncoding::Utf32Le;
            }
        }

        if prefix.len() >= 2 {
            if prefix[0] == 0 && prefix[1] != 0 {
                return TextEncoding::Utf16Be;
            }
            if prefix[0] != 0 && prefix[1] == 0 {
                return TextEncoding::Utf16Le;
            }
        }

        TextEncoding::Utf8
    }

    /// Canonical name, for logs.
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf32Be => "UTF-32BE",
            TextEncoding::Utf32Le => "UTF-32LE",
        }
    }

    /// Decode raw bytes to text, lossily.
    ///
    /// Malformed sequences become U+FFFD; a leading BOM character is kept
    /// so the caller can observe it.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => decode_with(UTF_8, bytes),
            TextEncoding::Utf16Be => decode_with(UTF_16BE, bytes),
            TextEncoding::Utf16Le => decode_with(UTF_16LE, bytes),
            TextEncoding::Utf32Be => decode_utf32(bytes, u32::from_be_bytes),
            TextEncoding::Utf32Le => decode_utf32(bytes, u32::from_le_bytes),
        }
    }

    /// Encode text back to raw bytes in this encoding.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Be => encode_utf16(text, u16::to_be_bytes),
            TextEncoding::Utf16Le => encode_utf16(text, u16::to_le_bytes),
            TextEncoding::Utf32Be => encode_utf32(text, u32::to_be_bytes),
            TextEncoding::Utf32Le => encode_utf32(text, u32::to_le_bytes),
        }
    }

    /// The byte-order mark in this encoding.
    pub fn bom_bytes(self) -> Vec<u8> {
        self.encode("\u{FEFF}")
    }
}

fn decode_with(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> String {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            "malformed byte sequences replaced during decode"
        );
    }
    text.into_owned()
}

fn decode_utf32(bytes: &[u8], read: fn([u8; 4]) -> u32) -> String {
    let mut text = String::with_capacity(bytes.len() / 4);
    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        let unit = read([chunk[0], chunk[1], chunk[2], chunk[3]]);
        text.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
    }
    if !chunks.remainder().is_empty() {
        tracing::warn!("truncated UTF-32 code unit replaced during decode");
        text.push('\u{FFFD}');
    }
    text
}

fn encode_utf16(text: &str, write: fn(u16) -> [u8; 2]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&write(unit));
    }
    bytes
}

fn encode_utf32(text: &str, write: fn(u32) -> [u8; 4]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 4);
    for ch in text.chars() {
        bytes.extend_from_slice(&write(ch as u32));
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_wins_over_supplied_encoding() {
        let detected = TextEncoding::detect(&[0xEF, 0xBB, 0xBF, b'a'], Some(TextEncoding::Utf16Be));
        assert_eq!(detected, TextEncoding::Utf8);
    }

    #[test]
    fn utf32le_bom_not_mistaken_for_utf16le() {
        let detected = TextEncoding::detect(&[0xFF, 0xFE, 0x00, 0x00], None);
        assert_eq!(detected, TextEncoding::Utf32Le);

        let detected = TextEncoding::detect(&[0xFF, 0xFE, b'a', 0x00], None);
        assert_eq!(detected, TextEncoding::Utf16Le);
    }

    #[test]
    fn supplied_encoding_wins_over_heuristic() {
        // "a" in UTF-16LE looks like `xx 00`, but the caller said UTF-8.
        let detected = TextEncoding::detect(&[b'a', 0x00], Some(TextEncoding::Utf8));
        assert_eq!(detected, TextEncoding::Utf8);
    }

    #[test]
    fn heuristic_infers_from_zero_bytes() {
        assert_eq!(
            TextEncoding::detect(&[0x00, 0x00, 0x00, b'a'], None),
            TextEncoding::Utf32Be
        );
        assert_eq!(
            TextEncoding::detect(&[b'a', 0x00, 0x00, 0x00], None),
            TextEncoding::Utf32Le
        );
        assert_eq!(
            TextEncoding::detect(&[0x00, b'a', 0x00, b'b'], None),
            TextEncoding::Utf16Be
        );
        assert_eq!(
            TextEncoding::detect(&[b'a', 0x00, b'b', 0x00], None),
            TextEncoding::Utf16Le
        );
    }

    #[test]
    fn short_or_ambiguous_input_defaults_to_utf8() {
        assert_eq!(TextEncoding::detect(&[], None), TextEncoding::Utf8);
        assert_eq!(TextEncoding::detect(&[b'a'], None), TextEncoding::Utf8);
        assert_eq!(TextEncoding::detect(b"ab", None), TextEncoding::Utf8);
    }

    #[test]
    fn codec_round_trips_every_encoding() {
        let text = "key=value\r\n[Sekt\u{00e4}on]\r\nsnowman=\u{2603}";
        for encoding in [
            TextEncoding::Utf8,
            TextEncoding::Utf16Be,
            TextEncoding::Utf16Le,
            TextEncoding::Utf32Be,
            TextEncoding::Utf32Le,
        ] {
            let bytes = encoding.encode(text);
            assert_eq!(encoding.decode(&bytes), text, "{}", encoding.name());
        }
    }

    #[test]
    fn utf16_surrogate_pairs_survive() {
        let text = "emoji=\u{1F600}";
        let bytes = TextEncoding::Utf16Be.encode(text);
        assert_eq!(TextEncoding::Utf16Be.decode(&bytes), text);
    }
}
