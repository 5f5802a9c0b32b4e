//! Best-effort text decoding for entry files of unknown encoding.
//!
//! Each candidate decoding is scored; characters from the scripts an entry
//! list is expected to contain raise the score, replacement and control
//! characters lower it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Latin1 => "ISO-8859-1",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
    pub score: i64,
    /// Number of U+FFFD characters substituted for undecodable input.
    pub replacements: usize,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Decodes `bytes` with the best scoring candidate.
pub fn decode(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return scored(lossy_utf8(rest), TextEncoding::Utf8);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return scored(utf16(rest, u16::from_le_bytes), TextEncoding::Utf16Le);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return scored(utf16(rest, u16::from_be_bytes), TextEncoding::Utf16Be);
    }

    let utf16_order = guess_utf16(bytes);
    if utf16_order.is_none() {
        if let Ok(text) = std::str::from_utf8(bytes) {
            // Valid UTF-8 is unambiguous enough to accept outright.
            return scored(text.to_string(), TextEncoding::Utf8);
        }
    }

    let mut candidates = Vec::with_capacity(3);
    match utf16_order {
        Some(TextEncoding::Utf16Be) => candidates.push(scored(
            utf16(bytes, u16::from_be_bytes),
            TextEncoding::Utf16Be,
        )),
        Some(_) => candidates.push(scored(
            utf16(bytes, u16::from_le_bytes),
            TextEncoding::Utf16Le,
        )),
        None => {}
    }
    candidates.push(scored(lossy_utf8(bytes), TextEncoding::Utf8));
    candidates.push(scored(latin1(bytes), TextEncoding::Latin1));

    // First candidate wins ties, so the list order is the priority order.
    let mut best = candidates.remove(0);
    for candidate in candidates {
        if candidate.score > best.score {
            best = candidate;
        }
    }
    best
}

/// Heuristic plausibility score for decoded entry-list text.
pub fn score(text: &str) -> i64 {
    text.chars()
        .map(|c| match c {
            '\u{FFFD}' => -20,
            '\t' | '\n' | '\r' => 1,
            c if c.is_control() => -10,
            ' '..='~' => 1,
            // Hiragana, Katakana, CJK ideographs, full-width forms.
            '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}' | '\u{FF00}'..='\u{FFEF}' => 3,
            '\u{00C0}'..='\u{024F}' => 1,
            _ => 0,
        })
        .sum()
}

fn scored(text: String, encoding: TextEncoding) -> DecodedText {
    let replacements = text.chars().filter(|c| *c == '\u{FFFD}').count();
    DecodedText {
        score: score(&text),
        text,
        encoding,
        replacements,
    }
}

fn lossy_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| read([pair[0], pair[1]]));
    let mut text: String = char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if bytes.len() % 2 == 1 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// ASCII text stored as UTF-16 has a NUL in every other byte; the side the
/// NULs fall on gives the byte order.
fn guess_utf16(bytes: &[u8]) -> Option<TextEncoding> {
    let sample = &bytes[..bytes.len().min(256)];
    if sample.len() < 4 {
        return None;
    }
    let (mut even, mut odd) = (0usize, 0usize);
    for (idx, byte) in sample.iter().enumerate() {
        if *byte == 0 {
            if idx % 2 == 0 {
                even += 1;
            } else {
                odd += 1;
            }
        }
    }
    if (even + odd) * 4 < sample.len() {
        return None;
    }
    if even > odd {
        Some(TextEncoding::Utf16Be)
    } else {
        Some(TextEncoding::Utf16Le)
    }
}
