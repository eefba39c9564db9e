// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Text-decode filter: tells translatable-tagged subrecords
//! apart from binary payloads that merely happen to sit under a
//! translatable tag.

/// Attempts to decode `payload` as a translatable string.
///
/// Strips a single trailing NUL, UTF-8 decodes, and rejects anything that
/// looks like binary data: empty strings, replacement characters (signaling
/// a lossy decode), or fewer than 90% printable/whitespace characters.
pub fn decode_text(payload: &[u8]) -> Option<String> {
    let trimmed = match payload.split_last() {
        Some((&0, rest)) => rest,
        _ => payload,
    };

    let text = std::str::from_utf8(trimmed).ok()?;
    if text.is_empty() || text.contains('\u{FFFD}') {
        return None;
    }
    if !is_printable_text(text) {
        return None;
    }
    Some(text.to_string())
}

/// Unicode "private use" ranges (general category Co): never printable.
const PRIVATE_USE_RANGES: [(char, char); 3] =
    [('\u{E000}', '\u{F8FF}'), ('\u{F0000}', '\u{FFFFD}'), ('\u{100000}', '\u{10FFFD}')];

/// A hand-picked set of format characters (general category Cf) that show up
/// in real-world text: zero-width joiners/spaces, bidi controls, BOM. Not
/// exhaustive — the full Cf/Cn category tables require a Unicode database
/// this crate doesn't carry; see `is_printable_text`'s doc comment.
const FORMAT_CHARS: [(char, char); 5] = [
    ('\u{00AD}', '\u{00AD}'),
    ('\u{200B}', '\u{200F}'),
    ('\u{202A}', '\u{202E}'),
    ('\u{2060}', '\u{206F}'),
    ('\u{FEFF}', '\u{FEFF}'),
];

fn in_ranges(c: char, ranges: &[(char, char)]) -> bool {
    ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi)
}

/// A character counts as non-printable if it's a control character (Cc), a
/// line/paragraph separator, a non-space space separator (Zs other than
/// U+0020), a private-use character (Co), or one of the common format
/// characters (Cf) in [`FORMAT_CHARS`].
///
/// This mirrors Python's `str.isprintable()` closely but not exactly: Cf and
/// Cn (unassigned) are approximated rather than looked up against a full
/// Unicode category table, since no crate in this codebase's dependency tree
/// carries one. Surrogates (Cs) can't occur at all — Rust's `char` only
/// holds valid scalar values.
fn is_char_printable(c: char) -> bool {
    if matches!(c, '\n' | '\r' | '\t') {
        return true;
    }
    if c.is_control() || c == '\u{2028}' || c == '\u{2029}' {
        return false;
    }
    if c.is_whitespace() && c != ' ' {
        return false;
    }
    if in_ranges(c, &PRIVATE_USE_RANGES) || in_ranges(c, &FORMAT_CHARS) {
        return false;
    }
    true
}

fn is_printable_text(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let printable = text.chars().filter(|&c| is_char_printable(c)).count();
    (printable as f64) / (total as f64) >= 0.90
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_nul_and_decodes() {
        assert_eq!(decode_text(b"Iron Sword\0").as_deref(), Some("Iron Sword"));
    }

    #[test]
    fn rejects_empty_payload() {
        assert_eq!(decode_text(b"\0"), None);
        assert_eq!(decode_text(b""), None);
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert_eq!(decode_text(&[0xFF, 0xFE, 0x00]), None);
    }

    #[test]
    fn rejects_mostly_control_bytes() {
        let payload = [0x01u8, 0x02, 0x03, b'A', 0x00];
        assert_eq!(decode_text(&payload), None);
    }

    #[test]
    fn rejects_line_separator_as_non_printable() {
        // U+2028 LINE SEPARATOR is not control (Cc) but is excluded the same
        // way Python's str.isprintable() excludes it.
        let payload = "\u{2028}".repeat(5);
        assert_eq!(decode_text(payload.as_bytes()), None);
    }

    #[test]
    fn accepts_embedded_newlines() {
        assert_eq!(
            decode_text(b"Line one\nLine two\0").as_deref(),
            Some("Line one\nLine two")
        );
    }
}
