//! Offset helpers for source text.
//!
//! The core works in UTF-8 byte offsets. Hosts running in JavaScript report
//! positions in UTF-16 code units, so bridges convert at the boundary.

use std::ops::Range;

/// Byte range of the line containing `offset`, excluding the newline.
///
/// Offsets past the end clamp to the last line; offsets inside a multibyte
/// char snap back to its start.
pub fn line_range(text: &str, offset: usize) -> Range<usize> {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }

    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = text[offset..]
        .find('\n')
        .map_or(text.len(), |i| offset + i);
    start..end
}

/// Byte range covering lines `first..=last` (zero-based), excluding the final newline.
///
/// Returns `None` when `first` is past the last line or `last < first`.
/// A `last` past the end clamps to the end of the text.
pub fn lines_range(text: &str, first: usize, last: usize) -> Option<Range<usize>> {
    if last < first {
        return None;
    }

    let mut line = 0;
    let mut start = (first == 0).then_some(0);
    for (idx, _) in text.match_indices('\n') {
        if line == last {
            return start.map(|s| s..idx);
        }
        line += 1;
        if line == first {
            start = Some(idx + 1);
        }
    }
    start.map(|s| s..text.len())
}

/// Convert a UTF-16 code unit offset into a byte offset.
///
/// Returns `None` when the offset lies past the end of the text. Offsets
/// falling between the two halves of a surrogate pair round down.
pub fn utf16_to_byte(text: &str, utf16_offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        let next = units + ch.len_utf16();
        if next > utf16_offset {
            return Some(byte);
        }
        units = next;
    }
    (units == utf16_offset).then_some(text.len())
}
