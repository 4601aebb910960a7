//! UTF-16 offset helpers.
//!
//! Point offsets count UTF-16 code units while Rust strings index by byte.

/// Length of `s` in UTF-16 code units
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte index of the UTF-16 `offset` in `s`.
///
/// Returns `None` when the offset is past the end or falls inside a surrogate
/// pair.
pub fn byte_index(s: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in s.char_indices() {
        if units == offset {
            return Some(byte);
        }
        units += ch.len_utf16();
        if units > offset {
            return None;
        }
    }
    (units == offset).then_some(s.len())
}
