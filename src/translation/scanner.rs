#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    /// `E'...'` literal, where backslash escapes the next byte
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Returns the end (exclusive) of a `\w+` identifier starting at `start`.
pub(super) fn scan_identifier(bytes: &[u8], start: usize) -> Option<usize> {
    let mut idx = start;
    while idx < bytes.len() && is_word_byte(bytes[idx]) {
        idx += 1;
    }
    if idx == start { None } else { Some(idx) }
}

pub(super) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
