//! Quote-aware brace matching and splitting.
//!
//! All structural characters (`{`, `}`, `"`, `\`, `,`, `:`) are ASCII, and
//! UTF-8 continuation bytes never collide with ASCII, so scanning bytes and
//! slicing at the positions found is always on a char boundary.

/// Byte offset one past the `}` that closes the `{` at `start`.
///
/// Braces inside double-quoted strings are ignored. A backslash escapes
/// exactly the next byte, inside or outside a string, so `\"` never toggles
/// the string state. Returns `None` when the text ends first.
pub(crate) fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Byte positions of `separator` that sit outside double-quoted strings.
fn unquoted_positions(text: &str, separator: u8) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, &byte) in text.as_bytes().iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' => escaped = true,
            b'"' => in_string = !in_string,
            b if b == separator && !in_string => positions.push(index),
            _ => {}
        }
    }

    positions
}

/// Split on every unquoted `separator`.
pub(crate) fn split_unquoted(text: &str, separator: u8) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut from = 0;
    for at in unquoted_positions(text, separator) {
        pieces.push(&text[from..at]);
        from = at + 1;
    }
    pieces.push(&text[from..]);
    pieces
}

/// Split at the first unquoted `separator`.
pub(crate) fn split_once_unquoted(text: &str, separator: u8) -> Option<(&str, &str)> {
    let at = *unquoted_positions(text, separator).first()?;
    Some((&text[..at], &text[at + 1..]))
}
