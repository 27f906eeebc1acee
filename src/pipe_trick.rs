//! Derives the display text of a `[[Target|]]` wiki link from the target
//! title, per <https://en.wikipedia.org/wiki/Help:Pipe_trick>.

/// Applies the pipe-trick transformation to a page title.
///
/// Strips the namespace prefix (everything up to and including the first
/// colon at position 1 or later, then a single leading colon), then a
/// trailing parenthetical qualifier (from the last `(`) or, failing that,
/// a comma suffix (from the first `,`), and finally surrounding
/// whitespace.
///
/// Wikipedia does not fully define the corner cases, so this function
/// does not try to handle them all; behavior outside the documented cases
/// is unspecified.
pub fn resolve_pipe_trick(mut s: &str) -> &str {
    if !s.is_empty() {
        // Searching bytes is fine here: ':' is ASCII, so every match is a
        // character boundary.
        if let Some(pos) = s.as_bytes().iter().skip(1).position(|&b| b == b':') {
            s = &s[pos + 1..];
        }
        if let Some(rest) = s.strip_prefix(':') {
            s = rest;
        }
    }

    if let Some(pos) = s.rfind('(') {
        s = &s[..pos];
    } else if let Some(pos) = s.find(',') {
        s = &s[..pos];
    }

    s.trim()
}
