//! Text sanitization helpers
//!
//! Invisible characters (byte-order marks, zero-width spaces and joiners)
//! survive copy/paste and some package tooling. They are stripped before any
//! line is interpreted so they cannot end up inside package names or paths.

/// Characters removed from every sanitized line
const INVISIBLE_CHARS: [char; 5] = [
    '\u{feff}', // byte-order mark / zero-width no-break space
    '\u{200b}', // zero-width space
    '\u{200c}', // zero-width non-joiner
    '\u{200d}', // zero-width joiner
    '\u{2060}', // word joiner
];

/// Trim a raw line and remove invisible characters from it
pub fn sanitize_line(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect()
}

/// Iterate over the sanitized, non-empty lines of `text`
pub fn sanitized_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(sanitize_line)
        .filter(|line| !line.is_empty())
}

/// Strip a leading byte-order mark from a whole document
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}
