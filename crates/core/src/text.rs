//! Legacy `&` formatting codes.

/// Section sign that prefixes formatting codes in rendered text.
pub const SECTION: char = '§';

const CODES: &str = "0123456789abcdefklmnorx";

/// Rewrites `&X` to `§x` for every recognised formatting code `X` (either case).
#[must_use]
pub fn translate_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&'
            && let Some(&code) = chars.peek()
            && CODES.contains(code.to_ascii_lowercase())
        {
            out.push(SECTION);
            out.push(code.to_ascii_lowercase());
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}
