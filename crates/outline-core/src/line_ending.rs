//! Line ending helpers.
//!
//! The buffer stores paragraphs separated by LF (`'\n'`) only. Text arriving from the
//! view (paste, typing, drops) may carry CR, CRLF, form feeds or the Unicode paragraph
//! separators; those are all paragraph breaks and are normalized before splicing.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static UNNORMALIZED_LINE_ENDINGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\r\n?|[\u{000C}\u{2B7F}\u{2029}]").expect("valid line ending regex")
});

/// `true` if `text` contains a paragraph break other than `'\n'`.
pub fn has_unnormalized_line_endings(text: &str) -> bool {
    UNNORMALIZED_LINE_ENDINGS.is_match(text)
}

/// Replace every paragraph break with `'\n'`. Borrows when nothing changes.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    UNNORMALIZED_LINE_ENDINGS.replace_all(text, "\n")
}
