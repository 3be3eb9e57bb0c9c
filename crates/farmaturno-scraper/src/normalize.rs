//! Cleanup of the free-text on-duty schedule shipped in detail responses.

use std::sync::LazyLock;

use farmaturno_core::SCHEDULE_NOT_SPECIFIED;
use regex::Regex;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

// Unicode `White_Space` omits the byte-order mark; JavaScript's `\s` does not.
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x{FEFF}]+").expect("valid regex"));

/// Normalizes the upstream `horario.turno` text into a single display line.
///
/// `<br>`, `<br/>` and `<br />` (any case) become spaces, whitespace runs
/// collapse to one space, and the result is trimmed. A missing or blank
/// schedule yields [`SCHEDULE_NOT_SPECIFIED`].
#[must_use]
pub fn normalize_schedule(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return SCHEDULE_NOT_SPECIFIED.to_owned();
    };

    let spaced = LINE_BREAK.replace_all(raw, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&spaced, " ");
    let collapsed = collapsed.trim_matches(' ');

    if collapsed.is_empty() {
        SCHEDULE_NOT_SPECIFIED.to_owned()
    } else {
        collapsed.to_owned()
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
