use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

/// Shortest leftover (exclusive) accepted as a real comment.
const MIN_COMMENT_CHARS: usize = 15;
pub const MAX_COMMENT_CHARS: usize = 500;
const FILLER_CHARS: &str = ".,;:!? ";

static BADGE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(Fall|Spring|Summer|Winter)\s+\d{4}",
        r"(?i)International",
        r"(?i)American",
        r"(?i)Domestic",
        r"(?i)GPA\s+[\d.]+",
        r"(?i)GRE\s+(?:General\s+)?\d+",
        r"(?i)GRE\s+V\s*\d+",
        r"(?i)(?:GRE\s+)?AW\s+[\d.]+",
        r"(?i)Accepted on \d+\s+\w+",
        r"(?i)Rejected on \d+\s+\w+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Remove markup and entities, collapse whitespace runs, trim.
/// Empty input comes back untouched.
pub fn strip_html(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(value);
    let text = joined_text(fragment.root_element(), " ");
    collapse_whitespace(&text)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text nodes of `element`, each trimmed, empties dropped, joined by `sep`.
pub fn joined_text(element: ElementRef<'_>, sep: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Strip badge tokens (term, citizenship, scores, decision dates) and keep
/// what is left if it reads like a real remark.
pub fn clean_comment_text(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let mut cleaned = strip_html(text);
    for re in BADGE_RES.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    let cleaned = collapse_whitespace(&cleaned);

    if cleaned.chars().count() > MIN_COMMENT_CHARS && !is_filler(&cleaned) {
        Some(truncate_chars(&cleaned, MAX_COMMENT_CHARS))
    } else {
        None
    }
}

/// Gate for detail-page notes: non-empty, not only punctuation, capped length.
pub fn accept_note(text: &str) -> Option<String> {
    let text = collapse_whitespace(text);
    if text.is_empty() || is_filler(&text) {
        return None;
    }
    Some(truncate_chars(&text, MAX_COMMENT_CHARS))
}

fn is_filler(text: &str) -> bool {
    text.chars().all(|c| FILLER_CHARS.contains(c))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
