use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::text::{accept_note, joined_text};

static TERM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dt").unwrap());

const NOTE_LABELS: &[&str] = &["notes", "note", "comments", "comment"];

/// Read the value of the first notes/comments definition on a result page.
pub fn extract_notes(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&TERM).find_map(|dt| {
        let label = joined_text(dt, " ").to_lowercase();
        if !NOTE_LABELS.contains(&label.as_str()) {
            return None;
        }
        let dd = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "dd")?;
        accept_note(&joined_text(dd, " "))
    })
}
