use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::model::{ApplicationResultEntry, Citizenship, Decision};
use crate::text::{clean_comment_text, joined_text};

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SPANNING_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[colspan]").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Accepted|Rejected|Interview|Wait\s?listed)").unwrap());
static DECISION_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)on\s+(.+)").unwrap());
static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Fall|Spring|Summer|Winter)\s+\d{4}").unwrap());
static GPA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"GPA\s+([\d.]+)").unwrap());
static GRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GRE\s+(?:General\s+)?(\d+)").unwrap());
static GRE_V_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"GRE\s+V\s*(\d+)").unwrap());
static GRE_AW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:GRE\s+)?AW\s+([\d.]+)").unwrap());

/// Cells a row needs before it counts as the first row of an entry.
const MIN_PRIMARY_CELLS: usize = 4;

/// An entry parsed from the listing, still waiting on its detail-page notes.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub entry: ApplicationResultEntry,
    pub detail_url: Option<String>,
    /// Listing rows this entry was built from (1 or 2).
    pub rows_consumed: usize,
}

impl ParsedEntry {
    /// Seal the entry. Non-empty detail-page notes replace the row comments.
    pub fn finish(self, notes: Option<String>) -> ApplicationResultEntry {
        let mut entry = self.entry;
        if let Some(notes) = notes.filter(|n| !n.is_empty()) {
            entry.comments = Some(notes);
        }
        entry
    }
}

/// Parse every entry in the first results table of a listing page.
///
/// Each entry is one primary row (four or more cells) optionally followed by a
/// details row, recognised by a cell with a `colspan` attribute. Rows with too
/// few cells that are not details rows are skipped.
pub fn parse_rows(html: &str, source_url: &str) -> Vec<ParsedEntry> {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&TABLE).next() else {
        return Vec::new();
    };
    let rows: Vec<ElementRef> = table.select(&ROW).collect();
    let base = Url::parse(source_url).ok();

    let mut entries = Vec::new();
    // Row 0 is the header.
    let mut i = 1;
    while i < rows.len() {
        let cells: Vec<ElementRef> = rows[i].select(&CELL).collect();
        if cells.len() < MIN_PRIMARY_CELLS {
            i += 1;
            continue;
        }

        let mut entry = primary_fields(&cells);
        let detail_url = detail_link(&cells, base.as_ref());

        let details = rows
            .get(i + 1)
            .filter(|row| row.select(&SPANNING_CELL).next().is_some());
        let rows_consumed = match details {
            Some(row) => {
                apply_details(&mut entry, *row);
                2
            }
            None => 1,
        };
        i += rows_consumed;

        entry.url = detail_url
            .clone()
            .unwrap_or_else(|| source_url.to_string());
        entries.push(ParsedEntry {
            entry,
            detail_url,
            rows_consumed,
        });
    }
    entries
}

fn primary_fields(cells: &[ElementRef]) -> ApplicationResultEntry {
    let university = joined_text(cells[0], "");

    let spans: Vec<String> = cells[1].select(&SPAN).map(|s| joined_text(s, "")).collect();
    let program_name = spans.first().cloned().unwrap_or_default();
    let degree = spans.get(1).cloned();

    let date_posted = cells.get(2).map(|c| joined_text(*c, ""));

    let decision_text = cells.get(3).map(|c| joined_text(*c, "")).unwrap_or_default();
    let applicant_status = STATUS_RE
        .captures(&decision_text)
        .and_then(|c| Decision::from_label(&c[1]));

    let mut accepted_date = None;
    let mut rejected_date = None;
    if let Some(status) = applicant_status {
        let decision_date = DECISION_DATE_RE
            .captures(&decision_text)
            .map(|c| c[1].trim().to_string());
        match status {
            Decision::Accepted => accepted_date = decision_date,
            Decision::Rejected => rejected_date = decision_date,
            Decision::Interview | Decision::Waitlisted => {}
        }
    }

    ApplicationResultEntry {
        university,
        program_name,
        degree,
        date_posted,
        applicant_status,
        accepted_date,
        rejected_date,
        ..Default::default()
    }
}

/// Absolute URL of the first link in the fifth cell, if any.
fn detail_link(cells: &[ElementRef], base: Option<&Url>) -> Option<String> {
    let href = cells
        .get(4)?
        .select(&LINK)
        .next()?
        .value()
        .attr("href")?
        .trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    base?.join(href).ok().map(String::from)
}

/// Badge fields are searched independently; a missing badge blocks nothing.
fn apply_details(entry: &mut ApplicationResultEntry, row: ElementRef) {
    let details = row.text().collect::<Vec<_>>().join(" ");

    entry.start_term = TERM_RE.find(&details).map(|m| m.as_str().to_string());
    entry.citizenship = if details.contains("International") {
        Some(Citizenship::International)
    } else if details.contains("American") || details.contains("Domestic") {
        Some(Citizenship::American)
    } else {
        None
    };
    entry.gpa = first_capture(&GPA_RE, &details);
    entry.gre_score = first_capture(&GRE_RE, &details);
    entry.gre_v = first_capture(&GRE_V_RE, &details);
    entry.gre_aw = first_capture(&GRE_AW_RE, &details);
    entry.comments = clean_comment_text(&details);
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}
