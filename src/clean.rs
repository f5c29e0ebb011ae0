use rayon::prelude::*;

use crate::model::{ApplicationResultEntry, EnrichedEntry};
use crate::text::strip_html;

/// Strip markup from every string field; empty optional fields become absent.
pub fn clean_entries(records: Vec<EnrichedEntry>) -> Vec<EnrichedEntry> {
    records.into_par_iter().map(clean_record).collect()
}

pub fn clean_record(record: EnrichedEntry) -> EnrichedEntry {
    EnrichedEntry {
        entry: clean_entry(record.entry),
        llm_generated_university: clean_opt(record.llm_generated_university),
        llm_generated_program: clean_opt(record.llm_generated_program),
    }
}

fn clean_entry(e: ApplicationResultEntry) -> ApplicationResultEntry {
    ApplicationResultEntry {
        program_name: strip_html(&e.program_name),
        university: strip_html(&e.university),
        comments: clean_opt(e.comments),
        date_posted: clean_opt(e.date_posted),
        url: e.url.trim().to_string(),
        applicant_status: e.applicant_status,
        accepted_date: clean_opt(e.accepted_date),
        rejected_date: clean_opt(e.rejected_date),
        start_term: clean_opt(e.start_term),
        citizenship: e.citizenship,
        gre_score: clean_opt(e.gre_score),
        gre_v: clean_opt(e.gre_v),
        gre_aw: clean_opt(e.gre_aw),
        degree: clean_opt(e.degree),
        gpa: clean_opt(e.gpa),
    }
}

fn clean_opt(value: Option<String>) -> Option<String> {
    value.map(|v| strip_html(&v)).filter(|v| !v.is_empty())
}
