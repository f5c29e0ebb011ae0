use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use rusqlite::{params, Connection};

use crate::model::EnrichedEntry;

static P_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/result/(\d+)").unwrap());
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").unwrap());

/// Upper bound for caller-supplied row limits.
const LIMIT_MAX: usize = 100;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS applicants (
            p_id                     INTEGER PRIMARY KEY,
            program                  TEXT,
            comments                 TEXT,
            date_added               TEXT,
            url                      TEXT,
            status                   TEXT,
            term                     TEXT,
            us_or_international      TEXT,
            gpa                      REAL,
            gre                      REAL,
            gre_v                    REAL,
            gre_aw                   REAL,
            degree                   TEXT,
            llm_generated_program    TEXT,
            llm_generated_university TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_applicants_term ON applicants(term);
        CREATE INDEX IF NOT EXISTS idx_applicants_status ON applicants(status);
        ",
    )?;
    Ok(())
}

// ── Field coercion ──

/// Post id from a result URL such as `.../survey/result/123456`.
///
/// `Ok(None)` when the URL carries no id; an id too large for `i64` is an error.
pub fn extract_p_id(url: &str) -> Result<Option<i64>> {
    let Some(caps) = P_ID_RE.captures(url) else {
        return Ok(None);
    };
    let id = caps[1]
        .parse::<i64>()
        .with_context(|| format!("Malformed result id in {}", url))?;
    Ok(Some(id))
}

/// First number in a badge string: `"GPA 3.89"` → 3.89, `"327"` → 327.0.
pub fn parse_numeric(value: Option<&str>) -> Option<f64> {
    let caps = NUMERIC_RE.captures(value?)?;
    caps[1].parse().ok()
}

/// Listing dates look like `January 31, 2026`.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?.trim(), "%B %d, %Y").ok()
}

/// SQLite accepts NUL in TEXT but downstream tools do not.
fn clean_string(value: Option<&str>) -> Option<String> {
    value.map(|s| s.replace('\0', ""))
}

// ── Loading ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoIdentifier,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub inserted: usize,
    pub skipped: usize,
}

impl LoadStats {
    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Insert one record unless its id is missing or already stored.
pub fn insert_entry(conn: &Connection, record: &EnrichedEntry) -> Result<InsertOutcome> {
    let e = &record.entry;
    let Some(p_id) = extract_p_id(&e.url)? else {
        return Ok(InsertOutcome::Skipped(SkipReason::NoIdentifier));
    };

    let program = format!("{}, {}", e.university, e.program_name);
    let changed = conn.execute(
        "INSERT OR IGNORE INTO applicants
         (p_id, program, comments, date_added, url, status, term, us_or_international,
          gpa, gre, gre_v, gre_aw, degree, llm_generated_program, llm_generated_university)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
        params![
            p_id,
            clean_string(Some(&program)),
            clean_string(e.comments.as_deref()),
            parse_date(e.date_posted.as_deref()).map(|d| d.to_string()),
            clean_string(Some(&e.url)),
            e.applicant_status.map(|s| s.as_str()),
            clean_string(e.start_term.as_deref()),
            e.citizenship.map(|c| c.as_str()),
            parse_numeric(e.gpa.as_deref()),
            parse_numeric(e.gre_score.as_deref()),
            parse_numeric(e.gre_v.as_deref()),
            parse_numeric(e.gre_aw.as_deref()),
            clean_string(e.degree.as_deref()),
            clean_string(record.llm_generated_program.as_deref()),
            clean_string(record.llm_generated_university.as_deref()),
        ],
    )?;

    Ok(if changed > 0 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::Skipped(SkipReason::Duplicate)
    })
}

/// Insert a batch in one transaction.
pub fn load_entries(conn: &Connection, records: &[EnrichedEntry]) -> Result<LoadStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = LoadStats::default();
    for record in records {
        stats.record(insert_entry(&tx, record)?);
    }
    tx.commit()?;
    Ok(stats)
}

// ── Summary ──

pub struct Summary {
    pub total: usize,
    pub term_entries: usize,
    pub international_pct: f64,
    pub avg_gpa: Option<f64>,
    pub avg_gre: Option<f64>,
    pub avg_gre_v: Option<f64>,
    pub avg_gre_aw: Option<f64>,
    pub term_acceptance_pct: f64,
    pub term_accepted_avg_gpa: Option<f64>,
    pub by_status: Vec<(String, usize)>,
}

pub fn fetch_summary(conn: &Connection, term: &str) -> Result<Summary> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM applicants", [], |r| r.get(0))?;
    let term_entries: usize = conn.query_row(
        "SELECT COUNT(*) FROM applicants WHERE term = ?1",
        [term],
        |r| r.get(0),
    )?;
    let (with_citizenship, international): (usize, usize) = conn.query_row(
        "SELECT COUNT(us_or_international),
                COUNT(CASE WHEN us_or_international = 'International' THEN 1 END)
         FROM applicants",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    type Averages = (Option<f64>, Option<f64>, Option<f64>, Option<f64>);
    let (avg_gpa, avg_gre, avg_gre_v, avg_gre_aw): Averages = conn.query_row(
        "SELECT AVG(gpa), AVG(gre), AVG(gre_v), AVG(gre_aw) FROM applicants",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    let (term_accepted, term_accepted_avg_gpa): (usize, Option<f64>) = conn.query_row(
        "SELECT COUNT(*), AVG(gpa) FROM applicants WHERE term = ?1 AND status = 'Accepted'",
        [term],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM applicants
         WHERE status IS NOT NULL
         GROUP BY status ORDER BY COUNT(*) DESC
         LIMIT 100",
    )?;
    let by_status = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Summary {
        total,
        term_entries,
        international_pct: percent(international, with_citizenship),
        avg_gpa,
        avg_gre,
        avg_gre_v,
        avg_gre_aw,
        term_acceptance_pct: percent(term_accepted, term_entries),
        term_accepted_avg_gpa,
        by_status,
    })
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub struct ProgramRow {
    pub university: String,
    pub program: String,
    pub applications: usize,
}

/// Most applied-to programs for a term, preferring standardized names.
pub fn fetch_top_programs(conn: &Connection, term: &str, limit: usize) -> Result<Vec<ProgramRow>> {
    let limit = limit.clamp(1, LIMIT_MAX);
    let mut stmt = conn.prepare(
        "SELECT COALESCE(llm_generated_university, ''),
                COALESCE(llm_generated_program, program, '') AS prog,
                COUNT(*) AS n
         FROM applicants
         WHERE term = ?1
         GROUP BY 1, 2
         ORDER BY n DESC, prog
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![term, limit as i64], |row| {
            Ok(ProgramRow {
                university: row.get(0)?,
                program: row.get(1)?,
                applications: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
