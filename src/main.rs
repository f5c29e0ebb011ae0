mod clean;
mod config;
mod db;
mod fetch;
mod files;
mod gate;
mod model;
mod parser;
mod pipeline;
mod runner;
mod standardize;
mod text;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use config::{PageMode, ScrapeConfig};
use model::EnrichedEntry;

const RAW_OUT: &str = "data/applicant_data.json";
const CLEAN_OUT: &str = "data/cleaned_applicant_data.json";
const LLM_OUT: &str = "data/llm_extend_applicant_data.json";

#[derive(Parser)]
#[command(name = "gradcafe", about = "GradCafe admissions results scraper")]
struct Cli {
    /// SQLite database path (default: $GRADCAFE_DB or data/gradcafe.sqlite)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape listing pages into a JSON file
    Scrape {
        #[arg(long, default_value = config::DEFAULT_BASE)]
        base: String,
        /// Max entries to collect
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Output path (default: data/applicant_data.json)
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "numbered")]
        mode: PageMode,
        /// Pause after every request
        #[arg(long, default_value_t = config::DEFAULT_DELAY_MS)]
        delay_ms: u64,
        #[arg(long, default_value_t = config::DEFAULT_MAX_PAGES)]
        max_pages: usize,
        /// Write JSON Lines instead of a JSON array
        #[arg(long)]
        jsonl: bool,
    },
    /// Strip markup from a scraped file
    Clean {
        #[arg(short, long, default_value = RAW_OUT)]
        input: PathBuf,
        #[arg(short, long, default_value = CLEAN_OUT)]
        out: PathBuf,
    },
    /// Add standardized university/program names via the LLM service
    Standardize {
        #[arg(short, long, default_value = CLEAN_OUT)]
        input: PathBuf,
        #[arg(short, long, default_value = LLM_OUT)]
        out: PathBuf,
        /// Service endpoint (default: $LLM_API_URL or localhost)
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Load an entry file into the database
    Load {
        #[arg(short, long, default_value = LLM_OUT)]
        input: PathBuf,
    },
    /// Scrape, clean, and load new entries in one exclusive run
    Pull {
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        #[arg(long, value_enum, default_value = "numbered")]
        mode: PageMode,
        #[arg(long, default_value_t = config::DEFAULT_DELAY_MS)]
        delay_ms: u64,
        /// Abandon the run after this many seconds
        #[arg(long, default_value_t = runner::DEFAULT_RUN_TIMEOUT.as_secs())]
        timeout_secs: u64,
    },
    /// Summary of the loaded results
    Stats {
        #[arg(short, long, default_value = "Fall 2026")]
        term: String,
        /// Programs to list
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(config::db_path);

    let result = match cli.command {
        Commands::Scrape {
            base,
            limit,
            out,
            mode,
            delay_ms,
            max_pages,
            jsonl,
        } => {
            let out = output_path(out, jsonl);
            let config = ScrapeConfig {
                base_url: base,
                limit,
                mode,
                delay: Duration::from_millis(delay_ms),
                max_pages: Some(max_pages),
            };
            let fetcher = fetch::PageFetcher::new(config.delay)?;
            println!("Scraping up to {} entries from {}...", limit, config.base_url);
            let entries = pipeline::scrape_data(&fetcher, &config).await;
            if entries.is_empty() {
                println!("No entries found.");
                return Ok(());
            }
            files::write_entries(&out, &entries)?;
            println!("Saved {} entries to {}", entries.len(), out.display());
            Ok(())
        }
        Commands::Clean { input, out } => {
            let records: Vec<EnrichedEntry> = files::read_entries(&input)?;
            let cleaned = clean::clean_entries(records);
            files::write_entries(&out, &cleaned)?;
            println!("Cleaned {} entries -> {}", cleaned.len(), out.display());
            Ok(())
        }
        Commands::Standardize {
            input,
            out,
            api_url,
        } => {
            let fresh: Vec<EnrichedEntry> = files::read_entries(&input)?;
            let records = if out.exists() {
                let existing: Vec<EnrichedEntry> = files::read_entries(&out)?;
                standardize::resume(existing, fresh)
            } else {
                fresh
            };
            let pending = records.iter().filter(|r| !r.is_standardized()).count();
            if pending == 0 {
                println!("All {} entries already standardized.", records.len());
                return Ok(());
            }
            println!("Standardizing {} of {} entries...", pending, records.len());
            let standardizer =
                standardize::Standardizer::new(api_url.unwrap_or_else(config::llm_api_url))?;
            let results = standardizer.standardize_all(records, Some(&out)).await?;
            files::write_entries(&out, &results)?;
            let done = results.iter().filter(|r| r.is_standardized()).count();
            println!("Standardized {}/{} entries -> {}", done, results.len(), out.display());
            Ok(())
        }
        Commands::Load { input } => {
            let conn = open_db(&db_path)?;
            let records: Vec<EnrichedEntry> = files::read_entries(&input)?;
            println!("Loading {} entries into {}...", records.len(), db_path.display());
            let stats = db::load_entries(&conn, &records)?;
            println!("Inserted {}, skipped {}.", stats.inserted, stats.skipped);
            Ok(())
        }
        Commands::Pull {
            limit,
            mode,
            delay_ms,
            timeout_secs,
        } => {
            let conn = open_db(&db_path)?;
            let config = ScrapeConfig {
                limit,
                mode,
                delay: Duration::from_millis(delay_ms),
                ..ScrapeConfig::default()
            };
            let fetcher = fetch::PageFetcher::new(config.delay)?;
            let puller = runner::Runner::new(
                gate::BusyGate::new(),
                fetcher,
                Duration::from_secs(timeout_secs),
            );
            match puller.pull_data(&conn, &config).await {
                runner::RunOutcome::Busy => println!("Another pull is already running."),
                runner::RunOutcome::TimedOut => {
                    println!("Pull timed out after {}s.", timeout_secs)
                }
                runner::RunOutcome::Finished(outcome) => match outcome? {
                    runner::PullOutcome::NothingNew => println!("No new entries found."),
                    runner::PullOutcome::Loaded(stats) => println!(
                        "Inserted {}, skipped {}.",
                        stats.inserted, stats.skipped
                    ),
                },
            }
            Ok(())
        }
        Commands::Stats { term, top } => {
            let conn = open_db(&db_path)?;
            print_stats(&conn, &term, top)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_db(path: &Path) -> anyhow::Result<rusqlite::Connection> {
    let conn = db::connect(path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// `--jsonl` forces a `.jsonl` extension on whatever path is used.
fn output_path(out: Option<PathBuf>, jsonl: bool) -> PathBuf {
    let out = out.unwrap_or_else(|| PathBuf::from(RAW_OUT));
    if jsonl && !files::is_json_lines(&out) {
        out.with_extension("jsonl")
    } else {
        out
    }
}

fn print_stats(conn: &rusqlite::Connection, term: &str, top: usize) -> anyhow::Result<()> {
    let s = db::fetch_summary(conn, term)?;
    println!("Total:         {}", s.total);
    println!("{:<14} {}", format!("{}:", term), s.term_entries);
    println!("International: {:.2}%", s.international_pct);
    println!("Avg GPA:       {}", fmt_avg(s.avg_gpa));
    println!("Avg GRE:       {}", fmt_avg(s.avg_gre));
    println!("Avg GRE V:     {}", fmt_avg(s.avg_gre_v));
    println!("Avg GRE AW:    {}", fmt_avg(s.avg_gre_aw));
    println!("Accepted:      {:.2}% of {}", s.term_acceptance_pct, term);
    println!("Accepted GPA:  {}", fmt_avg(s.term_accepted_avg_gpa));

    if !s.by_status.is_empty() {
        println!("\n--- Status ---");
        for (status, n) in &s.by_status {
            println!("  {:<12} {:>6}", status, n);
        }
    }

    let rows = db::fetch_top_programs(conn, term, top)?;
    if rows.is_empty() {
        return Ok(());
    }
    const COL: usize = 32;
    // Names wider than the column keep their first COL chars plus "...".
    let fit = |s: &str| match s.char_indices().nth(COL) {
        Some((at, _)) => format!("{}...", &s[..at]),
        None => s.to_string(),
    };
    println!("\n{:>3} | {:<32} | {:<32} | {:>5}", "#", "University", "Program", "Apps");
    println!("{}", "-".repeat(82));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>3} | {:<32} | {:<32} | {:>5}",
            i + 1,
            fit(&r.university),
            fit(&r.program),
            r.applications
        );
    }
    Ok(())
}

fn fmt_avg(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonl_flag_switches_extension() {
        assert_eq!(output_path(None, false), PathBuf::from(RAW_OUT));
        assert_eq!(
            output_path(None, true),
            PathBuf::from("data/applicant_data.jsonl")
        );
        assert_eq!(
            output_path(Some("out/x.jsonl".into()), true),
            PathBuf::from("out/x.jsonl")
        );
    }

    #[test]
    fn durations_format_by_scale() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h 0m 0s");
    }

    #[test]
    fn cli_parses_scrape_flags() {
        let cli = Cli::try_parse_from([
            "gradcafe",
            "--db",
            "x.sqlite",
            "scrape",
            "--mode",
            "discover",
            "--max-pages",
            "3",
            "--jsonl",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.sqlite")));
        match cli.command {
            Commands::Scrape {
                mode,
                max_pages,
                jsonl,
                limit,
                ..
            } => {
                assert_eq!(mode, PageMode::Discover);
                assert_eq!(max_pages, 3);
                assert!(jsonl);
                assert_eq!(limit, 50);
            }
            _ => panic!("expected scrape"),
        }
    }
}
