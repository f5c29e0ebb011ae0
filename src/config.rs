use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

pub const DEFAULT_BASE: &str = "https://www.thegradcafe.com/";
pub const USER_AGENT: &str = "GradCafeScraper/1.0 (+https://example.com/)";
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAGES: usize = 500;

pub const DB_PATH: &str = "data/gradcafe.sqlite";
pub const DEFAULT_LLM_API_URL: &str = "http://localhost:8000/standardize";

/// How listing page URLs are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageMode {
    /// Collect survey links from the index page and visit each once.
    Discover,
    /// Walk `/survey/?page=N` from page 1.
    Numbered,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub limit: usize,
    pub mode: PageMode,
    pub delay: Duration,
    /// Hard stop on listing pages visited, on top of the entry limit.
    pub max_pages: Option<usize>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE.to_string(),
            limit: 50,
            mode: PageMode::Numbered,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            max_pages: Some(DEFAULT_MAX_PAGES),
        }
    }
}

/// `GRADCAFE_DB` if set, else the default path.
pub fn db_path() -> PathBuf {
    std::env::var("GRADCAFE_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DB_PATH))
}

/// `LLM_API_URL` if set, else the local default.
pub fn llm_api_url() -> String {
    std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string())
}
