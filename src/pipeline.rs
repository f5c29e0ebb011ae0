use tracing::{info, warn};
use url::Url;

use crate::config::{PageMode, ScrapeConfig};
use crate::fetch::Fetch;
use crate::model::ApplicationResultEntry;
use crate::parser::{self, links::SURVEY_PATH};

/// Yields listing page URLs for one run.
enum PageCursor {
    Listed(std::vec::IntoIter<String>),
    Numbered { base: Url, next_page: u32 },
}

impl PageCursor {
    async fn open<F: Fetch>(fetcher: &F, base_url: &str, mode: PageMode) -> Option<Self> {
        let base = match Url::parse(base_url) {
            Ok(base) => base,
            Err(e) => {
                warn!("Invalid base URL {}: {}", base_url, e);
                return None;
            }
        };
        match mode {
            PageMode::Numbered => Some(Self::Numbered { base, next_page: 1 }),
            PageMode::Discover => {
                let html = fetcher.fetch(base_url).await?;
                let links = parser::find_survey_links(&html, base_url);
                info!("Found {} candidate survey links", links.len());
                Some(Self::Listed(links.into_iter()))
            }
        }
    }

    fn next_url(&mut self) -> Option<String> {
        match self {
            Self::Listed(links) => links.next(),
            Self::Numbered { base, next_page } => {
                let path = if *next_page == 1 {
                    SURVEY_PATH.to_string()
                } else {
                    format!("{}?page={}", SURVEY_PATH, next_page)
                };
                *next_page += 1;
                base.join(&path).ok().map(String::from)
            }
        }
    }
}

/// Collect up to `config.limit` entries from successive listing pages.
///
/// Stops on the first failed fetch, the first page without entries, the
/// entry limit (even mid-page) or the page ceiling. Partial results are
/// always returned.
pub async fn scrape_data<F: Fetch>(
    fetcher: &F,
    config: &ScrapeConfig,
) -> Vec<ApplicationResultEntry> {
    let mut results = Vec::new();
    if config.limit == 0 {
        return results;
    }
    let Some(mut cursor) = PageCursor::open(fetcher, &config.base_url, config.mode).await else {
        warn!("Could not open listing at {}", config.base_url);
        return results;
    };

    let mut pages = 0usize;
    while results.len() < config.limit {
        if config.max_pages.is_some_and(|max| pages >= max) {
            warn!("Reached page ceiling ({} pages), stopping", pages);
            break;
        }
        let Some(url) = cursor.next_url() else {
            break;
        };
        pages += 1;
        info!("[scrape] page {}: fetching {}", pages, url);

        let Some(html) = fetcher.fetch(&url).await else {
            warn!("[scrape] failed to fetch page {}, stopping", pages);
            break;
        };
        let room = config.limit - results.len();
        let entries = extract_entries(fetcher, &html, &url, room).await;
        if entries.is_empty() {
            info!("[scrape] no entries found on page {}, stopping", pages);
            break;
        }
        info!("[scrape] extracted {} entries from page {}", entries.len(), pages);
        results.extend(entries);
    }

    info!(
        "[scrape] collected {} total entries from {} pages",
        results.len(),
        pages
    );
    results
}

/// Parse one listing page and finish at most `room` of its entries, fetching
/// each entry's detail page for notes when it links one.
pub async fn extract_entries<F: Fetch>(
    fetcher: &F,
    html: &str,
    source_url: &str,
    room: usize,
) -> Vec<ApplicationResultEntry> {
    let parsed = parser::parse_rows(html, source_url);
    let mut entries = Vec::with_capacity(parsed.len().min(room));
    for item in parsed.into_iter().take(room) {
        let notes = match item.detail_url.as_deref() {
            Some(url) => fetch_notes(fetcher, url).await,
            None => None,
        };
        entries.push(item.finish(notes));
    }
    entries
}

/// Notes/comments text from an individual result page, if any.
pub async fn fetch_notes<F: Fetch>(fetcher: &F, url: &str) -> Option<String> {
    let html = fetcher.fetch(url).await?;
    parser::extract_notes(&html)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// In-memory site: URL → HTML, recording every request.
    #[derive(Default)]
    pub(crate) struct StubSite {
        pages: HashMap<String, String>,
        pub(crate) requests: Mutex<Vec<String>>,
    }

    impl StubSite {
        pub(crate) fn with(mut self, url: &str, html: String) -> Self {
            self.pages.insert(url.to_string(), html);
            self
        }

        pub(crate) fn requested(&self, url: &str) -> bool {
            self.requests.lock().unwrap().iter().any(|u| u == url)
        }

        /// Two listing pages of four entries each plus one detail page.
        pub(crate) fn two_listing_pages() -> Self {
            let listing = fixture("survey_page.html");
            Self::default()
                .with("https://www.thegradcafe.com/survey/", listing.clone())
                .with("https://www.thegradcafe.com/survey/?page=2", listing)
                .with(
                    "https://www.thegradcafe.com/result/123456",
                    fixture("result_page.html"),
                )
        }
    }

    impl Fetch for StubSite {
        async fn fetch(&self, url: &str) -> Option<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned()
        }
    }

    pub(crate) fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    pub(crate) fn config(limit: usize, mode: PageMode) -> ScrapeConfig {
        ScrapeConfig {
            limit,
            mode,
            delay: Duration::ZERO,
            ..ScrapeConfig::default()
        }
    }

    #[tokio::test]
    async fn stops_on_failed_fetch_with_partial_results() {
        let site = StubSite::two_listing_pages();
        let entries = scrape_data(&site, &config(100, PageMode::Numbered)).await;
        assert_eq!(entries.len(), 8);
        assert!(site.requested("https://www.thegradcafe.com/survey/?page=3"));
        assert!(!site.requested("https://www.thegradcafe.com/survey/?page=4"));
    }

    #[tokio::test]
    async fn truncates_mid_page_at_limit() {
        let site = StubSite::two_listing_pages();
        let entries = scrape_data(&site, &config(6, PageMode::Numbered)).await;
        assert_eq!(entries.len(), 6);
        // Page 3 is never requested once the limit is met.
        assert!(!site.requested("https://www.thegradcafe.com/survey/?page=3"));
    }

    #[tokio::test]
    async fn detail_pages_beyond_limit_are_not_fetched() {
        let site = StubSite::two_listing_pages();
        let entries = scrape_data(&site, &config(1, PageMode::Numbered)).await;
        assert_eq!(entries.len(), 1);
        assert!(site.requested("https://www.thegradcafe.com/result/123456"));
        assert!(!site.requested("https://www.thegradcafe.com/result/123457"));
    }

    #[tokio::test]
    async fn empty_page_ends_the_run() {
        let site = StubSite::two_listing_pages().with(
            "https://www.thegradcafe.com/survey/?page=3",
            "<html><body><p>No results</p></body></html>".into(),
        );
        let entries = scrape_data(&site, &config(100, PageMode::Numbered)).await;
        assert_eq!(entries.len(), 8);
        assert!(!site.requested("https://www.thegradcafe.com/survey/?page=4"));
    }

    #[tokio::test]
    async fn page_ceiling_bounds_the_loop() {
        let site = StubSite::two_listing_pages();
        let cfg = ScrapeConfig {
            max_pages: Some(1),
            ..config(100, PageMode::Numbered)
        };
        let entries = scrape_data(&site, &cfg).await;
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test]
    async fn first_page_failure_is_an_empty_result() {
        let site = StubSite::default();
        let entries = scrape_data(&site, &config(10, PageMode::Numbered)).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn detail_page_notes_take_precedence() {
        let site = StubSite::two_listing_pages();
        let entries = scrape_data(&site, &config(4, PageMode::Numbered)).await;
        assert_eq!(
            entries[0].comments.as_deref(),
            Some("Got a call from my future advisor two weeks before the official email.")
        );
        assert_eq!(entries[0].url, "https://www.thegradcafe.com/result/123456");
        // Detail page unreachable: row comment (none here) is kept.
        assert_eq!(entries[1].comments, None);
        assert_eq!(entries[2].url, "https://www.thegradcafe.com/survey/");
    }

    #[tokio::test]
    async fn discover_mode_visits_index_links() {
        let listing = fixture("survey_page.html");
        let site = StubSite::default()
            .with("https://www.thegradcafe.com/", fixture("index_page.html"))
            .with("https://www.thegradcafe.com/survey/", listing.clone())
            .with(
                "https://www.thegradcafe.com/survey/?institution=stanford",
                listing,
            );
        let entries = scrape_data(&site, &config(100, PageMode::Discover)).await;
        // Third link fails to fetch, which ends the run.
        assert_eq!(entries.len(), 8);
        assert!(site.requested("https://www.thegradcafe.com/survey/?program=Computer+Science"));
    }

    #[tokio::test]
    async fn zero_limit_fetches_nothing() {
        let site = StubSite::two_listing_pages();
        assert!(scrape_data(&site, &config(0, PageMode::Numbered)).await.is_empty());
        assert!(site.requests.lock().unwrap().is_empty());
    }
}
