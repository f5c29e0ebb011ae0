use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::clean::clean_entries;
use crate::config::ScrapeConfig;
use crate::db::{self, LoadStats};
use crate::fetch::Fetch;
use crate::gate::BusyGate;
use crate::model::EnrichedEntry;
use crate::pipeline;

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, PartialEq)]
pub enum RunOutcome<T> {
    /// Another run holds the gate; nothing was started.
    Busy,
    TimedOut,
    Finished(T),
}

#[derive(Debug, PartialEq, Eq)]
pub enum PullOutcome {
    NothingNew,
    Loaded(LoadStats),
}

/// Schedules long operations: at most one at a time, each under a timeout.
pub struct Runner<F> {
    gate: BusyGate,
    fetcher: F,
    timeout: Duration,
}

impl<F: Fetch> Runner<F> {
    pub fn new(gate: BusyGate, fetcher: F, timeout: Duration) -> Self {
        Self {
            gate,
            fetcher,
            timeout,
        }
    }

    pub fn gate(&self) -> &BusyGate {
        &self.gate
    }

    /// Run `work` holding the gate. The gate is released however `work` ends,
    /// including when the timeout drops it.
    pub async fn run_exclusive<T, Fut>(&self, work: Fut) -> RunOutcome<T>
    where
        Fut: Future<Output = T>,
    {
        let Some(_guard) = self.gate.try_acquire() else {
            warn!("Another operation is already in progress");
            return RunOutcome::Busy;
        };
        match tokio::time::timeout(self.timeout, work).await {
            Ok(value) => RunOutcome::Finished(value),
            Err(_) => {
                warn!("Operation timed out after {:.0}s", self.timeout.as_secs_f64());
                RunOutcome::TimedOut
            }
        }
    }

    /// Scrape, clean, and load new entries into `conn`.
    pub async fn pull_data(
        &self,
        conn: &Connection,
        config: &ScrapeConfig,
    ) -> RunOutcome<Result<PullOutcome>> {
        self.run_exclusive(self.pull_once(conn, config)).await
    }

    async fn pull_once(&self, conn: &Connection, config: &ScrapeConfig) -> Result<PullOutcome> {
        let scraped = pipeline::scrape_data(&self.fetcher, config).await;
        if scraped.is_empty() {
            info!("[pull-data] no entries found");
            return Ok(PullOutcome::NothingNew);
        }
        let records = clean_entries(scraped.into_iter().map(EnrichedEntry::from).collect());
        let stats = db::load_entries(conn, &records)?;
        info!(
            "[pull-data] completed: {} inserted, {} skipped",
            stats.inserted, stats.skipped
        );
        Ok(PullOutcome::Loaded(stats))
    }
}
