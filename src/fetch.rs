use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::config::{REQUEST_TIMEOUT_SECS, USER_AGENT};

/// Source of raw HTML. `None` means the fetch failed; callers treat it as
/// "nothing here" rather than an error.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Plain GET with a fixed client header, followed by a politeness pause.
pub struct PageFetcher {
    client: reqwest::Client,
    delay: Duration,
}

impl PageFetcher {
    pub fn new(delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, delay })
    }

    async fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("status {}", status.as_u16());
        }
        let body = response.bytes().await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl Fetch for PageFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let result = self.get(url).await;
        // Applies after every request, failed or not.
        tokio::time::sleep(self.delay).await;
        match result {
            Ok(html) => {
                debug!("Fetched {} ({} bytes)", url, html.len());
                Some(html)
            }
            Err(e) => {
                warn!("[http] {} for {}", e, url);
                None
            }
        }
    }
}
