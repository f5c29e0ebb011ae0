use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn};

use crate::files::write_entries;
use crate::model::EnrichedEntry;

pub const FLUSH_EVERY: usize = 100;

/// The two fields the service adds; everything else in its reply is ignored.
#[derive(Debug, Deserialize)]
struct StandardizedNames {
    #[serde(rename = "llm-generated-university", default)]
    university: Option<String>,
    #[serde(rename = "llm-generated-program", default)]
    program: Option<String>,
}

/// Client for the external name-standardization service.
pub struct Standardizer {
    client: reqwest::Client,
    api_url: String,
}

impl Standardizer {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Never drops an entry: any failure returns it unchanged.
    pub async fn standardize_entry(&self, record: EnrichedEntry) -> EnrichedEntry {
        match self.request(&record).await {
            Ok(body) => merge_response(record, &body),
            Err(e) => {
                warn!("[llm-api] error calling {}: {}", self.api_url, e);
                record
            }
        }
    }

    async fn request(&self, record: &EnrichedEntry) -> Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&[record])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status.as_u16());
        }
        Ok(response.text().await?)
    }

    /// Standardize every entry not yet carrying standardized names, writing
    /// progress to `output` every `FLUSH_EVERY` entries.
    pub async fn standardize_all(
        &self,
        records: Vec<EnrichedEntry>,
        output: Option<&Path>,
    ) -> Result<Vec<EnrichedEntry>> {
        let total = records.len();
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                .progress_chars("=> "),
        );

        let mut results = Vec::with_capacity(total);
        for (i, record) in records.into_iter().enumerate() {
            let record = if record.is_standardized() {
                record
            } else {
                self.standardize_entry(record).await
            };
            results.push(record);
            pb.inc(1);

            if let Some(path) = output.filter(|_| (i + 1) % FLUSH_EVERY == 0) {
                write_entries(path, &results)?;
            }
        }

        pb.finish_and_clear();
        info!("[standardize] completed {} entries", results.len());
        Ok(results)
    }
}

/// Copy the standardized names from the service reply (a one-element array)
/// onto `original`; a reply of any other shape leaves it untouched.
pub fn merge_response(mut original: EnrichedEntry, body: &str) -> EnrichedEntry {
    let names = match serde_json::from_str::<Vec<StandardizedNames>>(body) {
        Ok(list) => list.into_iter().next(),
        Err(e) => {
            warn!("[llm-api] unexpected reply: {}", e);
            None
        }
    };
    if let Some(names) = names {
        if names.university.is_some() {
            original.llm_generated_university = names.university;
        }
        if names.program.is_some() {
            original.llm_generated_program = names.program;
        }
    }
    original
}

/// Pick up an interrupted run: keep the standardized prefix of `existing`,
/// then continue with the matching tail of `fresh`.
pub fn resume(mut existing: Vec<EnrichedEntry>, fresh: Vec<EnrichedEntry>) -> Vec<EnrichedEntry> {
    let done = existing.iter().take_while(|r| r.is_standardized()).count();
    existing.truncate(done);
    existing.extend(fresh.into_iter().skip(done));
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApplicationResultEntry;

    fn record(university: &str) -> EnrichedEntry {
        EnrichedEntry::from(ApplicationResultEntry {
            university: university.into(),
            program_name: "CS".into(),
            url: "https://www.thegradcafe.com/result/1".into(),
            ..Default::default()
        })
    }

    #[test]
    fn reply_names_are_merged() {
        let body = r#"[{"university":"mit","llm-generated-university":"Massachusetts Institute of Technology","llm-generated-program":"Computer Science"}]"#;
        let merged = merge_response(record("MIT"), body);
        assert_eq!(merged.entry.university, "MIT");
        assert_eq!(
            merged.llm_generated_university.as_deref(),
            Some("Massachusetts Institute of Technology")
        );
        assert_eq!(merged.llm_generated_program.as_deref(), Some("Computer Science"));
    }

    #[test]
    fn odd_replies_leave_entry_unchanged() {
        for body in ["[]", "{}", "not json", r#"{"error":"overloaded"}"#] {
            assert_eq!(merge_response(record("MIT"), body), record("MIT"));
        }
    }

    #[tokio::test]
    async fn transport_error_returns_original() {
        let standardizer = Standardizer::new("http://127.0.0.1:1/standardize").unwrap();
        let out = standardizer.standardize_entry(record("Yale")).await;
        assert_eq!(out, record("Yale"));
    }

    #[tokio::test]
    async fn already_standardized_entries_are_not_sent() {
        let standardizer = Standardizer::new("http://127.0.0.1:1/standardize").unwrap();
        let mut done = record("MIT");
        done.llm_generated_university = Some("Massachusetts Institute of Technology".into());
        let out = standardizer
            .standardize_all(vec![done.clone(), record("Yale")], None)
            .await
            .unwrap();
        assert_eq!(out, vec![done, record("Yale")]);
    }

    #[test]
    fn resume_keeps_standardized_prefix() {
        let mut a = record("A");
        a.llm_generated_program = Some("Computer Science".into());
        let existing = vec![a.clone(), record("B")];
        let fresh = vec![record("A"), record("B"), record("C")];
        let merged = resume(existing, fresh);
        assert_eq!(merged, vec![a, record("B"), record("C")]);
    }
}
