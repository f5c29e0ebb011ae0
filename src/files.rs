use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

/// `.jsonl` paths hold one record per line; anything else is a JSON array.
pub fn is_json_lines(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

pub fn read_entries<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if is_json_lines(path) {
        Ok(parse_json_lines(&text))
    } else {
        parse_json_array(&text).with_context(|| format!("Invalid entry file {}", path.display()))
    }
}

/// Non-array input is a caller error, not an empty result.
pub fn parse_json_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Array(items) = value else {
        bail!("Expected a list of records");
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).with_context(|| format!("Record {} is malformed", i))
        })
        .collect()
}

/// Bad lines are logged and skipped.
pub fn parse_json_lines<T: DeserializeOwned>(text: &str) -> Vec<T> {
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping line {}: {}", n + 1, e),
        }
    }
    records
}

pub fn write_entries<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    if is_json_lines(path) {
        for entry in entries {
            serde_json::to_writer(&mut out, entry)?;
            out.write_all(b"\n")?;
        }
    } else {
        serde_json::to_writer_pretty(&mut out, entries)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    info!("[save] wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}
