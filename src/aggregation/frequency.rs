// src/aggregation/frequency.rs - Raw-name frequency table from the scraped corpus
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::storage::{raw_lines, JsonlStore, OrderedTable};
use crate::utils::progress_bars::logging::ResolutionLogger;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationSummary {
    pub records: usize,
    pub unreadable_lines: usize,
    /// Records whose `university` field was missing, null or not text.
    pub records_without_names: usize,
    pub distinct_names: usize,
    pub total_mentions: u64,
}

/// Counts every raw name across `records`. The table is ordered by
/// descending count; ties keep first-seen order.
pub fn aggregate_records<I>(records: I) -> (OrderedTable<u64>, AggregationSummary)
where
    I: IntoIterator<Item = Value>,
{
    let mut counts: OrderedTable<u64> = OrderedTable::new();
    let mut summary = AggregationSummary::default();

    for record in records {
        summary.records += 1;
        let names = university_names(&record);
        if names.is_empty() {
            summary.records_without_names += 1;
            continue;
        }
        for name in names {
            *counts.get_or_insert_with(name, || 0) += 1;
            summary.total_mentions += 1;
        }
    }

    let mut ranked: Vec<(String, u64)> = counts
        .iter()
        .map(|(name, count)| (name.to_string(), *count))
        .collect();
    // stable: equal counts stay in first-seen order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    summary.distinct_names = ranked.len();
    (ranked.into_iter().collect(), summary)
}

/// Trimmed, non-empty names of one record. `university` may be a list of
/// names or a single name.
fn university_names(record: &Value) -> Vec<&str> {
    let names: Vec<&str> = match record.get("university") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item.as_str() {
                Some(s) => Some(s),
                None => {
                    debug!("Ignoring non-text university entry: {}", item);
                    None
                }
            })
            .collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            debug!("Ignoring malformed university field: {}", other);
            Vec::new()
        }
    };
    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Streams the JSONL corpus at `corpus_path`, writes the frequency table to
/// `frequency_path` and returns what was seen. Unreadable lines are skipped.
/// A missing or empty corpus produces an empty table.
pub fn collect_raw_names(corpus_path: &Path, frequency_path: &Path) -> Result<AggregationSummary> {
    let logger = ResolutionLogger::aggregation();
    logger.log_phase("Reading corpus", Some(&corpus_path.display().to_string()));

    let mut unreadable_lines = 0usize;
    let records: Vec<Value> = match File::open(corpus_path) {
        Ok(file) => {
            let mut records = Vec::new();
            for (line_no, line) in raw_lines(BufReader::new(file)).enumerate() {
                let line = match line {
                    Ok(Ok(line)) => line,
                    Ok(Err(e)) => {
                        unreadable_lines += 1;
                        warn!("Skipping undecodable line {} in {}: {}", line_no + 1, corpus_path.display(), e);
                        continue;
                    }
                    Err(e) => {
                        error!("Failed to read {} at line {}: {}", corpus_path.display(), line_no + 1, e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        unreadable_lines += 1;
                        warn!("Skipping invalid line {} in {}: {}", line_no + 1, corpus_path.display(), e);
                    }
                }
            }
            records
        }
        Err(e) => {
            error!("Failed to open corpus {}: {}", corpus_path.display(), e);
            Vec::new()
        }
    };

    let (table, mut summary) = aggregate_records(records);
    summary.unreadable_lines = unreadable_lines;

    if summary.records == 0 {
        error!(
            "Corpus is empty or could not be loaded: {}",
            corpus_path.display()
        );
    }
    if summary.records_without_names > 0 {
        warn!(
            "{} records had no usable university field",
            summary.records_without_names
        );
    }
    info!(
        "{} raw names collected ({} mentions across {} records)",
        summary.distinct_names, summary.total_mentions, summary.records
    );

    logger.log_phase("Writing frequency table", Some(&frequency_path.display().to_string()));
    JsonlStore::new(frequency_path)
        .save(&table)
        .context("Failed to write frequency table")?;
    Ok(summary)
}
