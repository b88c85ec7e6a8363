//! JSONL record ingestion
//!
//! One record per line: `{"collection": "vitals", "user_id": "u1",
//! "recorded_at": "2026-01-01T08:00:00Z", "data": {...}}`. `recorded_at` is
//! optional and defaults to now. Blank lines are skipped.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use healix_store::{Collection, RecordDb};

#[derive(Debug, Deserialize)]
struct ImportLine {
    collection: String,
    user_id: String,
    #[serde(default)]
    recorded_at: Option<DateTime<Utc>>,
    data: Value,
}

#[derive(Debug)]
pub struct ParsedRecord {
    pub collection: Collection,
    pub user_id: String,
    pub recorded_at: DateTime<Utc>,
    pub data: Value,
}

pub fn parse_line(line: &str) -> Result<ParsedRecord> {
    let raw: ImportLine = serde_json::from_str(line)?;
    let collection: Collection = raw.collection.parse()?;
    if raw.user_id.trim().is_empty() {
        anyhow::bail!("Empty user_id");
    }
    if !raw.data.is_object() {
        anyhow::bail!("'data' must be a JSON object");
    }
    Ok(ParsedRecord {
        collection,
        user_id: raw.user_id,
        recorded_at: raw.recorded_at.unwrap_or_else(Utc::now),
        data: raw.data,
    })
}

/// Insert every record in `path`. Stops at the first bad line.
pub async fn import_file(db: &RecordDb, path: &Path) -> Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut imported = 0;
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_line(line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), idx + 1))?;
        debug!("Importing {} record for {}", record.collection, record.user_id);
        db.insert(
            record.collection,
            &record.user_id,
            record.recorded_at,
            record.data,
        )
        .await?;
        imported += 1;
    }
    Ok(imported)
}
