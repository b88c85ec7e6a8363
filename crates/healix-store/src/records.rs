//! SQLite record store
//!
//! Records are JSON documents keyed by collection and user. The agent core only
//! ever needs three read shapes ("latest", "since", "count"), which is what the
//! [`RecordStore`] trait exposes. All SQLite work runs on tokio's blocking pool
//! behind a single shared connection, gated by a semaphore so a burst of tool
//! calls cannot queue unbounded blocking work.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default number of store queries allowed on the blocking pool at once
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 4;

/// Record collections the agents read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Profiles,
    Vitals,
    Alerts,
    NutritionPlans,
    NutritionLogs,
    ExercisePlans,
    ExerciseLogs,
    Medications,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Self::Profiles,
        Self::Vitals,
        Self::Alerts,
        Self::NutritionPlans,
        Self::NutritionLogs,
        Self::ExercisePlans,
        Self::ExerciseLogs,
        Self::Medications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Vitals => "vitals",
            Self::Alerts => "alerts",
            Self::NutritionPlans => "nutrition_plans",
            Self::NutritionLogs => "nutrition_logs",
            Self::ExercisePlans => "exercise_plans",
            Self::ExerciseLogs => "exercise_logs",
            Self::Medications => "medications",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| anyhow!("Unknown collection: {}", s))
    }
}

/// A stored record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub collection: Collection,
    pub user_id: String,
    pub recorded_at: DateTime<Utc>,
    pub data: JsonValue,
}

impl Record {
    /// Deserialize the record body into a typed view
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone())
            .with_context(|| format!("Malformed {} record {}", self.collection, self.id))
    }
}

/// Predicate for [`RecordStore::count`]
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Only records at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Top-level JSON fields that must equal the given values
    pub equals: Vec<(String, JsonValue)>,
}

impl RecordFilter {
    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            since: Some(start),
            equals: Vec::new(),
        }
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: JsonValue) -> Self {
        self.equals.push((field.into(), value));
        self
    }
}

/// Read-only query shapes the agent tools depend on
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Most recent record for the user in a collection
    async fn latest(&self, collection: Collection, user_id: &str) -> Result<Option<Record>>;

    /// Up to `limit` most recent records for the user, newest first
    async fn latest_n(
        &self,
        collection: Collection,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Record>>;

    /// Records for the user in `[start, now)`, oldest first
    async fn since(
        &self,
        collection: Collection,
        user_id: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<Record>>;

    /// Number of records for the user matching the filter
    async fn count(&self, collection: Collection, user_id: &str, filter: &RecordFilter)
    -> Result<u64>;
}

/// SQLite-backed record store (thread-safe via Arc<Mutex>)
pub struct RecordDb {
    conn: Arc<Mutex<Connection>>,
    permits: Arc<Semaphore>,
}

impl RecordDb {
    /// Open (or create) the record database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open record database")?;

        info!("Initializing record database at {:?}", path.as_ref());

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                user_id TEXT NOT NULL,
                recorded_at INTEGER NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_lookup
             ON records(collection, user_id, recorded_at)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_QUERIES)),
        })
    }

    /// Bound the number of queries running on the blocking pool at once
    pub fn with_max_concurrent_queries(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Insert a record, returning its ID
    pub async fn insert(
        &self,
        collection: Collection,
        user_id: &str,
        recorded_at: DateTime<Utc>,
        data: JsonValue,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let user_id = user_id.to_owned();
        let body = serde_json::to_string(&data)?;
        let record_id = id.clone();

        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO records (id, collection, user_id, recorded_at, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &record_id,
                    collection.as_str(),
                    &user_id,
                    recorded_at.timestamp_millis(),
                    body,
                ],
            )?;
            debug!("Inserted {} record {} for {}", collection, record_id, user_id);
            Ok(())
        })
        .await?;

        Ok(id)
    }

    /// Run a closure against the connection on the blocking pool.
    ///
    /// Waits for a permit first so concurrent callers share a fixed number of
    /// blocking threads instead of each claiming one.
    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("Record store is shutting down")?;
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Record database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            f(&conn)
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}

#[async_trait]
impl RecordStore for RecordDb {
    async fn latest(&self, collection: Collection, user_id: &str) -> Result<Option<Record>> {
        let user_id = user_id.to_owned();

        self.run_blocking(move |conn| {
            let record = conn
                .query_row(
                    "SELECT id, collection, user_id, recorded_at, data
                     FROM records
                     WHERE collection = ?1 AND user_id = ?2
                     ORDER BY recorded_at DESC, rowid DESC
                     LIMIT 1",
                    params![collection.as_str(), &user_id],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn latest_n(
        &self,
        collection: Collection,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let user_id = user_id.to_owned();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, collection, user_id, recorded_at, data
                 FROM records
                 WHERE collection = ?1 AND user_id = ?2
                 ORDER BY recorded_at DESC, rowid DESC
                 LIMIT ?3",
            )?;
            let records = stmt
                .query_map(params![collection.as_str(), &user_id, limit], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn since(
        &self,
        collection: Collection,
        user_id: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<Record>> {
        let user_id = user_id.to_owned();

        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, collection, user_id, recorded_at, data
                 FROM records
                 WHERE collection = ?1 AND user_id = ?2 AND recorded_at >= ?3
                 ORDER BY recorded_at ASC, rowid ASC",
            )?;
            let records = stmt
                .query_map(
                    params![collection.as_str(), &user_id, start.timestamp_millis()],
                    row_to_record,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(
                "Fetched {} {} records for {} since {}",
                records.len(),
                collection,
                user_id,
                start
            );
            Ok(records)
        })
        .await
    }

    async fn count(
        &self,
        collection: Collection,
        user_id: &str,
        filter: &RecordFilter,
    ) -> Result<u64> {
        let mut sql = String::from(
            "SELECT COUNT(*) FROM records WHERE collection = ?1 AND user_id = ?2",
        );
        let mut args: Vec<SqlValue> = vec![
            SqlValue::Text(collection.as_str().to_string()),
            SqlValue::Text(user_id.to_string()),
        ];

        if let Some(start) = filter.since {
            args.push(SqlValue::Integer(start.timestamp_millis()));
            sql.push_str(&format!(" AND recorded_at >= ?{}", args.len()));
        }

        for (field, value) in &filter.equals {
            if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(anyhow!("Invalid filter field name: {:?}", field));
            }
            args.push(SqlValue::Text(format!("$.{}", field)));
            let path_idx = args.len();
            match json_to_sql(value) {
                Some(v) => {
                    args.push(v);
                    sql.push_str(&format!(
                        " AND json_extract(data, ?{}) = ?{}",
                        path_idx,
                        args.len()
                    ));
                }
                None => {
                    sql.push_str(&format!(" AND json_extract(data, ?{}) IS NULL", path_idx));
                }
            }
        }

        self.run_blocking(move |conn| {
            let count: i64 = conn.query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

fn json_to_sql(value: &JsonValue) -> Option<SqlValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        JsonValue::Number(n) => Some(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        }),
        JsonValue::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let collection: String = row.get(1)?;
    let collection = collection.parse::<Collection>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
    })?;
    let millis: i64 = row.get(3)?;
    let data: String = row.get(4)?;
    let data = serde_json::from_str(&data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Record {
        id: row.get(0)?,
        collection,
        user_id: row.get(2)?,
        recorded_at: Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now),
        data,
    })
}
