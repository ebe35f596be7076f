//! SQLite-backed report store.
//!
//! One table, append-once: a report row is written exactly once per
//! successful orchestration run and never mutated afterwards. The
//! presentation layer only ever reads.
//!
//! rusqlite is synchronous, so async callers go through `spawn_blocking`
//! with the connection behind a mutex — a single short INSERT or SELECT per
//! run, no contention worth pooling for.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::report::{DiagnosisReport, StoredReport};

/// Schema version stored in `PRAGMA user_version`.
/// Increment when the DDL changes; add a migration path in `open`.
const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct ReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReportStore {
    /// Open (or create) the report database at `db_path` and ensure the
    /// schema is current.
    ///
    /// Pragmas applied:
    /// - `journal_mode = WAL` — allows concurrent readers alongside a writer.
    /// - `busy_timeout = 5000` — wait up to 5 s before returning `SQLITE_BUSY`.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("open {}: {e}", db_path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Storage(format!("set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Storage(format!("set busy_timeout: {e}")))?;

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| AppError::Storage(format!("read user_version: {e}")))?;

        if version < SCHEMA_VERSION {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS reports (
                    id TEXT PRIMARY KEY,
                    patient_id TEXT NOT NULL,
                    analyses TEXT NOT NULL,
                    final_diagnosis TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;
                ",
            )
            .map_err(|e| AppError::Storage(format!("initialize schema: {e}")))?;
            debug!(path = %db_path.display(), "report schema initialized");
        }

        info!(path = %db_path.display(), "report store opened");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Persist a composed report, assigning and returning its durable id.
    /// Fire-once: the caller never retries a failed write.
    pub async fn persist(&self, report: DiagnosisReport) -> Result<String, AppError> {
        let conn = Arc::clone(&self.conn);
        let id = Uuid::new_v4().to_string();
        let row_id = id.clone();

        tokio::task::spawn_blocking(move || {
            let analyses = serde_json::to_string(&report.analyses)
                .map_err(|e| AppError::Storage(format!("serialize analyses: {e}")))?;
            let created_at = report.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);

            let conn = conn
                .lock()
                .map_err(|_| AppError::Storage("report store mutex poisoned".into()))?;
            conn.execute(
                "INSERT INTO reports (id, patient_id, analyses, final_diagnosis, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row_id, report.patient_id, analyses, report.final_diagnosis, created_at],
            )
            .map_err(|e| AppError::Storage(format!("insert report: {e}")))?;
            Ok::<_, AppError>(())
        })
        .await
        .map_err(|e| AppError::Storage(format!("persist task failed: {e}")))??;

        debug!(report_id = %id, "report persisted");
        Ok(id)
    }

    /// Number of persisted reports. Surfaced by the health probe.
    pub async fn count(&self) -> Result<u64, AppError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| AppError::Storage("report store mutex poisoned".into()))?;
            conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get::<_, u64>(0))
                .map_err(|e| AppError::Storage(format!("count reports: {e}")))
        })
        .await
        .map_err(|e| AppError::Storage(format!("count task failed: {e}")))?
    }

    /// Fetch a stored report by id. `None` when no such report exists.
    pub async fn fetch(&self, id: &str) -> Result<Option<StoredReport>, AppError> {
        let conn = Arc::clone(&self.conn);
        let id = id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| AppError::Storage("report store mutex poisoned".into()))?;
            let row = conn
                .query_row(
                    "SELECT id, patient_id, analyses, final_diagnosis, created_at
                     FROM reports WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| AppError::Storage(format!("select report: {e}")))?;

            let Some((id, patient_id, analyses, final_diagnosis, created_at)) = row else {
                return Ok(None);
            };

            let analyses: BTreeMap<String, String> = serde_json::from_str(&analyses)
                .map_err(|e| AppError::Storage(format!("parse analyses for {id}: {e}")))?;
            let created_at = created_at
                .parse::<DateTime<Utc>>()
                .map_err(|e| AppError::Storage(format!("parse created_at for {id}: {e}")))?;

            Ok(Some(StoredReport {
                id,
                report: DiagnosisReport { patient_id, analyses, final_diagnosis, created_at },
            }))
        })
        .await
        .map_err(|e| AppError::Storage(format!("fetch task failed: {e}")))?
    }
}
