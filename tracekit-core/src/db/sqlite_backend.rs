//! SQLite report history
//!
//! Reports of every project share one database file. Each row keeps the
//! full `StoredReport` as JSON next to the columns used for lookups.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::traits::ReportStore;
use crate::report::{Report, StoredReport};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    project TEXT NOT NULL,
    generated_at TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_project ON reports(project, stored_at);
";

/// SQLite-backed `ReportStore`
pub struct SqliteReportStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
    /// Opens the database, creating the file and schema if needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open report database: {:?}", path))?;

        // WAL lets readers proceed while a report is being written
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self {
            path,
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Report database connection poisoned: {:?}", self.path))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(SCHEMA)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        } else if current_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Report database schema version {} is not supported, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }
        Ok(())
    }

    fn from_json(json: &str) -> Result<StoredReport> {
        serde_json::from_str(json).context("Failed to deserialize stored report")
    }
}

impl ReportStore for SqliteReportStore {
    fn save_report(&self, report: &Report) -> Result<StoredReport> {
        let stored = StoredReport::new(report.clone());
        let body = serde_json::to_string(&stored).context("Failed to serialize report")?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reports (id, project, generated_at, stored_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stored.id.to_string(),
                report.project,
                report.generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                // Fixed-width UTC timestamps sort chronologically as text
                stored.stored_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                body,
            ],
        )?;
        debug!(project = %report.project, report_id = %stored.id, "Inserted report row");
        Ok(stored)
    }

    fn list_reports(&self, project: &str) -> Result<Vec<StoredReport>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT body FROM reports WHERE project = ?1 ORDER BY stored_at DESC, rowid DESC",
        )?;
        let bodies = stmt
            .query_map(params![project], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        bodies.iter().map(|body| Self::from_json(body)).collect()
    }

    fn get_report(&self, id: &Uuid) -> Result<Option<StoredReport>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM reports WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        body.as_deref().map(Self::from_json).transpose()
    }
}
