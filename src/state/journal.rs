//! SQLite journal of completed wake cycles, with WAL mode and migrations.

use crate::state::schema;
use crate::types::{ActionKind, CycleReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

/// A journaled cycle as read back for display.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub id: String,
    pub cycle_index: u64,
    pub health_score: u8,
    pub chosen: String,
    pub recorded: String,
    pub description: String,
    pub summary: String,
    pub success: bool,
    pub finished_at: DateTime<Utc>,
}

/// Append-only history of wake cycles.
pub struct CycleJournal {
    conn: Connection,
}

impl CycleJournal {
    /// Open (or create) the journal at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open cycle journal")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut journal = Self { conn };
        journal.migrate()?;
        Ok(journal)
    }

    /// Open an in-memory journal (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut journal = Self { conn };
        journal.migrate()?;
        Ok(journal)
    }

    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating journal schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create journal schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else if version < schema::SCHEMA_VERSION {
            if version < 2 {
                info!("Migrating journal v1 -> v2");
                self.conn.execute_batch(schema::MIGRATE_V1_TO_V2)?;
            }
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    /// Current schema version (0 if uninitialized).
    fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Record a finished cycle.
    pub fn append(&self, report: &CycleReport) -> Result<()> {
        let id = ulid::Ulid::new().to_string();
        self.conn.execute(
            "INSERT INTO cycles (id, cycle_index, health_score, chosen, recorded, description, summary, success, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                report.cycle_index as i64,
                report.health_score,
                report.chosen.to_string(),
                report.recorded.to_string(),
                report.description,
                report.summary,
                report.success as i32,
                report.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Total number of journaled cycles.
    pub fn count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cycles", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count journaled cycles that recorded the given action.
    pub fn count_recorded(&self, action: ActionKind) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cycles WHERE recorded = ?1",
            params![action.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent cycles, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, cycle_index, health_score, chosen, recorded, description, summary, success, finished_at
             FROM cycles ORDER BY cycle_index DESC, finished_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(JournalEntry {
                id: row.get(0)?,
                cycle_index: row.get::<_, i64>(1)? as u64,
                health_score: row.get(2)?,
                chosen: row.get(3)?,
                recorded: row.get(4)?,
                description: row.get(5)?,
                summary: row.get(6)?,
                success: row.get::<_, i32>(7)? != 0,
                finished_at: row.get::<_, String>(8).map(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|d| d.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now())
                })?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
