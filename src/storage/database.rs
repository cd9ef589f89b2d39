//! SQLite Database
//!
//! Embedded database for agents and completed sessions, using rusqlite with
//! r2d2 connection pooling. Agent ids are matched case-insensitively.

use std::collections::BTreeMap;
use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};

use crate::models::agent::{AgentAnalytics, AgentRecord, AgentSchema, AgentSummary};
use crate::models::interview::CompletedSessionRecord;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::safe_data_file;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Shortest duration counted in the average
const MIN_COUNTED_DURATION_SECS: i64 = 5;
/// Longest duration counted in the average
const MAX_COUNTED_DURATION_SECS: i64 = 7200;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create an in-memory database for testing.
    ///
    /// Uses an in-memory SQLite database with the same schema as the
    /// production database. Useful for integration and unit tests.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open (or create) the database file with connection pooling
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agents (
                agent_id TEXT PRIMARY KEY,
                agent_name TEXT NOT NULL DEFAULT '',
                pdf_path TEXT NOT NULL,
                schema_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS completed_sessions (
                session_id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                answers_json TEXT NOT NULL,
                filled_pdf_path TEXT,
                language_code TEXT NOT NULL DEFAULT 'en-US',
                language_label TEXT NOT NULL DEFAULT '',
                started_at TEXT NOT NULL,
                completed_at TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_completed_sessions_agent
             ON completed_sessions(agent_id)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    // ========================================================================
    // Agent Operations
    // ========================================================================

    /// Insert a new agent
    pub fn insert_agent(&self, agent: &AgentRecord) -> AppResult<()> {
        let conn = self.get_connection()?;
        let schema_json = serde_json::to_string(&agent.schema)?;
        conn.execute(
            "INSERT INTO agents (agent_id, agent_name, pdf_path, schema_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                agent.agent_id,
                agent.agent_name,
                agent.pdf_path,
                schema_json,
                agent.created_at
            ],
        )?;
        Ok(())
    }

    /// Get an agent by id (case-insensitive)
    pub fn get_agent(&self, agent_id: &str) -> AppResult<Option<AgentRecord>> {
        let conn = self.get_connection()?;
        let row = conn
            .query_row(
                "SELECT agent_id, agent_name, pdf_path, schema_json, created_at
                 FROM agents WHERE LOWER(agent_id) = LOWER(?1)",
                params![agent_id],
                agent_row,
            )
            .optional()?;

        row.map(|(agent, schema_json)| with_schema(agent, &schema_json))
            .transpose()
    }

    /// List agents, newest first, with their completed-session counts
    pub fn list_agents(&self, limit: usize) -> AppResult<Vec<AgentSummary>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT a.agent_id, a.agent_name, a.pdf_path, a.schema_json, a.created_at,
                    COUNT(cs.session_id) AS intake_count
             FROM agents AS a
             LEFT JOIN completed_sessions AS cs
                 ON LOWER(cs.agent_id) = LOWER(a.agent_id)
             GROUP BY a.agent_id, a.agent_name, a.pdf_path, a.schema_json, a.created_at
             ORDER BY a.created_at DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let (agent, schema_json) = agent_row(row)?;
                let intake_count: i64 = row.get(5)?;
                Ok((agent, schema_json, intake_count))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(agent, schema_json, intake_count)| {
                let agent = with_schema(agent, &schema_json)?;
                Ok(AgentSummary {
                    field_count: agent.schema.field_count(),
                    share_url: agent.share_url(),
                    intake_count,
                    agent,
                })
            })
            .collect()
    }

    /// Delete an agent with its completed sessions.
    ///
    /// Returns the canonical agent id, the removed session count, and the data
    /// files (source and filled documents) that should be unlinked. Only files
    /// inside `data_root` are returned.
    pub fn delete_agent(
        &self,
        agent_id: &str,
        data_root: &Path,
    ) -> AppResult<Option<(String, usize, Vec<std::path::PathBuf>)>> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let agent: Option<(String, String)> = tx
            .query_row(
                "SELECT agent_id, pdf_path FROM agents WHERE LOWER(agent_id) = LOWER(?1)",
                params![agent_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((canonical_id, pdf_path)) = agent else {
            return Ok(None);
        };

        let session_paths: Vec<Option<String>> = {
            let mut stmt = tx.prepare(
                "SELECT filled_pdf_path FROM completed_sessions
                 WHERE LOWER(agent_id) = LOWER(?1)",
            )?;
            let rows = stmt
                .query_map(params![agent_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        tx.execute(
            "DELETE FROM completed_sessions WHERE LOWER(agent_id) = LOWER(?1)",
            params![agent_id],
        )?;
        tx.execute(
            "DELETE FROM agents WHERE LOWER(agent_id) = LOWER(?1)",
            params![agent_id],
        )?;
        tx.commit()?;

        let files = std::iter::once(Some(pdf_path))
            .chain(session_paths.iter().cloned())
            .flatten()
            .filter_map(|p| safe_data_file(data_root, Path::new(&p)))
            .collect();

        Ok(Some((canonical_id, session_paths.len(), files)))
    }

    // ========================================================================
    // Completed Session Operations
    // ========================================================================

    /// Insert or replace a completed session record
    pub fn save_completed_session(&self, record: &CompletedSessionRecord) -> AppResult<()> {
        let conn = self.get_connection()?;
        let answers_json = serde_json::to_string(&record.answers)?;
        conn.execute(
            "INSERT INTO completed_sessions
                (session_id, agent_id, answers_json, filled_pdf_path, language_code,
                 language_label, started_at, completed_at, duration_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(session_id) DO UPDATE SET
                answers_json = ?3,
                filled_pdf_path = ?4,
                language_code = ?5,
                language_label = ?6,
                started_at = ?7,
                completed_at = ?8,
                duration_seconds = ?9",
            params![
                record.session_id,
                record.agent_id,
                answers_json,
                record.filled_pdf_path,
                record.language_code,
                record.language_label,
                record.started_at,
                record.completed_at,
                record.duration_seconds,
                record.created_at
            ],
        )?;
        Ok(())
    }

    /// Get a completed session by id
    pub fn get_completed_session(&self, session_id: &str) -> AppResult<Option<CompletedSessionRecord>> {
        let conn = self.get_connection()?;
        let row = conn
            .query_row(
                &format!("{} WHERE session_id = ?1", SESSION_SELECT),
                params![session_id],
                session_row,
            )
            .optional()?;

        row.map(|(record, answers_json)| with_answers(record, &answers_json))
            .transpose()
    }

    /// List completed sessions across all agents, newest first
    pub fn list_completed_sessions(&self, limit: usize) -> AppResult<Vec<CompletedSessionRecord>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC LIMIT ?1",
            SESSION_SELECT
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], session_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(record, answers_json)| with_answers(record, &answers_json))
            .collect()
    }

    /// List completed sessions for one agent, newest first
    pub fn list_completed_sessions_by_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> AppResult<Vec<CompletedSessionRecord>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE LOWER(agent_id) = LOWER(?1) ORDER BY created_at DESC LIMIT ?2",
            SESSION_SELECT
        ))?;
        let rows = stmt
            .query_map(params![agent_id, limit as i64], session_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(record, answers_json)| with_answers(record, &answers_json))
            .collect()
    }

    /// Completion statistics for one agent
    pub fn agent_analytics(&self, agent_id: &str) -> AppResult<Option<AgentAnalytics>> {
        let Some(agent) = self.get_agent(agent_id)? else {
            return Ok(None);
        };

        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT duration_seconds FROM completed_sessions WHERE LOWER(agent_id) = LOWER(?1)",
        )?;
        let durations = stmt
            .query_map(params![agent_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(AgentAnalytics {
            completed_sessions: durations.len(),
            total_fields: agent.schema.field_count(),
            avg_duration: format_average_duration(&durations),
        }))
    }
}

const SESSION_SELECT: &str = "SELECT session_id, agent_id, answers_json, filled_pdf_path,
        language_code, language_label, started_at, completed_at, duration_seconds, created_at
    FROM completed_sessions";

fn agent_row(row: &Row<'_>) -> rusqlite::Result<(AgentRecord, String)> {
    Ok((
        AgentRecord {
            agent_id: row.get(0)?,
            agent_name: row.get(1)?,
            pdf_path: row.get(2)?,
            schema: AgentSchema::default(),
            created_at: row.get(4)?,
        },
        row.get(3)?,
    ))
}

fn with_schema(mut agent: AgentRecord, schema_json: &str) -> AppResult<AgentRecord> {
    agent.schema = serde_json::from_str(schema_json)?;
    Ok(agent)
}

fn session_row(row: &Row<'_>) -> rusqlite::Result<(CompletedSessionRecord, String)> {
    Ok((
        CompletedSessionRecord {
            session_id: row.get(0)?,
            agent_id: row.get(1)?,
            answers: BTreeMap::new(),
            filled_pdf_path: row.get(3)?,
            language_code: row.get(4)?,
            language_label: row.get(5)?,
            started_at: row.get(6)?,
            completed_at: row.get(7)?,
            duration_seconds: row.get(8)?,
            created_at: row.get(9)?,
        },
        row.get(2)?,
    ))
}

fn with_answers(
    mut record: CompletedSessionRecord,
    answers_json: &str,
) -> AppResult<CompletedSessionRecord> {
    record.answers = serde_json::from_str(answers_json)?;
    Ok(record)
}

/// Average of durations strictly between 5 s and 2 h as `"{m}m {s}s"`,
/// or `"N/A"` when none qualify.
pub fn format_average_duration(durations: &[i64]) -> String {
    let counted: Vec<i64> = durations
        .iter()
        .copied()
        .filter(|d| *d > MIN_COUNTED_DURATION_SECS && *d < MAX_COUNTED_DURATION_SECS)
        .collect();
    if counted.is_empty() {
        return "N/A".to_string();
    }
    let avg = counted.iter().sum::<i64>() as f64 / counted.len() as f64;
    let minutes = (avg / 60.0).floor() as i64;
    let seconds = (avg % 60.0).floor() as i64;
    format!("{}m {}s", minutes, seconds)
}
