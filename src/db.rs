//! Session store for oracle answers
//!
//! Every answered question is checkpointed right after its round trip, so
//! an interrupted exploration resumes without asking again. SQLite, single
//! file, works offline.

use crate::types::CostLedger;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A previously answered question
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnswer {
    pub answer: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub dollars: f64,
}

/// Per-agent summary of what the store holds
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub agent: String,
    pub answers: u64,
    pub spend: CostLedger,
    pub last_answered: Option<String>,
}

pub struct SessionStore {
    conn: Connection,
}

const SCHEMA: &str = r#"
-- Answers: one row per (agent, rendered prompt)
CREATE TABLE IF NOT EXISTS answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent TEXT NOT NULL,
    prompt_hash TEXT NOT NULL,
    prompt TEXT NOT NULL,
    answer TEXT NOT NULL,
    input_tokens INTEGER DEFAULT 0,
    output_tokens INTEGER DEFAULT 0,
    dollars REAL DEFAULT 0.0,
    created_at TEXT NOT NULL,
    UNIQUE(agent, prompt_hash)
);

CREATE INDEX IF NOT EXISTS idx_answers_agent ON answers(agent);
"#;

/// SHA-256 hex fingerprint of a rendered prompt
pub fn fingerprint(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

impl SessionStore {
    /// Open (creating if needed) the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open session store at {:?}", path))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Stored answer of `agent` to `prompt`, if any
    pub fn lookup(&self, agent: &str, prompt: &str) -> Result<Option<StoredAnswer>> {
        let answer = self
            .conn
            .query_row(
                "SELECT answer, input_tokens, output_tokens, dollars
                 FROM answers WHERE agent = ?1 AND prompt_hash = ?2",
                params![agent, fingerprint(prompt)],
                |row| {
                    Ok(StoredAnswer {
                        answer: row.get(0)?,
                        input_tokens: row.get::<_, i64>(1)? as u64,
                        output_tokens: row.get::<_, i64>(2)? as u64,
                        dollars: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(answer)
    }

    /// Persist one answered round trip
    pub fn checkpoint(&self, agent: &str, prompt: &str, answer: &StoredAnswer) -> Result<()> {
        self.conn.execute(
            "INSERT INTO answers
                (agent, prompt_hash, prompt, answer, input_tokens, output_tokens, dollars, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(agent, prompt_hash) DO UPDATE SET
                answer = excluded.answer,
                input_tokens = excluded.input_tokens,
                output_tokens = excluded.output_tokens,
                dollars = excluded.dollars,
                created_at = excluded.created_at",
            params![
                agent,
                fingerprint(prompt),
                prompt,
                answer.answer,
                answer.input_tokens as i64,
                answer.output_tokens as i64,
                answer.dollars,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Drop every answer of `agent`, forcing fresh questions next run
    pub fn forget(&self, agent: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM answers WHERE agent = ?1", params![agent])?;
        Ok(removed)
    }

    pub fn summaries(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT agent, COUNT(*), SUM(input_tokens), SUM(output_tokens), SUM(dollars), MAX(created_at)
             FROM answers GROUP BY agent ORDER BY agent",
        )?;

        let rows = stmt.query_map([], |row| {
            let answers = row.get::<_, i64>(1)? as u64;
            Ok(SessionSummary {
                agent: row.get(0)?,
                answers,
                spend: CostLedger {
                    calls: answers as u32,
                    cached: 0,
                    input_tokens: row.get::<_, i64>(2)? as u64,
                    output_tokens: row.get::<_, i64>(3)? as u64,
                    dollars: row.get(4)?,
                },
                last_answered: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Release the connection, surfacing any close error
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close session store")
    }
}
