//! SQLite database shared by the template store and the audit log.
//!
//! # Tables
//!
//! ```text
//! email_templates  one row per template, unique template_name
//! template_usage   one row per recipient of a template send
//! audit_logs       one row per tool invocation (when enabled)
//! config           key/value server metadata
//! ```
//!
//! Timestamps written by this crate are RFC 3339 UTC strings. Rows written
//! by SQLite's `CURRENT_TIMESTAMP` default (`YYYY-MM-DD HH:MM:SS`) are read
//! back as UTC as well.

use crate::error::Result;
use crate::io::ensure_parent_dir;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS email_templates (
    template_id TEXT PRIMARY KEY,
    template_name TEXT NOT NULL UNIQUE,
    subject TEXT NOT NULL,
    body_html TEXT NOT NULL,
    body_text TEXT,
    category TEXT NOT NULL,
    variables TEXT,
    description TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    version INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS template_usage (
    usage_id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id TEXT NOT NULL,
    sent_by TEXT NOT NULL,
    sent_to TEXT NOT NULL,
    variables_used TEXT,
    sent_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    message_id TEXT,
    FOREIGN KEY (template_id) REFERENCES email_templates(template_id)
);

CREATE TABLE IF NOT EXISTS audit_logs (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL,
    user_email TEXT,
    target_resource TEXT,
    details TEXT,
    status TEXT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_template_category ON email_templates(category);
CREATE INDEX IF NOT EXISTS idx_template_usage_template ON template_usage(template_id);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_logs(timestamp);
";

/// Current time in the format stored by this crate.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp, accepting both RFC 3339 and SQLite's default.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Cloneable handle to one SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at `path` and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a fresh database at `path`. An existing file is replaced only
    /// when `force` is set; returns false if it was left alone.
    pub fn initialize(path: &Path, force: bool, server_version: &str) -> Result<bool> {
        if path.exists() {
            if !force {
                return Ok(false);
            }
            std::fs::remove_file(path)?;
            tracing::info!(path = %path.display(), "existing database deleted");
        }
        let db = Self::open(path)?;
        db.set_config("server_version", server_version)?;
        db.set_config("db_initialized", &now_timestamp())?;
        tracing::info!(path = %path.display(), "database initialized");
        Ok(true)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.lock().execute(
            "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now_timestamp()],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }
}
