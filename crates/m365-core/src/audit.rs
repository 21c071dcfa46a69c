//! Append-only audit trail of administrative operations.

use crate::db::{now_timestamp, parse_timestamp, Database};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub operation: String,
    pub user_email: Option<String>,
    pub target_resource: Option<String>,
    pub details: Option<String>,
    pub status: AuditStatus,
}

impl AuditEntry {
    pub fn new(operation: impl Into<String>, status: AuditStatus) -> Self {
        Self {
            operation: operation.into(),
            user_email: None,
            target_resource: None,
            details: None,
            status,
        }
    }

    pub fn user(mut self, user_email: Option<String>) -> Self {
        self.user_email = user_email;
        self
    }

    pub fn target(mut self, target: Option<String>) -> Self {
        self.target_resource = target;
        self
    }

    pub fn details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub log_id: i64,
    pub operation: String,
    pub user_email: Option<String>,
    pub target_resource: Option<String>,
    pub details: Option<String>,
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AuditLog {
    db: Database,
}

impl AuditLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.db.lock().execute(
            "INSERT INTO audit_logs
             (operation, user_email, target_resource, details, status, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.operation,
                entry.user_email,
                entry.target_resource,
                entry.details,
                entry.status.as_str(),
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT log_id, operation, user_email, target_resource, details, status, timestamp
             FROM audit_logs ORDER BY log_id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], |row| {
            let ts: Option<String> = row.get(6)?;
            Ok(AuditRecord {
                log_id: row.get(0)?,
                operation: row.get(1)?,
                user_email: row.get(2)?,
                target_resource: row.get(3)?,
                details: row.get(4)?,
                status: row.get(5)?,
                timestamp: ts.as_deref().and_then(parse_timestamp),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_listed_newest_first() {
        let log = AuditLog::new(Database::open_in_memory().unwrap());
        log.record(&AuditEntry::new("create_team", AuditStatus::Success).target(Some("Ops".into())))
            .unwrap();
        log.record(
            &AuditEntry::new("provision_team", AuditStatus::Error)
                .details(Some("create channel 'broken' failed".into())),
        )
        .unwrap();

        let rows = log.recent(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].operation, "provision_team");
        assert_eq!(rows[0].status, "error");
        assert_eq!(rows[1].target_resource.as_deref(), Some("Ops"));
        assert!(rows[1].timestamp.is_some());
        assert_eq!(log.recent(1).unwrap().len(), 1);
    }
}
