//! SQLite persistence for email templates and their usage log.

use crate::db::{now_timestamp, parse_timestamp, Database};
use crate::error::{AdminError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailTemplate {
    pub template_id: String,
    pub template_name: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
    pub category: String,
    pub variables: Vec<String>,
    pub description: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection, without bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    pub template_id: String,
    pub template_name: String,
    pub subject: String,
    pub category: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTemplate {
    pub template_name: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
    pub category: String,
    pub variables: Vec<String>,
    pub description: Option<String>,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateUpdate {
    pub subject: Option<String>,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
    pub category: Option<String>,
    pub variables: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub usage_count: i64,
    pub first_used: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

const TEMPLATE_COLUMNS: &str = "template_id, template_name, subject, body_html, body_text, \
     category, variables, description, version, created_at, updated_at";

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unparseable timestamp '{raw}'").into(),
        )
    })
}

fn variables_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Vec::new()),
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
        }),
    }
}

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<EmailTemplate> {
    Ok(EmailTemplate {
        template_id: row.get(0)?,
        template_name: row.get(1)?,
        subject: row.get(2)?,
        body_html: row.get(3)?,
        body_text: row.get(4)?,
        category: row.get(5)?,
        variables: variables_column(row, 6)?,
        description: row.get(7)?,
        version: row.get(8)?,
        created_at: timestamp_column(row, 9)?,
        updated_at: timestamp_column(row, 10)?,
    })
}

fn variables_json(variables: &[String]) -> Result<Option<String>> {
    if variables.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(variables)?))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

#[derive(Clone)]
pub struct TemplateStore {
    db: Database,
}

impl TemplateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a template as given. Callers sanitize and validate first.
    pub fn insert(&self, template: &NewTemplate) -> Result<EmailTemplate> {
        let template_id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let inserted = self.db.lock().execute(
            "INSERT INTO email_templates
             (template_id, template_name, subject, body_html, body_text,
              category, variables, description, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
            params![
                template_id,
                template.template_name,
                template.subject,
                template.body_html,
                template.body_text,
                template.category,
                variables_json(&template.variables)?,
                template.description,
                now,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AdminError::TemplateExists(template.template_name.clone()))
            }
            Err(e) => return Err(e.into()),
        }
        self.get_by_id(&template_id)?
            .ok_or(AdminError::TemplateNotFound(template_id))
    }

    pub fn get_by_id(&self, template_id: &str) -> Result<Option<EmailTemplate>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE template_id = ?1");
        Ok(self
            .db
            .lock()
            .query_row(&sql, [template_id], template_from_row)
            .optional()?)
    }

    pub fn get_by_name(&self, template_name: &str) -> Result<Option<EmailTemplate>> {
        let sql =
            format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE template_name = ?1");
        Ok(self
            .db
            .lock()
            .query_row(&sql, [template_name], template_from_row)
            .optional()?)
    }

    /// Templates ordered by name, optionally restricted to one category.
    pub fn list(&self, category: Option<&str>, limit: usize) -> Result<Vec<TemplateSummary>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT template_id, template_name, subject, category, description, created_at, version
             FROM email_templates
             WHERE (?1 IS NULL OR category = ?1)
             ORDER BY template_name
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![category, limit], |row| {
            Ok(TemplateSummary {
                template_id: row.get(0)?,
                template_name: row.get(1)?,
                subject: row.get(2)?,
                category: row.get(3)?,
                description: row.get(4)?,
                created_at: timestamp_column(row, 5)?,
                version: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Apply `update`, bump the version and refresh `updated_at`.
    pub fn update(&self, template_id: &str, update: &TemplateUpdate) -> Result<EmailTemplate> {
        let variables = match &update.variables {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        let changed = self.db.lock().execute(
            "UPDATE email_templates SET
                subject = COALESCE(?2, subject),
                body_html = COALESCE(?3, body_html),
                body_text = COALESCE(?4, body_text),
                category = COALESCE(?5, category),
                variables = COALESCE(?6, variables),
                description = COALESCE(?7, description),
                version = version + 1,
                updated_at = ?8
             WHERE template_id = ?1",
            params![
                template_id,
                update.subject,
                update.body_html,
                update.body_text,
                update.category,
                variables,
                update.description,
                now_timestamp(),
            ],
        )?;
        if changed == 0 {
            return Err(AdminError::TemplateNotFound(template_id.to_string()));
        }
        self.get_by_id(template_id)?
            .ok_or_else(|| AdminError::TemplateNotFound(template_id.to_string()))
    }

    /// Returns false when no template had this id.
    pub fn delete(&self, template_id: &str) -> Result<bool> {
        let removed = self
            .db
            .lock()
            .execute("DELETE FROM email_templates WHERE template_id = ?1", [template_id])?;
        Ok(removed > 0)
    }

    pub fn log_usage(
        &self,
        template_id: &str,
        sent_by: &str,
        sent_to: &str,
        variables_used: Option<&serde_json::Value>,
        message_id: Option<&str>,
    ) -> Result<()> {
        let variables = match variables_used {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        self.db.lock().execute(
            "INSERT INTO template_usage
             (template_id, sent_by, sent_to, variables_used, sent_at, message_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![template_id, sent_by, sent_to, variables, now_timestamp(), message_id],
        )?;
        Ok(())
    }

    pub fn usage_stats(&self, template_id: &str) -> Result<UsageStats> {
        let (count, first, last): (i64, Option<String>, Option<String>) =
            self.db.lock().query_row(
                "SELECT COUNT(*), MIN(sent_at), MAX(sent_at)
                 FROM template_usage WHERE template_id = ?1",
                [template_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
        Ok(UsageStats {
            usage_count: count,
            first_used: first.as_deref().and_then(parse_timestamp),
            last_used: last.as_deref().and_then(parse_timestamp),
        })
    }
}
