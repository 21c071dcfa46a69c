use crate::rate_limit::RateLimiter;
use anyhow::Context;
use graph_client::GraphClient;
use m365_core::audit::{AuditEntry, AuditLog};
use m365_core::config::Settings;
use m365_core::db::Database;
use m365_core::teams::TeamsService;
use m365_core::template::TemplateService;
use m365_core::users::UserService;
use m365_core::ResourceClient;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command or tool needs, built once in `main` and passed down.
pub struct AppContext {
    pub settings: Settings,
    pub client: Arc<dyn ResourceClient>,
    pub users: UserService,
    pub teams: TeamsService,
    pub templates: TemplateService,
    audit: Option<AuditLog>,
    limiter: Option<RateLimiter>,
}

impl AppContext {
    pub fn new(settings: Settings, client: Arc<dyn ResourceClient>, db: Database) -> Self {
        let timeout = settings.remote_timeout_secs.map(Duration::from_secs);
        let audit = settings
            .enable_audit_logging
            .then(|| AuditLog::new(db.clone()));
        let limiter = settings
            .rate_limit_enabled
            .then(|| RateLimiter::per_minute(settings.max_requests_per_minute));
        Self {
            users: UserService::new(client.clone()),
            teams: TeamsService::new(client.clone()).with_timeout(timeout),
            templates: TemplateService::new(db, client.clone()),
            settings,
            client,
            audit,
            limiter,
        }
    }

    /// Open the database and build the Graph client. No network traffic.
    pub fn open(settings: Settings) -> anyhow::Result<Self> {
        let client = GraphClient::from_settings(&settings)
            .context("failed to configure Microsoft Graph client")?;
        let db = Database::open(&settings.database_path).with_context(|| {
            format!(
                "failed to open database at {}",
                settings.database_path.display()
            )
        })?;
        Ok(Self::new(settings, Arc::new(client), db))
    }

    /// Count one tool call against the rate limit.
    pub fn admit(&self) -> Result<(), String> {
        match &self.limiter {
            Some(limiter) if !limiter.try_acquire() => Err(format!(
                "rate limit exceeded: at most {} requests per minute",
                limiter.limit()
            )),
            _ => Ok(()),
        }
    }

    #[cfg(test)]
    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    /// Audit failures are logged and otherwise ignored.
    pub fn record(&self, entry: AuditEntry) {
        if let Some(log) = &self.audit {
            if let Err(e) = log.record(&entry) {
                tracing::warn!(operation = %entry.operation, error = %e, "failed to write audit log");
            }
        }
    }
}
