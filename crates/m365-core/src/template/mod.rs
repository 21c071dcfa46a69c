//! Email templates: storage, rendering and sending.
//!
//! Stored HTML is sanitized on every write, and every text field is syntax
//! checked before it reaches the database, so a stored template always
//! renders.

pub mod render;
pub mod samples;
pub mod store;

pub use render::Template;
pub use store::{EmailTemplate, NewTemplate, TemplateStore, TemplateSummary, TemplateUpdate, UsageStats};

use crate::db::Database;
use crate::directory::{OutgoingMail, ResourceClient};
use crate::error::{AdminError, Result};
use crate::sanitize::sanitize_html;
use crate::validation::{require_non_empty, validate_email};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Identifiers shaped like a UUID are looked up by id first.
fn looks_like_id(identifier: &str) -> bool {
    identifier.len() == 36 && identifier.matches('-').count() == 4
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendRequest {
    pub template: String,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub variables: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendReceipt {
    pub template_id: String,
    pub template_name: String,
    pub recipients: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateStats {
    pub template_id: String,
    pub template_name: String,
    pub usage_count: i64,
    pub first_used: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct TemplateService {
    store: TemplateStore,
    client: Arc<dyn ResourceClient>,
}

impl TemplateService {
    pub fn new(db: Database, client: Arc<dyn ResourceClient>) -> Self {
        Self {
            store: TemplateStore::new(db),
            client,
        }
    }

    pub fn create_template(&self, template: NewTemplate) -> Result<EmailTemplate> {
        require_non_empty("templateName", &template.template_name)?;
        require_non_empty("subject", &template.subject)?;
        require_non_empty("bodyHtml", &template.body_html)?;
        require_non_empty("category", &template.category)?;
        render::validate_syntax(&template.subject)?;
        render::validate_syntax(&template.body_html)?;
        if let Some(text) = &template.body_text {
            render::validate_syntax(text)?;
        }
        tracing::info!(template = %template.template_name, "creating email template");

        let template = NewTemplate {
            body_html: sanitize_html(&template.body_html, false),
            ..template
        };
        let created = self.store.insert(&template)?;
        tracing::info!(template_id = %created.template_id, "template created");
        Ok(created)
    }

    /// Look a template up by id (when `identifier` is UUID-shaped) or name.
    pub fn get_template(&self, identifier: &str) -> Result<EmailTemplate> {
        let identifier = require_non_empty("templateId", identifier)?;
        tracing::debug!(template = %identifier, "retrieving template");
        if looks_like_id(identifier) {
            if let Some(t) = self.store.get_by_id(identifier)? {
                return Ok(t);
            }
        }
        self.store
            .get_by_name(identifier)?
            .ok_or_else(|| AdminError::TemplateNotFound(identifier.to_string()))
    }

    pub fn list_templates(
        &self,
        category: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<TemplateSummary>> {
        tracing::info!(category = ?category, max_results, "listing templates");
        self.store.list(category, max_results)
    }

    pub fn update_template(&self, identifier: &str, update: TemplateUpdate) -> Result<EmailTemplate> {
        let existing = self.get_template(identifier)?;
        for text in [&update.subject, &update.body_html, &update.body_text]
            .into_iter()
            .flatten()
        {
            render::validate_syntax(text)?;
        }
        tracing::info!(template_id = %existing.template_id, "updating template");

        let update = TemplateUpdate {
            body_html: update.body_html.map(|html| sanitize_html(&html, false)),
            ..update
        };
        let updated = self.store.update(&existing.template_id, &update)?;
        tracing::info!(template_id = %updated.template_id, version = updated.version, "template updated");
        Ok(updated)
    }

    /// Remove a template, returning what was deleted.
    pub fn delete_template(&self, identifier: &str) -> Result<EmailTemplate> {
        let existing = self.get_template(identifier)?;
        if !self.store.delete(&existing.template_id)? {
            return Err(AdminError::TemplateNotFound(identifier.to_string()));
        }
        tracing::info!(template_id = %existing.template_id, "template deleted");
        Ok(existing)
    }

    /// Render a stored template and send it from `request.from`. One usage
    /// row is logged per `to` recipient after the send succeeds.
    pub async fn send_from_template(&self, request: &SendRequest) -> Result<SendReceipt> {
        validate_email(&request.from)?;
        if request.to.is_empty() {
            return Err(AdminError::MissingField("toEmails".into()));
        }
        for email in request.to.iter().chain(&request.cc).chain(&request.bcc) {
            validate_email(email)?;
        }

        let template = self.get_template(&request.template)?;
        tracing::info!(template_id = %template.template_id, "sending email from template");

        let mail = OutgoingMail {
            subject: render::render(&template.subject, &request.variables)?,
            html_body: render::render(&template.body_html, &request.variables)?,
            to: request.to.clone(),
            cc: request.cc.clone(),
            bcc: request.bcc.clone(),
            save_to_sent_items: true,
        };
        self.client
            .send_mail(&request.from, &mail)
            .await
            .map_err(|e| AdminError::remote(format!("send mail as {}", request.from), e))?;

        let variables = (!request.variables.is_empty()).then(|| Value::Object(request.variables.clone()));
        for recipient in &request.to {
            self.store.log_usage(
                &template.template_id,
                &request.from,
                recipient,
                variables.as_ref(),
                None,
            )?;
        }
        tracing::info!(
            template_id = %template.template_id,
            recipients = request.to.len(),
            "email sent from template"
        );

        Ok(SendReceipt {
            template_id: template.template_id,
            template_name: template.template_name,
            recipients: request.to.len(),
        })
    }

    pub fn get_template_stats(&self, identifier: &str) -> Result<TemplateStats> {
        let template = self.get_template(identifier)?;
        let stats = self.store.usage_stats(&template.template_id)?;
        Ok(TemplateStats {
            template_id: template.template_id,
            template_name: template.template_name,
            usage_count: stats.usage_count,
            first_used: stats.first_used,
            last_used: stats.last_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;
    use serde_json::json;

    fn service() -> (Arc<FakeDirectory>, TemplateService) {
        let fake = Arc::new(FakeDirectory::new());
        let svc = TemplateService::new(Database::open_in_memory().unwrap(), fake.clone());
        (fake, svc)
    }

    fn order_confirmation() -> NewTemplate {
        NewTemplate {
            template_name: "order_confirmation".into(),
            subject: "Order Confirmation - {{ order_number }}".into(),
            body_html: r#"<p onclick="x()">Dear {{ customer_name }},</p><script>bad()</script>"#
                .into(),
            category: "customer_service".into(),
            variables: vec!["customer_name".into(), "order_number".into()],
            description: Some("Order confirmation".into()),
            ..Default::default()
        }
    }

    #[test]
    fn round_trip_by_id_and_by_name() {
        let (_, svc) = service();
        let created = svc.create_template(order_confirmation()).unwrap();
        assert_eq!(created.body_html, "<p>Dear {{ customer_name }},</p>");

        let by_id = svc.get_template(&created.template_id).unwrap();
        let by_name = svc.get_template("order_confirmation").unwrap();
        for fetched in [&by_id, &by_name] {
            assert_eq!(fetched.subject, created.subject);
            assert_eq!(fetched.body_html, created.body_html);
            assert_eq!(fetched.category, "customer_service");
            assert_eq!(fetched.variables, vec!["customer_name", "order_number"]);
        }
        assert_eq!(sanitize_html(&by_id.body_html, false), by_id.body_html);
    }

    #[test]
    fn invalid_syntax_is_rejected_before_storage() {
        let (_, svc) = service();
        let mut bad = order_confirmation();
        bad.subject = "Order {{ order_number".into();
        let err = svc.create_template(bad).unwrap_err();
        assert!(matches!(err, AdminError::InvalidTemplateSyntax(_)));
        assert!(svc.list_templates(None, 10).unwrap().is_empty());
    }

    #[test]
    fn update_resanitizes_and_bumps_version() {
        let (_, svc) = service();
        svc.create_template(order_confirmation()).unwrap();
        let updated = svc
            .update_template(
                "order_confirmation",
                TemplateUpdate {
                    body_html: Some("<b>Total</b><iframe src=\"x\"></iframe>".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.body_html, "<b>Total</b>");
    }

    #[test]
    fn unknown_template_is_not_found() {
        let (_, svc) = service();
        let err = svc
            .get_template("6f1c7e0a-0000-4000-8000-000000000000")
            .unwrap_err();
        assert!(matches!(err, AdminError::TemplateNotFound(_)));
        assert!(svc.delete_template("nope").is_err());
    }

    #[tokio::test]
    async fn send_renders_escapes_and_logs_usage() {
        let (fake, svc) = service();
        svc.create_template(order_confirmation()).unwrap();

        let receipt = svc
            .send_from_template(&SendRequest {
                template: "order_confirmation".into(),
                from: "sales@contoso.com".into(),
                to: vec!["a@x.io".into(), "b@x.io".into()],
                cc: vec!["c@x.io".into()],
                variables: json!({"customer_name": "<Ana>", "order_number": 42})
                    .as_object()
                    .cloned()
                    .unwrap(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(receipt.recipients, 2);

        let sent = fake.sent_mail();
        assert_eq!(sent.len(), 1);
        let (from, mail) = &sent[0];
        assert_eq!(from, "sales@contoso.com");
        assert_eq!(mail.subject, "Order Confirmation - 42");
        assert_eq!(mail.html_body, "<p>Dear &lt;Ana&gt;,</p>");
        assert_eq!(mail.cc, vec!["c@x.io"]);

        let stats = svc.get_template_stats("order_confirmation").unwrap();
        assert_eq!(stats.usage_count, 2);
    }

    #[tokio::test]
    async fn send_validates_recipients_before_sending() {
        let (fake, svc) = service();
        svc.create_template(order_confirmation()).unwrap();
        let err = svc
            .send_from_template(&SendRequest {
                template: "order_confirmation".into(),
                from: "sales@contoso.com".into(),
                to: vec!["a@x.io".into()],
                bcc: vec!["broken".into()],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::InvalidEmail(ref e) if e == "broken"));
        assert!(fake.sent_mail().is_empty());
    }

    #[tokio::test]
    async fn failed_send_logs_no_usage() {
        let fake = Arc::new(FakeDirectory::new().fail_on("send_mail:sales@contoso.com"));
        let svc = TemplateService::new(Database::open_in_memory().unwrap(), fake);
        svc.create_template(order_confirmation()).unwrap();
        let err = svc
            .send_from_template(&SendRequest {
                template: "order_confirmation".into(),
                from: "sales@contoso.com".into(),
                to: vec!["a@x.io".into()],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(
            svc.get_template_stats("order_confirmation").unwrap().usage_count,
            0
        );
    }
}
