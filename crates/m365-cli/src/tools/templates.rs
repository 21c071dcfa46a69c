use super::{
    failed, max_results, object_arg, optional_str, optional_string_list, required_str,
    string_list, AdminTool,
};
use crate::context::AppContext;
use async_trait::async_trait;
use m365_core::template::{NewTemplate, SendRequest, TemplateUpdate};
use serde_json::{json, Value};

fn identifier_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "templateIdentifier": {"type": "string", "description": description}
        },
        "required": ["templateIdentifier"]
    })
}

pub struct CreateTemplateTool;

#[async_trait]
impl AdminTool for CreateTemplateTool {
    fn name(&self) -> &str {
        "create_template"
    }

    fn description(&self) -> &str {
        "Create an email template with {{ variable }} placeholders"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "templateName": {"type": "string", "description": "Unique template name"},
                "subject": {"type": "string", "description": "Subject line (may use variables)"},
                "bodyHtml": {"type": "string", "description": "HTML body (sanitized on save; keep {% if %} blocks outside table rows)"},
                "category": {"type": "string", "description": "Template category"},
                "bodyText": {"type": "string", "description": "Plain text body"},
                "variables": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Variable names used by the template"
                },
                "description": {"type": "string", "description": "What the template is for"}
            },
            "required": ["templateName", "subject", "bodyHtml", "category"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let template = NewTemplate {
            template_name: required_str(&args, "templateName")?.to_string(),
            subject: required_str(&args, "subject")?.to_string(),
            body_html: required_str(&args, "bodyHtml")?.to_string(),
            category: required_str(&args, "category")?.to_string(),
            body_text: optional_str(&args, "bodyText").map(str::to_string),
            variables: string_list(&args, "variables")?,
            description: optional_str(&args, "description").map(str::to_string),
        };
        let created = ctx
            .templates
            .create_template(template)
            .map_err(failed("create template"))?;
        Ok(json!({
            "message": format!("Template '{}' created successfully", created.template_name),
            "template_id": created.template_id,
            "template_name": created.template_name,
        }))
    }
}

pub struct GetTemplateTool;

#[async_trait]
impl AdminTool for GetTemplateTool {
    fn name(&self) -> &str {
        "get_template"
    }

    fn description(&self) -> &str {
        "Get an email template by id or name"
    }

    fn schema(&self) -> Value {
        identifier_schema("Template id or name")
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let identifier = required_str(&args, "templateIdentifier")?;
        let template = ctx
            .templates
            .get_template(identifier)
            .map_err(failed("get template"))?;
        serde_json::to_value(&template).map_err(|e| e.to_string())
    }
}

pub struct ListTemplatesTool;

#[async_trait]
impl AdminTool for ListTemplatesTool {
    fn name(&self) -> &str {
        "list_templates"
    }

    fn description(&self) -> &str {
        "List email templates, optionally filtered by category"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {"type": "string", "description": "Only templates in this category"},
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of templates to return (default: 100)"
                }
            },
            "required": []
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let templates = ctx
            .templates
            .list_templates(optional_str(&args, "category"), max_results(&args)?)
            .map_err(failed("list templates"))?;
        Ok(json!({"count": templates.len(), "templates": templates}))
    }
}

pub struct UpdateTemplateTool;

#[async_trait]
impl AdminTool for UpdateTemplateTool {
    fn name(&self) -> &str {
        "update_template"
    }

    fn description(&self) -> &str {
        "Update fields of an existing email template; the version is incremented"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "templateIdentifier": {"type": "string", "description": "Template id or name"},
                "subject": {"type": "string"},
                "bodyHtml": {"type": "string"},
                "bodyText": {"type": "string"},
                "category": {"type": "string"},
                "variables": {"type": "array", "items": {"type": "string"}},
                "description": {"type": "string"}
            },
            "required": ["templateIdentifier"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let identifier = required_str(&args, "templateIdentifier")?;
        let owned = |key: &str| optional_str(&args, key).map(str::to_string);
        let update = TemplateUpdate {
            subject: owned("subject"),
            body_html: owned("bodyHtml"),
            body_text: owned("bodyText"),
            category: owned("category"),
            variables: optional_string_list(&args, "variables")?,
            description: owned("description"),
        };
        let updated = ctx
            .templates
            .update_template(identifier, update)
            .map_err(failed("update template"))?;
        Ok(json!({
            "message": format!("Template '{}' updated successfully", updated.template_name),
            "template_id": updated.template_id,
            "version": updated.version,
        }))
    }
}

pub struct DeleteTemplateTool;

#[async_trait]
impl AdminTool for DeleteTemplateTool {
    fn name(&self) -> &str {
        "delete_template"
    }

    fn description(&self) -> &str {
        "Delete an email template"
    }

    fn schema(&self) -> Value {
        identifier_schema("Template id or name")
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let identifier = required_str(&args, "templateIdentifier")?;
        let deleted = ctx
            .templates
            .delete_template(identifier)
            .map_err(failed("delete template"))?;
        Ok(json!({
            "message": format!("Template '{}' deleted successfully", deleted.template_name),
            "template_id": deleted.template_id,
        }))
    }
}

pub struct SendFromTemplateTool;

#[async_trait]
impl AdminTool for SendFromTemplateTool {
    fn name(&self) -> &str {
        "send_from_template"
    }

    fn description(&self) -> &str {
        "Render an email template with variables and send it"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "templateIdentifier": {"type": "string", "description": "Template id or name"},
                "fromEmail": {"type": "string", "description": "Mailbox to send from"},
                "toEmails": {"type": "array", "items": {"type": "string"}},
                "variables": {"type": "object", "description": "Values for template variables"},
                "ccEmails": {"type": "array", "items": {"type": "string"}},
                "bccEmails": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["templateIdentifier", "fromEmail", "toEmails"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let request = SendRequest {
            template: required_str(&args, "templateIdentifier")?.to_string(),
            from: required_str(&args, "fromEmail")?.to_string(),
            to: string_list(&args, "toEmails")?,
            cc: string_list(&args, "ccEmails")?,
            bcc: string_list(&args, "bccEmails")?,
            variables: object_arg(&args, "variables")?,
        };
        let receipt = ctx
            .templates
            .send_from_template(&request)
            .await
            .map_err(failed("send email"))?;
        Ok(json!({
            "message": format!("Email sent to {} recipient(s)", receipt.recipients),
            "template_id": receipt.template_id,
            "template_name": receipt.template_name,
            "recipients": receipt.recipients,
        }))
    }
}

pub struct GetTemplateStatsTool;

#[async_trait]
impl AdminTool for GetTemplateStatsTool {
    fn name(&self) -> &str {
        "get_template_stats"
    }

    fn description(&self) -> &str {
        "Usage statistics for an email template"
    }

    fn schema(&self) -> Value {
        identifier_schema("Template id or name")
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let identifier = required_str(&args, "templateIdentifier")?;
        let stats = ctx
            .templates
            .get_template_stats(identifier)
            .map_err(failed("get template stats"))?;
        serde_json::to_value(&stats).map_err(|e| e.to_string())
    }
}
