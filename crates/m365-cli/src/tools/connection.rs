use super::AdminTool;
use crate::context::AppContext;
use async_trait::async_trait;
use m365_core::health::check_health;
use serde_json::{json, Value};

pub struct TestConnectionTool;

#[async_trait]
impl AdminTool for TestConnectionTool {
    fn name(&self) -> &str {
        "test_connection"
    }

    fn description(&self) -> &str {
        "Test the connection to Microsoft Graph and report the tenant name"
    }

    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn call(&self, _args: Value, ctx: &AppContext) -> Result<Value, String> {
        match ctx.client.organization_name().await {
            Ok(organization) => {
                tracing::info!(organization = ?organization, "graph connection test succeeded");
                Ok(json!({
                    "connected": true,
                    "organization": organization,
                    "message": "Successfully connected to Microsoft Graph API"
                }))
            }
            Err(e) => {
                tracing::warn!(error = %e, "graph connection test failed");
                Err(format!("connection test failed: {e}"))
            }
        }
    }
}

pub struct GetHealthTool;

#[async_trait]
impl AdminTool for GetHealthTool {
    fn name(&self) -> &str {
        "get_health"
    }

    fn description(&self) -> &str {
        "Report server health, authentication state and configuration"
    }

    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn call(&self, _args: Value, ctx: &AppContext) -> Result<Value, String> {
        let report = check_health(ctx.client.as_ref(), &ctx.settings).await;
        serde_json::to_value(&report).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_with;
    use m365_core::testing::FakeDirectory;

    #[tokio::test]
    async fn connection_reports_tenant() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let out = TestConnectionTool.call(json!({}), &ctx).await.unwrap();
        assert_eq!(out["connected"], true);
        assert_eq!(out["organization"], "Contoso");
    }

    #[tokio::test]
    async fn connection_failure_is_a_tool_error() {
        let (_, ctx) = context_with(FakeDirectory::new().fail_on("organization"));
        let err = TestConnectionTool.call(json!({}), &ctx).await.unwrap_err();
        assert!(err.starts_with("connection test failed"));
    }

    #[tokio::test]
    async fn health_includes_configuration() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let out = GetHealthTool.call(Value::Null, &ctx).await.unwrap();
        assert_eq!(out["status"], "healthy");
        assert_eq!(out["configuration"]["serverName"], "m365-admin");
    }
}
