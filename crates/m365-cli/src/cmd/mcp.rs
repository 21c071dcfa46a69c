use crate::context::AppContext;
use crate::tools::{self, AdminTool};
use anyhow::Context;
use m365_core::audit::{AuditEntry, AuditStatus};
use m365_core::config::Settings;
use m365_core::health::check_health;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const HEALTH_URI: &str = "m365://health";

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ToolContent {
    r#type: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct ToolCallResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(settings: Settings) -> anyhow::Result<()> {
    settings.validate().context("invalid configuration")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let ctx = AppContext::open(settings)?;
        tracing::info!(
            server = %ctx.settings.mcp_server_name,
            version = %ctx.settings.mcp_server_version,
            auth_method = %ctx.settings.auth_method,
            "starting MCP server"
        );

        // The probe may sit in a device-code sign-in; serve requests meanwhile.
        let client = ctx.client.clone();
        tokio::spawn(async move {
            match client.organization_name().await {
                Ok(org) => tracing::info!(organization = ?org, "connected to Microsoft Graph"),
                Err(e) => tracing::warn!(error = %e, "startup connection test failed"),
            }
        });

        let stdin = BufReader::new(tokio::io::stdin());
        serve(stdin, tokio::io::stdout(), &ctx).await
    })
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Read newline-delimited JSON-RPC requests from `input` until EOF and write
/// one response line per request to `output`.
pub async fn serve<R, W>(input: R, mut output: W, ctx: &AppContext) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let tools = tools::all_tools();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let raw: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let resp = JsonRpcResponse::failure(None, -32700, format!("parse error: {e}"));
                write_response(&mut output, &resp).await?;
                continue;
            }
        };

        // Notifications have no "id" key and get no response
        if !raw
            .as_object()
            .map(|o| o.contains_key("id"))
            .unwrap_or(false)
        {
            tracing::debug!(method = %raw["method"], "notification received");
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                let resp =
                    JsonRpcResponse::failure(None, -32600, format!("invalid request: {e}"));
                write_response(&mut output, &resp).await?;
                continue;
            }
        };

        let response = handle_request(&request, &tools, ctx).await;
        write_response(&mut output, &response).await?;
    }

    tracing::info!("stdin closed, MCP server stopping");
    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &JsonRpcResponse,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Request dispatch (pub for unit tests)
// ---------------------------------------------------------------------------

pub async fn handle_request(
    req: &JsonRpcRequest,
    tools: &[Box<dyn AdminTool>],
    ctx: &AppContext,
) -> JsonRpcResponse {
    let id = req.id.clone();
    match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": ctx.settings.mcp_server_name,
                    "version": ctx.settings.mcp_server_version
                }
            }),
        ),

        "tools/list" => {
            let tool_list: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name(),
                        "description": t.description(),
                        "inputSchema": t.schema()
                    })
                })
                .collect();
            JsonRpcResponse::success(id, json!({ "tools": tool_list }))
        }

        "tools/call" => {
            let Some(params) = &req.params else {
                return JsonRpcResponse::failure(id, -32602, "missing params");
            };
            let Some(tool_name) = params["name"].as_str() else {
                return JsonRpcResponse::failure(id, -32602, "missing tool name in params");
            };
            let Some(tool) = tools.iter().find(|t| t.name() == tool_name) else {
                return JsonRpcResponse::failure(id, -32601, format!("tool not found: {tool_name}"));
            };

            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            let call_result = call_tool(tool.as_ref(), args, ctx).await;
            JsonRpcResponse::success(
                id,
                serde_json::to_value(&call_result)
                    .unwrap_or_else(|e| json!({"error": e.to_string()})),
            )
        }

        "resources/list" => JsonRpcResponse::success(
            id,
            json!({
                "resources": [{
                    "uri": HEALTH_URI,
                    "name": "Server health",
                    "description": "Authentication state, Graph connectivity and configuration",
                    "mimeType": "application/json"
                }]
            }),
        ),

        "resources/read" => {
            let uri = req.params.as_ref().and_then(|p| p["uri"].as_str());
            match uri {
                None => JsonRpcResponse::failure(id, -32602, "missing resource uri in params"),
                Some(HEALTH_URI) => {
                    let report = check_health(ctx.client.as_ref(), &ctx.settings).await;
                    JsonRpcResponse::success(
                        id,
                        json!({
                            "contents": [{
                                "uri": HEALTH_URI,
                                "mimeType": "application/json",
                                "text": report.to_json_pretty()
                            }]
                        }),
                    )
                }
                Some(other) => {
                    JsonRpcResponse::failure(id, -32602, format!("resource not found: {other}"))
                }
            }
        }

        other => JsonRpcResponse::failure(id, -32601, format!("method not found: {other}")),
    }
}

/// Run one tool behind the rate limit and record the outcome in the audit log.
async fn call_tool(tool: &dyn AdminTool, args: Value, ctx: &AppContext) -> ToolCallResult {
    let target = audit_target(&args);
    let user = audit_user(&args);

    let outcome = match ctx.admit() {
        Ok(()) => {
            tracing::info!(tool = tool.name(), "tool call");
            tool.call(args, ctx).await
        }
        Err(e) => {
            tracing::warn!(tool = tool.name(), "tool call rejected by rate limit");
            Err(e)
        }
    };

    let (text, is_error, entry) = match outcome {
        Ok(v) => (
            serde_json::to_string_pretty(&v)
                .unwrap_or_else(|e| format!("serialization error: {e}")),
            false,
            AuditEntry::new(tool.name(), AuditStatus::Success),
        ),
        Err(e) => {
            tracing::warn!(tool = tool.name(), error = %e, "tool call failed");
            let entry = AuditEntry::new(tool.name(), AuditStatus::Error).details(Some(e.clone()));
            (e, true, entry)
        }
    };
    ctx.record(entry.target(target).user(user));

    ToolCallResult {
        content: vec![ToolContent {
            r#type: "text",
            text,
        }],
        is_error,
    }
}

fn first_str(args: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| args[*k].as_str())
        .map(str::to_string)
}

fn audit_target(args: &Value) -> Option<String> {
    first_str(
        args,
        &[
            "teamId",
            "teamName",
            "templateIdentifier",
            "templateName",
            "email",
            "displayName",
        ],
    )
}

fn audit_user(args: &Value) -> Option<String> {
    first_str(args, &["fromEmail", "userEmail", "ownerEmail"])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_with;
    use m365_core::db::Database;
    use m365_core::testing::FakeDirectory;
    use std::sync::Arc;

    fn make_req(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(Value::Number(id.into())),
            method: method.to_string(),
            params,
        }
    }

    fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
        make_req(
            id,
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        )
    }

    #[tokio::test]
    async fn initialize_returns_capabilities() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let req = make_req(
            1,
            "initialize",
            Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.1"}
            })),
        );

        let resp = handle_request(&req, &tools, &ctx).await;
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
        assert_eq!(result["serverInfo"]["name"], "m365-admin");
    }

    #[tokio::test]
    async fn tools_list_returns_full_catalogue() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let resp = handle_request(&make_req(2, "tools/list", None), &tools, &ctx).await;
        let result = resp.result.unwrap();
        let tool_list = result["tools"].as_array().unwrap();
        assert_eq!(tool_list.len(), 23);

        let names: Vec<&str> = tool_list
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"provision_team"));
        assert!(names.contains(&"send_from_template"));
        assert!(names.contains(&"archive_team"));
        assert!(tool_list.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn tools_call_unknown_tool_returns_error() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let resp = handle_request(&call(3, "nonexistent_tool", json!({})), &tools, &ctx).await;
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn tools_call_missing_params_returns_error() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let resp = handle_request(&make_req(4, "tools/call", None), &tools, &ctx).await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = handle_request(
            &make_req(5, "tools/call", Some(json!({"arguments": {}}))),
            &tools,
            &ctx,
        )
        .await;
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn unknown_method_returns_method_not_found() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let resp = handle_request(&make_req(6, "unknown/method", None), &tools, &ctx).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32601);
        assert!(err.message.contains("method not found"));
    }

    #[tokio::test]
    async fn successful_call_is_audited() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let resp = handle_request(
            &call(7, "create_team", json!({"displayName": "Ops", "description": "x"})),
            &tools,
            &ctx,
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], false);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("team-1"));

        let records = ctx.audit().unwrap().recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, "create_team");
        assert_eq!(records[0].status, "success");
        assert_eq!(records[0].target_resource.as_deref(), Some("Ops"));
    }

    #[tokio::test]
    async fn failed_provisioning_is_an_error_result_and_audited() {
        let (fake, ctx) = context_with(FakeDirectory::new().fail_on("create_channel:broken"));
        let tools = tools::all_tools();
        let resp = handle_request(
            &call(
                8,
                "provision_team",
                json!({
                    "teamName": "Ops",
                    "teamDescription": "Operations",
                    "ownerEmail": "owner@contoso.com",
                    "channels": [{"name": "general"}, {"name": "alerts"}, {"name": "broken"}]
                }),
            ),
            &tools,
            &ctx,
        )
        .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("create channel 'broken'"));
        assert_eq!(fake.calls_matching("archive_team"), vec!["archive_team:team-1"]);

        let records = ctx.audit().unwrap().recent(10).unwrap();
        assert_eq!(records[0].operation, "provision_team");
        assert_eq!(records[0].status, "error");
        assert_eq!(records[0].target_resource.as_deref(), Some("Ops"));
        assert_eq!(records[0].user_email.as_deref(), Some("owner@contoso.com"));
        assert!(records[0].details.as_deref().unwrap().contains("broken"));
    }

    #[tokio::test]
    async fn rate_limit_rejects_calls_beyond_the_window_budget() {
        let settings = Settings {
            max_requests_per_minute: 1,
            ..Settings::default()
        };
        let ctx = AppContext::new(
            settings,
            Arc::new(FakeDirectory::new()),
            Database::open_in_memory().unwrap(),
        );
        let tools = tools::all_tools();

        let first = handle_request(&call(9, "list_teams", json!({})), &tools, &ctx).await;
        assert_eq!(first.result.unwrap()["isError"], false);

        let second = handle_request(&call(10, "list_teams", json!({})), &tools, &ctx).await;
        let result = second.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn health_resource_is_listed_and_readable() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let tools = tools::all_tools();
        let listed = handle_request(&make_req(11, "resources/list", None), &tools, &ctx).await;
        assert_eq!(listed.result.unwrap()["resources"][0]["uri"], HEALTH_URI);

        let read = handle_request(
            &make_req(12, "resources/read", Some(json!({"uri": HEALTH_URI}))),
            &tools,
            &ctx,
        )
        .await;
        let result = read.result.unwrap();
        let report: Value =
            serde_json::from_str(result["contents"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(report["status"], "healthy");

        let missing = handle_request(
            &make_req(13, "resources/read", Some(json!({"uri": "m365://nope"}))),
            &tools,
            &ctx,
        )
        .await;
        assert_eq!(missing.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn serve_skips_notifications_and_reports_parse_errors() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve(input.as_bytes(), &mut output, &ctx).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 23);
    }
}
