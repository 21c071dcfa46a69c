#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const TENANT_ID: &str = "11111111-2222-3333-4444-555555555555";
const CLIENT_ID: &str = "66666666-7777-8888-9999-000000000000";

/// Offline configuration: a static token and a Graph endpoint nobody listens on.
fn admin(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("m365-admin").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("M365_ADMIN_CONFIG")
        .env_remove("RUST_LOG")
        .env("AZURE_TENANT_ID", TENANT_ID)
        .env("AZURE_CLIENT_ID", CLIENT_ID)
        .env("AUTH_METHOD", "access_token")
        .env("GRAPH_ACCESS_TOKEN", "test-token")
        .env("GRAPH_BASE_URL", "http://127.0.0.1:9")
        .env("DATABASE_PATH", dir.path().join("data/m365_admin.db"));
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// init-db
// ---------------------------------------------------------------------------

#[test]
fn init_db_creates_database_once() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .arg("init-db")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database initialized"));
    assert!(dir.path().join("data/m365_admin.db").exists());

    admin(&dir)
        .arg("init-db")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    admin(&dir)
        .args(["init-db", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database initialized"));
}

// ---------------------------------------------------------------------------
// templates
// ---------------------------------------------------------------------------

#[test]
fn templates_seed_is_idempotent_and_listable() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .args(["templates", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 template(s) created"));

    admin(&dir)
        .args(["templates", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 template(s) created, 5 already present"));

    let listed = json_stdout(admin(&dir).args(["templates", "list", "--json"]));
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["template_name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"wiring_instructions"));
    assert!(names.contains(&"team_notification"));
}

#[test]
fn templates_list_on_empty_database() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No templates."));
}

// ---------------------------------------------------------------------------
// tools
// ---------------------------------------------------------------------------

#[test]
fn tools_json_lists_catalogue() {
    let dir = TempDir::new().unwrap();
    let tools = json_stdout(admin(&dir).args(["tools", "--json"]));
    let tools = tools.as_array().unwrap();
    assert_eq!(tools.len(), 23);
    assert!(tools.iter().any(|t| t["name"] == "provision_team"));
}

#[test]
fn tools_table_has_header() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME").and(predicate::str::contains("create_team")));
}

// ---------------------------------------------------------------------------
// mcp
// ---------------------------------------------------------------------------

#[test]
fn mcp_handshake_and_offline_tool_call() {
    let dir = TempDir::new().unwrap();
    let input = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"0"}}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"create_template","arguments":{"templateName":"hello","subject":"Hi {{ name }}","bodyHtml":"<p>Hi {{ name }}</p>","category":"internal"}}}"#,
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"get_template","arguments":{"templateIdentifier":"hello"}}}"#,
    ]
    .join("\n");

    let output = admin(&dir)
        .arg("mcp")
        .write_stdin(input + "\n")
        .output()
        .unwrap();
    assert!(output.status.success(), "mcp failed: {output:?}");

    let responses: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 4, "notification must not be answered");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "m365-admin");
    assert_eq!(
        responses[1]["result"]["tools"].as_array().unwrap().len(),
        23
    );
    assert_eq!(responses[2]["result"]["isError"], false);
    assert_eq!(responses[3]["id"], 4);
    let text = responses[3]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Hi {{ name }}"));

    let audit = json_stdout(admin(&dir).args(["audit", "--json"]));
    let operations: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["operation"].as_str().unwrap())
        .collect();
    assert_eq!(operations, vec!["get_template", "create_template"]);
}

#[test]
fn mcp_refuses_invalid_configuration() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .arg("mcp")
        .env("AZURE_TENANT_ID", "not-a-guid")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

// ---------------------------------------------------------------------------
// health
// ---------------------------------------------------------------------------

#[test]
fn health_is_unhealthy_when_graph_is_unreachable() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .arg("health")
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": "unhealthy""#))
        .stderr(predicate::str::contains("server is unhealthy"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_init_writes_file_once() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created: m365-admin.yaml"));
    let yaml = std::fs::read_to_string(dir.path().join("m365-admin.yaml")).unwrap();
    assert!(yaml.contains("mcp_server_name: m365-admin"));

    admin(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  m365-admin.yaml"));
}

#[test]
fn config_check_reports_validity() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid."));

    admin(&dir)
        .args(["config", "check"])
        .env("AZURE_CLIENT_ID", "nope")
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid GUID format"));
}

#[test]
fn config_show_redacts_secrets() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph_access_token: '********'").or(
            predicate::str::contains("graph_access_token: \"********\""),
        ))
        .stdout(predicate::str::contains("test-token").not());
}

#[test]
fn bad_environment_value_fails_before_running() {
    let dir = TempDir::new().unwrap();
    admin(&dir)
        .arg("tools")
        .env("MAX_REQUESTS_PER_MINUTE", "lots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"));
}
