use super::{failed, AdminTool};
use crate::context::AppContext;
use async_trait::async_trait;
use m365_core::teams::ProvisioningRequest;
use serde_json::{json, Value};

/// Compound workflow: a team, its channels and its members, unwound in
/// reverse order if any step fails.
pub struct ProvisionTeamTool;

#[async_trait]
impl AdminTool for ProvisionTeamTool {
    fn name(&self) -> &str {
        "provision_team"
    }

    fn description(&self) -> &str {
        "Create a team with channels and members in one step; on failure every created resource is rolled back"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "teamName": {"type": "string", "description": "Team display name"},
                "teamDescription": {"type": "string", "description": "Team description"},
                "ownerEmail": {"type": "string", "description": "Email of the team owner"},
                "visibility": {
                    "type": "string",
                    "enum": ["public", "private"],
                    "description": "Team visibility (default: private)"
                },
                "channels": {
                    "type": "array",
                    "description": "Channels to create, in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "description": {"type": "string"},
                            "type": {"type": "string", "enum": ["standard", "private"]}
                        },
                        "required": ["name"]
                    }
                },
                "members": {
                    "type": "array",
                    "description": "Members to add, in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "email": {"type": "string"},
                            "role": {"type": "string", "enum": ["owner", "member"]}
                        },
                        "required": ["email"]
                    }
                }
            },
            "required": ["teamName", "teamDescription", "ownerEmail"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let request: ProvisioningRequest =
            serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))?;
        let result = ctx
            .teams
            .provision_team_with_structure(&request)
            .await
            .map_err(failed("provision team"))?;
        let mut out = serde_json::to_value(&result).map_err(|e| e.to_string())?;
        out["message"] = json!(format!(
            "Team '{}' provisioned with {} channel(s) and {} member(s)",
            result.team_name, result.channels_created, result.members_added
        ));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_with;
    use m365_core::directory::TeamLifecycle;
    use m365_core::testing::FakeDirectory;

    fn args(channels: &[&str]) -> Value {
        let channels: Vec<Value> = channels.iter().map(|c| json!({"name": c})).collect();
        json!({
            "teamName": "Ops",
            "teamDescription": "Operations",
            "ownerEmail": "owner@contoso.com",
            "channels": channels,
            "members": [{"email": "ana@contoso.com", "role": "member"}]
        })
    }

    #[tokio::test]
    async fn provisions_full_structure() {
        let fake = FakeDirectory::new()
            .with_user("owner@contoso.com")
            .with_user("ana@contoso.com");
        let (fake, ctx) = context_with(fake);
        let out = ProvisionTeamTool
            .call(args(&["general", "alerts"]), &ctx)
            .await
            .unwrap();
        assert_eq!(out["channels_created"], 2);
        assert_eq!(out["members_added"], 1);
        let team_id = out["team_id"].as_str().unwrap();
        assert_eq!(fake.channel_names(team_id), vec!["general", "alerts"]);
    }

    #[tokio::test]
    async fn failed_channel_rolls_back_everything() {
        let (fake, ctx) = context_with(FakeDirectory::new().fail_on("create_channel:broken"));
        let err = ProvisionTeamTool
            .call(args(&["general", "alerts", "broken"]), &ctx)
            .await
            .unwrap_err();
        assert!(err.starts_with("failed to provision team: create channel 'broken'"));
        assert_eq!(
            fake.calls_matching("delete_channel"),
            vec!["delete_channel:channel-3", "delete_channel:channel-2"]
        );
        assert!(fake.channel_names("team-1").is_empty());
        assert_eq!(fake.team_lifecycle("team-1"), Some(TeamLifecycle::Archived));
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected() {
        let (fake, ctx) = context_with(FakeDirectory::new());
        let err = ProvisionTeamTool
            .call(json!({"teamName": "Ops"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.starts_with("invalid arguments"));

        let mut bad_role = args(&[]);
        bad_role["members"][0]["role"] = json!("admin");
        assert!(ProvisionTeamTool.call(bad_role, &ctx).await.is_err());
        assert!(fake.calls().is_empty());
    }
}
