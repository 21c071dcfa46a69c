use super::{enum_arg, failed, max_results, optional_str, required_str, AdminTool};
use crate::context::AppContext;
use async_trait::async_trait;
use m365_core::directory::{ChannelType, MemberRole, TeamVisibility};
use m365_core::teams::CreateTeamRequest;
use serde_json::{json, Value};

fn team_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "teamId": {"type": "string", "description": "Team id"}
        },
        "required": ["teamId"]
    })
}

pub struct CreateTeamTool;

#[async_trait]
impl AdminTool for CreateTeamTool {
    fn name(&self) -> &str {
        "create_team"
    }

    fn description(&self) -> &str {
        "Create a Microsoft Teams team, optionally attaching an owner"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "displayName": {"type": "string", "description": "Team name"},
                "description": {"type": "string", "description": "Team description"},
                "visibility": {
                    "type": "string",
                    "enum": ["public", "private"],
                    "description": "Team visibility: 'public' or 'private' (default: private)"
                },
                "ownerEmail": {"type": "string", "description": "Email of the team owner"}
            },
            "required": ["displayName", "description"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let request = CreateTeamRequest {
            display_name: required_str(&args, "displayName")?.to_string(),
            description: required_str(&args, "description")?.to_string(),
            visibility: enum_arg::<TeamVisibility>(&args, "visibility")?,
            owner_email: optional_str(&args, "ownerEmail").map(str::to_string),
            ..Default::default()
        };
        let created = ctx
            .teams
            .create_team(&request)
            .await
            .map_err(failed("create team"))?;
        let mut out = serde_json::to_value(&created).map_err(|e| e.to_string())?;
        out["message"] = json!(format!("Team '{}' created successfully", created.display_name));
        Ok(out)
    }
}

pub struct GetTeamTool;

#[async_trait]
impl AdminTool for GetTeamTool {
    fn name(&self) -> &str {
        "get_team"
    }

    fn description(&self) -> &str {
        "Get a team's details, including whether it is archived"
    }

    fn schema(&self) -> Value {
        team_id_schema()
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let team = ctx
            .teams
            .get_team(required_str(&args, "teamId")?)
            .await
            .map_err(failed("get team"))?;
        serde_json::to_value(&team).map_err(|e| e.to_string())
    }
}

pub struct ListTeamsTool;

#[async_trait]
impl AdminTool for ListTeamsTool {
    fn name(&self) -> &str {
        "list_teams"
    }

    fn description(&self) -> &str {
        "List teams in the tenant"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of teams to return (default: 100)"
                }
            },
            "required": []
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let teams = ctx
            .teams
            .list_teams(max_results(&args)?)
            .await
            .map_err(failed("list teams"))?;
        Ok(json!({"count": teams.len(), "teams": teams}))
    }
}

pub struct ArchiveTeamTool;

#[async_trait]
impl AdminTool for ArchiveTeamTool {
    fn name(&self) -> &str {
        "archive_team"
    }

    fn description(&self) -> &str {
        "Archive a team (the delete operation; safe to repeat)"
    }

    fn schema(&self) -> Value {
        team_id_schema()
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let team_id = required_str(&args, "teamId")?;
        ctx.teams
            .archive_team(team_id)
            .await
            .map_err(failed("archive team"))?;
        Ok(json!({"message": "Team archived successfully", "team_id": team_id}))
    }
}

pub struct CreateChannelTool;

#[async_trait]
impl AdminTool for CreateChannelTool {
    fn name(&self) -> &str {
        "create_channel"
    }

    fn description(&self) -> &str {
        "Create a channel in a team"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "teamId": {"type": "string", "description": "Team id"},
                "displayName": {"type": "string", "description": "Channel name"},
                "description": {"type": "string", "description": "Channel description"},
                "channelType": {
                    "type": "string",
                    "enum": ["standard", "private"],
                    "description": "Channel type: 'standard' or 'private' (default: standard)"
                }
            },
            "required": ["teamId", "displayName"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let channel = ctx
            .teams
            .create_channel(
                required_str(&args, "teamId")?,
                required_str(&args, "displayName")?,
                optional_str(&args, "description"),
                enum_arg::<ChannelType>(&args, "channelType")?,
            )
            .await
            .map_err(failed("create channel"))?;
        serde_json::to_value(&channel).map_err(|e| e.to_string())
    }
}

pub struct ListChannelsTool;

#[async_trait]
impl AdminTool for ListChannelsTool {
    fn name(&self) -> &str {
        "list_channels"
    }

    fn description(&self) -> &str {
        "List the channels of a team"
    }

    fn schema(&self) -> Value {
        team_id_schema()
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let channels = ctx
            .teams
            .list_channels(required_str(&args, "teamId")?)
            .await
            .map_err(failed("list channels"))?;
        Ok(json!({"count": channels.len(), "channels": channels}))
    }
}

pub struct DeleteChannelTool;

#[async_trait]
impl AdminTool for DeleteChannelTool {
    fn name(&self) -> &str {
        "delete_channel"
    }

    fn description(&self) -> &str {
        "Delete a channel from a team"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "teamId": {"type": "string", "description": "Team id"},
                "channelId": {"type": "string", "description": "Channel id"}
            },
            "required": ["teamId", "channelId"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let channel_id = required_str(&args, "channelId")?;
        ctx.teams
            .delete_channel(required_str(&args, "teamId")?, channel_id)
            .await
            .map_err(failed("delete channel"))?;
        Ok(json!({"message": "Channel deleted successfully", "channel_id": channel_id}))
    }
}

pub struct AddTeamMemberTool;

#[async_trait]
impl AdminTool for AddTeamMemberTool {
    fn name(&self) -> &str {
        "add_team_member"
    }

    fn description(&self) -> &str {
        "Add a user to a team as owner or member"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "teamId": {"type": "string", "description": "Team id"},
                "userEmail": {"type": "string", "description": "Email of the user to add"},
                "role": {
                    "type": "string",
                    "enum": ["owner", "member"],
                    "description": "Member role: 'owner' or 'member' (default: member)"
                }
            },
            "required": ["teamId", "userEmail"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let added = ctx
            .teams
            .add_team_member(
                required_str(&args, "teamId")?,
                required_str(&args, "userEmail")?,
                enum_arg::<MemberRole>(&args, "role")?,
            )
            .await
            .map_err(failed("add member"))?;
        serde_json::to_value(&added).map_err(|e| e.to_string())
    }
}

pub struct RemoveTeamMemberTool;

#[async_trait]
impl AdminTool for RemoveTeamMemberTool {
    fn name(&self) -> &str {
        "remove_team_member"
    }

    fn description(&self) -> &str {
        "Remove a membership from a team"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "teamId": {"type": "string", "description": "Team id"},
                "memberId": {"type": "string", "description": "Membership id (not the user id)"}
            },
            "required": ["teamId", "memberId"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let member_id = required_str(&args, "memberId")?;
        ctx.teams
            .remove_team_member(required_str(&args, "teamId")?, member_id)
            .await
            .map_err(failed("remove member"))?;
        Ok(json!({"message": "Member removed successfully", "member_id": member_id}))
    }
}

pub struct ListTeamMembersTool;

#[async_trait]
impl AdminTool for ListTeamMembersTool {
    fn name(&self) -> &str {
        "list_team_members"
    }

    fn description(&self) -> &str {
        "List the members of a team with their roles"
    }

    fn schema(&self) -> Value {
        team_id_schema()
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let members = ctx
            .teams
            .list_team_members(required_str(&args, "teamId")?)
            .await
            .map_err(failed("list members"))?;
        Ok(json!({"count": members.len(), "members": members}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_with;
    use m365_core::directory::TeamLifecycle;
    use m365_core::testing::FakeDirectory;

    #[tokio::test]
    async fn team_channel_member_round_trip() {
        let (fake, ctx) = context_with(FakeDirectory::new().with_user("ana@contoso.com"));
        let team = CreateTeamTool
            .call(
                json!({"displayName": "Ops", "description": "Operations", "visibility": "PUBLIC"}),
                &ctx,
            )
            .await
            .unwrap();
        let team_id = team["team_id"].as_str().unwrap().to_string();
        assert_eq!(team["owner_attached"], false);

        let channel = CreateChannelTool
            .call(json!({"teamId": team_id, "displayName": "alerts"}), &ctx)
            .await
            .unwrap();
        let listed = ListChannelsTool
            .call(json!({"teamId": team_id}), &ctx)
            .await
            .unwrap();
        assert_eq!(listed["count"], 1);

        let member = AddTeamMemberTool
            .call(
                json!({"teamId": team_id, "userEmail": "ana@contoso.com", "role": "owner"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(member["role"], "owner");
        assert_eq!(fake.member_count(&team_id), 1);

        RemoveTeamMemberTool
            .call(json!({"teamId": team_id, "memberId": member["member_id"]}), &ctx)
            .await
            .unwrap();
        DeleteChannelTool
            .call(json!({"teamId": team_id, "channelId": channel["channel_id"]}), &ctx)
            .await
            .unwrap();
        assert_eq!(fake.member_count(&team_id), 0);
        assert!(fake.channel_names(&team_id).is_empty());

        ArchiveTeamTool
            .call(json!({"teamId": team_id}), &ctx)
            .await
            .unwrap();
        let fetched = GetTeamTool
            .call(json!({"teamId": team_id}), &ctx)
            .await
            .unwrap();
        assert_eq!(fetched["lifecycle"], "archived");
        assert_eq!(fake.team_lifecycle(&team_id), Some(TeamLifecycle::Archived));
    }

    #[tokio::test]
    async fn invalid_enum_arguments_are_rejected_up_front() {
        let (fake, ctx) = context_with(FakeDirectory::new());
        let err = CreateTeamTool
            .call(
                json!({"displayName": "Ops", "description": "", "visibility": "secret"}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.contains("invalid visibility"));

        let err = AddTeamMemberTool
            .call(
                json!({"teamId": "team-1", "userEmail": "ana@contoso.com", "role": "admin"}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.contains("invalid role"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_fails_add_member() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let team = CreateTeamTool
            .call(json!({"displayName": "Ops", "description": "x"}), &ctx)
            .await
            .unwrap();
        let err = AddTeamMemberTool
            .call(
                json!({"teamId": team["team_id"], "userEmail": "ghost@contoso.com"}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err, "failed to add member: user not found: ghost@contoso.com");
    }
}
