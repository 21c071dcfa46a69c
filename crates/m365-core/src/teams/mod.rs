//! Teams, channels and memberships.
//!
//! `TeamsService` exposes the primitive single-resource operations. Each one
//! validates its own inputs, performs one remote call through the injected
//! [`ResourceClient`], and logs the outcome. The compound provisioning
//! workflow in [`provision`] is built only from these primitives.

pub mod provision;
pub mod rollback;

pub use provision::{ChannelSpec, MemberSpec, ProvisioningRequest, ProvisioningResult};
pub use rollback::{CompensationAction, OrchestrationContext, UnwindReport};

use crate::directory::{
    ChannelInfo, ChannelType, MemberInfo, MemberRole, NewChannel, NewTeam, RemoteResult,
    ResourceClient, TeamInfo, TeamSettings, TeamSummary, TeamVisibility,
};
use crate::error::{AdminError, Result};
use crate::validation::{require_non_empty, validate_email};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Inputs and payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CreateTeamRequest {
    pub display_name: String,
    pub description: String,
    pub visibility: TeamVisibility,
    /// Attached after creation on a best-effort basis.
    pub owner_email: Option<String>,
    pub settings: TeamSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamCreated {
    pub team_id: String,
    pub display_name: String,
    pub web_url: Option<String>,
    /// False when an owner was requested but could not be attached.
    pub owner_attached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCreated {
    pub channel_id: String,
    pub display_name: String,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberAdded {
    pub member_id: String,
    pub user_id: String,
    pub user_email: String,
    pub role: MemberRole,
}

// ---------------------------------------------------------------------------
// TeamsService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TeamsService {
    client: Arc<dyn ResourceClient>,
    timeout: Option<Duration>,
}

impl TeamsService {
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Bound every remote call. An elapsed limit surfaces as
    /// `AdminError::Timeout`, an ordinary primitive failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn remote<T>(
        &self,
        what: String,
        call: impl Future<Output = RemoteResult<T>>,
    ) -> Result<T> {
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AdminError::Timeout(what.clone(), limit.as_secs()))?,
            None => call.await,
        };
        outcome.map_err(|e| AdminError::remote(what, e))
    }

    pub async fn create_team(&self, request: &CreateTeamRequest) -> Result<TeamCreated> {
        let name = require_non_empty("display_name", &request.display_name)?;
        if let Some(owner) = &request.owner_email {
            validate_email(owner)?;
        }
        tracing::info!(team = %name, visibility = %request.visibility, "creating team");

        let new_team = NewTeam {
            display_name: name.to_string(),
            description: request.description.clone(),
            visibility: request.visibility,
            settings: request.settings.clone(),
        };
        let created = self
            .remote(
                format!("create team '{name}'"),
                self.client.create_team(&new_team),
            )
            .await?;
        tracing::info!(team_id = %created.id, "team created");

        let mut owner_attached = false;
        if let Some(owner) = &request.owner_email {
            match self
                .add_team_member(&created.id, owner, MemberRole::Owner)
                .await
            {
                Ok(_) => owner_attached = true,
                Err(e) => {
                    tracing::warn!(team_id = %created.id, owner = %owner, error = %e, "failed to add owner");
                }
            }
        }

        Ok(TeamCreated {
            team_id: created.id,
            display_name: created.display_name,
            web_url: created.web_url,
            owner_attached,
        })
    }

    pub async fn get_team(&self, team_id: &str) -> Result<TeamInfo> {
        let team_id = require_non_empty("team_id", team_id)?;
        tracing::info!(team_id = %team_id, "retrieving team");
        self.remote(format!("get team {team_id}"), self.client.get_team(team_id))
            .await
    }

    pub async fn list_teams(&self, max_results: usize) -> Result<Vec<TeamSummary>> {
        tracing::info!(max_results, "listing teams");
        self.remote("list teams".to_string(), self.client.list_teams(max_results))
            .await
    }

    /// The delete primitive. Teams are archived, never hard-deleted, so the
    /// call is safe to repeat.
    pub async fn archive_team(&self, team_id: &str) -> Result<()> {
        let team_id = require_non_empty("team_id", team_id)?;
        tracing::info!(team_id = %team_id, "archiving team");
        self.remote(
            format!("archive team {team_id}"),
            self.client.archive_team(team_id),
        )
        .await?;
        tracing::info!(team_id = %team_id, "team archived");
        Ok(())
    }

    pub async fn create_channel(
        &self,
        team_id: &str,
        display_name: &str,
        description: Option<&str>,
        channel_type: ChannelType,
    ) -> Result<ChannelCreated> {
        let team_id = require_non_empty("team_id", team_id)?;
        let name = require_non_empty("display_name", display_name)?;
        tracing::info!(team_id = %team_id, channel = %name, "creating channel");

        let channel = NewChannel {
            display_name: name.to_string(),
            description: description.map(str::to_string),
            channel_type,
        };
        let created = self
            .remote(
                format!("create channel '{name}'"),
                self.client.create_channel(team_id, &channel),
            )
            .await?;
        tracing::info!(channel_id = %created.id, "channel created");

        Ok(ChannelCreated {
            channel_id: created.id,
            display_name: created.display_name,
            web_url: created.web_url,
        })
    }

    pub async fn list_channels(&self, team_id: &str) -> Result<Vec<ChannelInfo>> {
        let team_id = require_non_empty("team_id", team_id)?;
        tracing::info!(team_id = %team_id, "listing channels");
        self.remote(
            format!("list channels of {team_id}"),
            self.client.list_channels(team_id),
        )
        .await
    }

    pub async fn delete_channel(&self, team_id: &str, channel_id: &str) -> Result<()> {
        let team_id = require_non_empty("team_id", team_id)?;
        let channel_id = require_non_empty("channel_id", channel_id)?;
        tracing::info!(team_id = %team_id, channel_id = %channel_id, "deleting channel");
        self.remote(
            format!("delete channel {channel_id}"),
            self.client.delete_channel(team_id, channel_id),
        )
        .await?;
        tracing::info!(channel_id = %channel_id, "channel deleted");
        Ok(())
    }

    /// Resolve `user_email` to a directory identity and add it to the team.
    pub async fn add_team_member(
        &self,
        team_id: &str,
        user_email: &str,
        role: MemberRole,
    ) -> Result<MemberAdded> {
        let team_id = require_non_empty("team_id", team_id)?;
        let email = validate_email(user_email)?;
        tracing::info!(team_id = %team_id, user = %email, role = %role, "adding team member");

        let user_id = self
            .remote(
                format!("look up user {email}"),
                self.client.resolve_user(email),
            )
            .await?
            .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

        let member_id = self
            .remote(
                format!("add {role} {email}"),
                self.client.add_member(team_id, &user_id, role),
            )
            .await?;
        tracing::info!(member_id = %member_id, user = %email, role = %role, "member added");

        Ok(MemberAdded {
            member_id,
            user_id,
            user_email: email.to_string(),
            role,
        })
    }

    pub async fn remove_team_member(&self, team_id: &str, member_id: &str) -> Result<()> {
        let team_id = require_non_empty("team_id", team_id)?;
        let member_id = require_non_empty("member_id", member_id)?;
        tracing::info!(team_id = %team_id, member_id = %member_id, "removing team member");
        self.remote(
            format!("remove member {member_id}"),
            self.client.remove_member(team_id, member_id),
        )
        .await?;
        tracing::info!(member_id = %member_id, "member removed");
        Ok(())
    }

    pub async fn list_team_members(&self, team_id: &str) -> Result<Vec<MemberInfo>> {
        let team_id = require_non_empty("team_id", team_id)?;
        tracing::info!(team_id = %team_id, "listing team members");
        self.remote(
            format!("list members of {team_id}"),
            self.client.list_members(team_id),
        )
        .await
    }
}
