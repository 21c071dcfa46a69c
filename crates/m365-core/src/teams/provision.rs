//! Compound team provisioning with compensating rollback.
//!
//! The workflow runs strictly in sequence: create the team, then each
//! channel in input order, then each member in input order. Every forward
//! step that succeeds registers its reversal on the workflow's
//! [`OrchestrationContext`]; any failure unwinds everything created so far
//! and the triggering error is returned.
//!
//! The owner passed in the request is attached right after the team's
//! archive compensation is registered, and only on a best-effort basis.
//! Members in the explicit member list are not: an unknown email fails the
//! workflow.

use super::rollback::OrchestrationContext;
use super::{CreateTeamRequest, TeamsService};
use crate::directory::{ChannelType, MemberRole, TeamSettings, TeamVisibility};
use crate::error::Result;
use crate::validation::{require_non_empty, validate_email};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub channel_type: ChannelType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemberSpec {
    pub email: String,
    #[serde(default)]
    pub role: MemberRole,
}

/// Input of `provision_team_with_structure`. Field names follow the
/// `provision_team` tool arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRequest {
    pub team_name: String,
    pub team_description: String,
    pub owner_email: String,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
    #[serde(default)]
    pub visibility: TeamVisibility,
}

impl ProvisioningRequest {
    /// Reject the request before anything is created remotely.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("teamName", &self.team_name)?;
        validate_email(&self.owner_email)?;
        for channel in &self.channels {
            require_non_empty("channels[].name", &channel.name)?;
        }
        for member in &self.members {
            validate_email(&member.email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisioningResult {
    pub team_id: String,
    pub team_name: String,
    pub team_url: Option<String>,
    pub channels_created: usize,
    pub members_added: usize,
}

impl TeamsService {
    /// Provision a team with its channels and members, or (best-effort)
    /// nothing at all.
    ///
    /// If the returned future is dropped part-way, the context's `Drop`
    /// still unwinds the steps that had completed.
    pub async fn provision_team_with_structure(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningResult> {
        request.validate()?;
        tracing::info!(team = %request.team_name, "provisioning team with structure");

        let mut ctx = OrchestrationContext::new(format!("provision team '{}'", request.team_name));
        let outcome = self.provision_steps(request, &mut ctx).await;
        if let Err(e) = &outcome {
            tracing::warn!(team = %request.team_name, error = %e, "team provisioning failed");
        }
        ctx.finish(outcome).await
    }

    async fn provision_steps(
        &self,
        request: &ProvisioningRequest,
        ctx: &mut OrchestrationContext,
    ) -> Result<ProvisioningResult> {
        let team = self
            .create_team(&CreateTeamRequest {
                display_name: request.team_name.clone(),
                description: request.team_description.clone(),
                visibility: request.visibility,
                owner_email: None,
                settings: TeamSettings::default(),
            })
            .await?;
        let team_id = team.team_id.clone();
        {
            let svc = self.clone();
            let team_id = team_id.clone();
            ctx.register(format!("archive team {}", request.team_name), move || async move {
                svc.archive_team(&team_id).await
            });
        }

        // Best-effort; no compensation is registered for the owner.
        if let Err(e) = self
            .add_team_member(&team_id, &request.owner_email, MemberRole::Owner)
            .await
        {
            tracing::warn!(
                team_id = %team_id,
                owner = %request.owner_email,
                error = %e,
                "failed to add owner"
            );
        }

        let mut channels_created = 0;
        for spec in &request.channels {
            let channel = self
                .create_channel(
                    &team_id,
                    &spec.name,
                    spec.description.as_deref(),
                    spec.channel_type,
                )
                .await?;
            channels_created += 1;

            let svc = self.clone();
            let team_id = team_id.clone();
            ctx.register(format!("delete channel {}", spec.name), move || async move {
                svc.delete_channel(&team_id, &channel.channel_id).await
            });
        }

        let mut members_added = 0;
        for spec in &request.members {
            let member = self
                .add_team_member(&team_id, &spec.email, spec.role)
                .await?;
            members_added += 1;

            let svc = self.clone();
            let team_id = team_id.clone();
            ctx.register(format!("remove member {}", spec.email), move || async move {
                svc.remove_team_member(&team_id, &member.member_id).await
            });
        }

        ctx.mark_success();
        tracing::info!(
            team_id = %team_id,
            channels_created,
            members_added,
            "team provisioning completed"
        );

        Ok(ProvisioningResult {
            team_id,
            team_name: request.team_name.clone(),
            team_url: team.web_url,
            channels_created,
            members_added,
        })
    }
}
