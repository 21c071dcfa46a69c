//! [`ResourceClient`] over Microsoft Graph.

use crate::client::GraphClient;
use crate::error::GraphError;
use crate::types::{
    recipients, Channel, ChannelCreateBody, Collection, Group, ItemBody, Member, MemberAddBody,
    Message, Organization, SendMailBody, Team, TeamCreateBody, User, UserCreateBody, UserId,
};
use async_trait::async_trait;
use m365_core::directory::{
    ChannelInfo, CreatedResource, MemberInfo, MemberRole, NewChannel, NewTeam, NewUser,
    OutgoingMail, RemoteResult, TeamInfo, TeamSummary, UserInfo,
};
use m365_core::ResourceClient;
use serde_json::json;

/// Graph refuses `$top` above this on directory collections.
const MAX_PAGE_SIZE: usize = 999;

const TEAM_FILTER: &str = "resourceProvisioningOptions/Any(x:x eq 'Team')";

/// Pull the team id out of a `/teams('{id}')` style location header.
fn team_id_from_location(location: &str) -> Option<String> {
    let start = location.find("teams('")? + "teams('".len();
    let len = location[start..].find("')")?;
    Some(location[start..start + len].to_string())
}

/// OData string literal escaping: single quotes are doubled.
fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn page_size(max_results: usize) -> String {
    max_results.clamp(1, MAX_PAGE_SIZE).to_string()
}

#[async_trait]
impl ResourceClient for GraphClient {
    async fn create_team(&self, team: &NewTeam) -> RemoteResult<CreatedResource> {
        let response = self
            .post_accepted("/teams", &TeamCreateBody::from(team))
            .await?;
        let location = ["content-location", "location"].into_iter().find_map(|h| {
            response
                .headers()
                .get(h)
                .and_then(|v| v.to_str().ok())
                .and_then(team_id_from_location)
        });
        let id = match location {
            Some(id) => id,
            None => {
                let created: Team = response.json().await.map_err(GraphError::from)?;
                created.id
            }
        };
        Ok(CreatedResource {
            id,
            display_name: team.display_name.clone(),
            web_url: None,
        })
    }

    async fn get_team(&self, team_id: &str) -> RemoteResult<TeamInfo> {
        let team: Team = self.get(&format!("/teams/{team_id}"), &[]).await?;
        Ok(team.into())
    }

    async fn list_teams(&self, max_results: usize) -> RemoteResult<Vec<TeamSummary>> {
        let groups: Collection<Group> = self
            .get(
                "/groups",
                &[
                    ("$filter", TEAM_FILTER.to_string()),
                    ("$select", "id,displayName,description,visibility".to_string()),
                    ("$top", page_size(max_results)),
                ],
            )
            .await?;
        Ok(groups
            .value
            .into_iter()
            .take(max_results)
            .map(Into::into)
            .collect())
    }

    async fn archive_team(&self, team_id: &str) -> RemoteResult<()> {
        self.post_accepted(&format!("/teams/{team_id}/archive"), &json!({}))
            .await?;
        Ok(())
    }

    async fn create_channel(
        &self,
        team_id: &str,
        channel: &NewChannel,
    ) -> RemoteResult<CreatedResource> {
        let created: Channel = self
            .post(
                &format!("/teams/{team_id}/channels"),
                &ChannelCreateBody::from(channel),
            )
            .await?;
        Ok(CreatedResource {
            id: created.id,
            display_name: created.display_name,
            web_url: created.web_url,
        })
    }

    async fn list_channels(&self, team_id: &str) -> RemoteResult<Vec<ChannelInfo>> {
        let channels: Collection<Channel> =
            self.get(&format!("/teams/{team_id}/channels"), &[]).await?;
        Ok(channels.value.into_iter().map(Into::into).collect())
    }

    async fn delete_channel(&self, team_id: &str, channel_id: &str) -> RemoteResult<()> {
        self.delete(&format!("/teams/{team_id}/channels/{channel_id}"))
            .await?;
        Ok(())
    }

    async fn resolve_user(&self, email: &str) -> RemoteResult<Option<String>> {
        let users: Collection<UserId> = self
            .get(
                "/users",
                &[
                    ("$filter", format!("userPrincipalName eq {}", odata_quote(email))),
                    ("$select", "id".to_string()),
                ],
            )
            .await?;
        Ok(users.value.into_iter().next().map(|u| u.id))
    }

    async fn add_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> RemoteResult<String> {
        let body = MemberAddBody::new(self.base_url(), user_id, role);
        let member: Member = self
            .post(&format!("/teams/{team_id}/members"), &body)
            .await?;
        Ok(member.id)
    }

    async fn remove_member(&self, team_id: &str, member_id: &str) -> RemoteResult<()> {
        self.delete(&format!("/teams/{team_id}/members/{member_id}"))
            .await?;
        Ok(())
    }

    async fn list_members(&self, team_id: &str) -> RemoteResult<Vec<MemberInfo>> {
        let members: Collection<Member> =
            self.get(&format!("/teams/{team_id}/members"), &[]).await?;
        Ok(members.value.into_iter().map(Into::into).collect())
    }

    async fn create_user(&self, user: &NewUser) -> RemoteResult<UserInfo> {
        let created: User = self.post("/users", &UserCreateBody::from(user)).await?;
        Ok(created.into())
    }

    async fn get_user(&self, user_principal_name: &str) -> RemoteResult<UserInfo> {
        let user: User = self
            .get(&format!("/users/{user_principal_name}"), &[])
            .await?;
        Ok(user.into())
    }

    async fn list_users(&self, max_results: usize) -> RemoteResult<Vec<UserInfo>> {
        let users: Collection<User> = self
            .get(
                "/users",
                &[
                    (
                        "$select",
                        "id,userPrincipalName,displayName,givenName,surname,mail,accountEnabled"
                            .to_string(),
                    ),
                    ("$top", page_size(max_results)),
                ],
            )
            .await?;
        Ok(users
            .value
            .into_iter()
            .take(max_results)
            .map(Into::into)
            .collect())
    }

    async fn send_mail(&self, from: &str, mail: &OutgoingMail) -> RemoteResult<()> {
        let body = SendMailBody {
            message: Message {
                subject: mail.subject.clone(),
                body: ItemBody {
                    content_type: "HTML",
                    content: mail.html_body.clone(),
                },
                to_recipients: recipients(&mail.to),
                cc_recipients: recipients(&mail.cc),
                bcc_recipients: recipients(&mail.bcc),
            },
            save_to_sent_items: mail.save_to_sent_items,
        };
        self.post_accepted(&format!("/users/{from}/sendMail"), &body)
            .await?;
        Ok(())
    }

    async fn organization_name(&self) -> RemoteResult<Option<String>> {
        let orgs: Collection<Organization> = self
            .get("/organization", &[("$select", "displayName".to_string())])
            .await?;
        Ok(orgs.value.into_iter().next().and_then(|o| o.display_name))
    }
}
