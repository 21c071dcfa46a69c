//! Scripted in-memory [`ResourceClient`] for tests.
//!
//! Every call is recorded as a label (`"create_channel:alerts"`,
//! `"delete_channel:channel-3"`, ...) in invocation order. Any label can be
//! made to fail with [`FakeDirectory::fail_on`] or to hang with
//! [`FakeDirectory::stall_on`].
//!
//! Labels:
//! `create_team:<name>`, `get_team:<id>`, `list_teams`, `archive_team:<id>`,
//! `create_channel:<name>`, `list_channels:<team>`, `delete_channel:<id>`,
//! `resolve_user:<email>`, `add_member:<user id>`, `remove_member:<id>`,
//! `list_members:<team>`, `create_user:<upn>`, `get_user:<upn>`,
//! `list_users`, `send_mail:<from>`, `organization`.

use crate::directory::{
    ChannelInfo, CreatedResource, MemberInfo, MemberRole, NewChannel, NewTeam, NewUser,
    OutgoingMail, RemoteError, RemoteResult, ResourceClient, TeamInfo, TeamLifecycle,
    TeamSummary, UserInfo,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct FakeTeam {
    name: String,
    description: String,
    visibility: crate::directory::TeamVisibility,
    lifecycle: TeamLifecycle,
}

#[derive(Debug, Clone)]
struct FakeChannel {
    team_id: String,
    info: ChannelInfo,
}

#[derive(Debug, Clone)]
struct FakeMember {
    team_id: String,
    user_id: String,
    role: MemberRole,
}

#[derive(Default)]
struct State {
    next_id: u64,
    calls: Vec<String>,
    failures: HashSet<String>,
    stalls: HashSet<String>,
    users: BTreeMap<String, UserInfo>,
    teams: BTreeMap<String, FakeTeam>,
    channels: BTreeMap<String, FakeChannel>,
    members: BTreeMap<String, FakeMember>,
    sent: Vec<(String, OutgoingMail)>,
    organization: Option<String>,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<State>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.lock().organization = Some("Contoso".to_string());
        fake
    }

    /// Register a directory user that `resolve_user` / `get_user` can find.
    pub fn with_user(self, email: &str) -> Self {
        {
            let mut st = self.lock();
            let id = st.id("user");
            st.users.insert(
                email.to_ascii_lowercase(),
                UserInfo {
                    id,
                    user_principal_name: email.to_string(),
                    display_name: Some(email.split('@').next().unwrap_or(email).to_string()),
                    given_name: None,
                    surname: None,
                    mail: Some(email.to_string()),
                    account_enabled: Some(true),
                },
            );
        }
        self
    }

    /// Make every call recorded under `label` fail.
    pub fn fail_on(self, label: &str) -> Self {
        self.lock().failures.insert(label.to_string());
        self
    }

    /// Make every call recorded under `label` hang forever.
    pub fn stall_on(self, label: &str) -> Self {
        self.lock().stalls.insert(label.to_string());
        self
    }

    pub fn without_organization(self) -> Self {
        self.lock().organization = None;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Recorded calls whose label starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn user_id(&self, email: &str) -> Option<String> {
        self.lock()
            .users
            .get(&email.to_ascii_lowercase())
            .map(|u| u.id.clone())
    }

    pub fn team_lifecycle(&self, team_id: &str) -> Option<TeamLifecycle> {
        self.lock().teams.get(team_id).map(|t| t.lifecycle)
    }

    pub fn channel_names(&self, team_id: &str) -> Vec<String> {
        self.lock()
            .channels
            .values()
            .filter(|c| c.team_id == team_id)
            .map(|c| c.info.display_name.clone())
            .collect()
    }

    pub fn member_count(&self, team_id: &str) -> usize {
        self.lock()
            .members
            .values()
            .filter(|m| m.team_id == team_id)
            .count()
    }

    pub fn sent_mail(&self) -> Vec<(String, OutgoingMail)> {
        self.lock().sent.clone()
    }

    async fn gate(&self, label: String) -> RemoteResult<()> {
        let (fail, stall) = {
            let mut st = self.lock();
            st.calls.push(label.clone());
            (st.failures.contains(&label), st.stalls.contains(&label))
        };
        if stall {
            std::future::pending::<()>().await;
        }
        if fail {
            return Err(RemoteError::new(Some(500), format!("injected failure: {label}")));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::new(Some(404), format!("{what} not found"))
}

#[async_trait]
impl ResourceClient for FakeDirectory {
    async fn create_team(&self, team: &NewTeam) -> RemoteResult<CreatedResource> {
        self.gate(format!("create_team:{}", team.display_name)).await?;
        let mut st = self.lock();
        let id = st.id("team");
        st.teams.insert(
            id.clone(),
            FakeTeam {
                name: team.display_name.clone(),
                description: team.description.clone(),
                visibility: team.visibility,
                lifecycle: TeamLifecycle::Active,
            },
        );
        Ok(CreatedResource {
            web_url: Some(format!("https://teams.example/{id}")),
            id,
            display_name: team.display_name.clone(),
        })
    }

    async fn get_team(&self, team_id: &str) -> RemoteResult<TeamInfo> {
        self.gate(format!("get_team:{team_id}")).await?;
        let st = self.lock();
        let team = st.teams.get(team_id).ok_or_else(|| not_found("team"))?;
        Ok(TeamInfo {
            id: team_id.to_string(),
            display_name: team.name.clone(),
            description: Some(team.description.clone()),
            visibility: Some(team.visibility),
            web_url: Some(format!("https://teams.example/{team_id}")),
            lifecycle: team.lifecycle,
        })
    }

    async fn list_teams(&self, max_results: usize) -> RemoteResult<Vec<TeamSummary>> {
        self.gate("list_teams".to_string()).await?;
        let st = self.lock();
        Ok(st
            .teams
            .iter()
            .take(max_results)
            .map(|(id, t)| TeamSummary {
                id: id.clone(),
                display_name: t.name.clone(),
                description: Some(t.description.clone()),
                visibility: Some(t.visibility),
            })
            .collect())
    }

    async fn archive_team(&self, team_id: &str) -> RemoteResult<()> {
        self.gate(format!("archive_team:{team_id}")).await?;
        let mut st = self.lock();
        let team = st.teams.get_mut(team_id).ok_or_else(|| not_found("team"))?;
        team.lifecycle = TeamLifecycle::Archived;
        Ok(())
    }

    async fn create_channel(
        &self,
        team_id: &str,
        channel: &NewChannel,
    ) -> RemoteResult<CreatedResource> {
        self.gate(format!("create_channel:{}", channel.display_name)).await?;
        let mut st = self.lock();
        if !st.teams.contains_key(team_id) {
            return Err(not_found("team"));
        }
        let id = st.id("channel");
        let web_url = Some(format!("https://teams.example/{team_id}/{id}"));
        st.channels.insert(
            id.clone(),
            FakeChannel {
                team_id: team_id.to_string(),
                info: ChannelInfo {
                    id: id.clone(),
                    display_name: channel.display_name.clone(),
                    description: channel.description.clone(),
                    email: None,
                    web_url: web_url.clone(),
                    channel_type: Some(channel.channel_type),
                },
            },
        );
        Ok(CreatedResource {
            id,
            display_name: channel.display_name.clone(),
            web_url,
        })
    }

    async fn list_channels(&self, team_id: &str) -> RemoteResult<Vec<ChannelInfo>> {
        self.gate(format!("list_channels:{team_id}")).await?;
        let st = self.lock();
        Ok(st
            .channels
            .values()
            .filter(|c| c.team_id == team_id)
            .map(|c| c.info.clone())
            .collect())
    }

    async fn delete_channel(&self, _team_id: &str, channel_id: &str) -> RemoteResult<()> {
        self.gate(format!("delete_channel:{channel_id}")).await?;
        let mut st = self.lock();
        st.channels
            .remove(channel_id)
            .map(|_| ())
            .ok_or_else(|| not_found("channel"))
    }

    async fn resolve_user(&self, email: &str) -> RemoteResult<Option<String>> {
        self.gate(format!("resolve_user:{email}")).await?;
        let st = self.lock();
        Ok(st
            .users
            .get(&email.to_ascii_lowercase())
            .map(|u| u.id.clone()))
    }

    async fn add_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> RemoteResult<String> {
        self.gate(format!("add_member:{user_id}")).await?;
        let mut st = self.lock();
        if !st.teams.contains_key(team_id) {
            return Err(not_found("team"));
        }
        let id = st.id("membership");
        st.members.insert(
            id.clone(),
            FakeMember {
                team_id: team_id.to_string(),
                user_id: user_id.to_string(),
                role,
            },
        );
        Ok(id)
    }

    async fn remove_member(&self, _team_id: &str, member_id: &str) -> RemoteResult<()> {
        self.gate(format!("remove_member:{member_id}")).await?;
        let mut st = self.lock();
        st.members
            .remove(member_id)
            .map(|_| ())
            .ok_or_else(|| not_found("member"))
    }

    async fn list_members(&self, team_id: &str) -> RemoteResult<Vec<MemberInfo>> {
        self.gate(format!("list_members:{team_id}")).await?;
        let st = self.lock();
        let members = st
            .members
            .iter()
            .filter(|(_, m)| m.team_id == team_id)
            .map(|(id, m)| {
                let user = st.users.values().find(|u| u.id == m.user_id);
                MemberInfo {
                    member_id: id.clone(),
                    user_id: Some(m.user_id.clone()),
                    display_name: user.and_then(|u| u.display_name.clone()),
                    email: user.and_then(|u| u.mail.clone()),
                    role: m.role,
                }
            })
            .collect();
        Ok(members)
    }

    async fn create_user(&self, user: &NewUser) -> RemoteResult<UserInfo> {
        self.gate(format!("create_user:{}", user.user_principal_name)).await?;
        let mut st = self.lock();
        let key = user.user_principal_name.to_ascii_lowercase();
        if st.users.contains_key(&key) {
            return Err(RemoteError::new(
                Some(400),
                "Another object with the same value for property userPrincipalName already exists.",
            ));
        }
        let info = UserInfo {
            id: st.id("user"),
            user_principal_name: user.user_principal_name.clone(),
            display_name: Some(user.display_name.clone()),
            given_name: user.given_name.clone(),
            surname: user.surname.clone(),
            mail: None,
            account_enabled: Some(true),
        };
        st.users.insert(key, info.clone());
        Ok(info)
    }

    async fn get_user(&self, user_principal_name: &str) -> RemoteResult<UserInfo> {
        self.gate(format!("get_user:{user_principal_name}")).await?;
        let st = self.lock();
        st.users
            .get(&user_principal_name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| not_found("user"))
    }

    async fn list_users(&self, max_results: usize) -> RemoteResult<Vec<UserInfo>> {
        self.gate("list_users".to_string()).await?;
        let st = self.lock();
        Ok(st.users.values().take(max_results).cloned().collect())
    }

    async fn send_mail(&self, from: &str, mail: &OutgoingMail) -> RemoteResult<()> {
        self.gate(format!("send_mail:{from}")).await?;
        let mut st = self.lock();
        st.sent.push((from.to_string(), mail.clone()));
        Ok(())
    }

    async fn organization_name(&self) -> RemoteResult<Option<String>> {
        self.gate("organization".to_string()).await?;
        let st = self.lock();
        Ok(st.organization.clone())
    }
}
