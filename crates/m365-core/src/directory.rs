//! Boundary to the remote directory / collaboration service.
//!
//! Everything the core needs from Microsoft Graph goes through
//! [`ResourceClient`]. The production implementation lives in the
//! `graph-client` crate; tests use `crate::testing::FakeDirectory`.
//!
//! The core does not distinguish kinds of remote failure (not-found,
//! forbidden, throttled, network): every call either succeeds or returns a
//! [`RemoteError`].

use crate::error::AdminError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status, when the failure came back from the service.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "remote call failed ({status}): {}", self.message),
            None => write!(f, "remote call failed: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TeamVisibility {
    Public,
    #[default]
    Private,
}

impl TeamVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamVisibility::Public => "public",
            TeamVisibility::Private => "private",
        }
    }
}

impl FromStr for TeamVisibility {
    type Err = AdminError;
    fn from_str(s: &str) -> Result<Self, AdminError> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(TeamVisibility::Public),
            "private" => Ok(TeamVisibility::Private),
            _ => Err(AdminError::InvalidVisibility(s.to_string())),
        }
    }
}

impl TryFrom<String> for TeamVisibility {
    type Error = AdminError;
    fn try_from(s: String) -> Result<Self, AdminError> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ChannelType {
    #[default]
    Standard,
    Private,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Standard => "standard",
            ChannelType::Private => "private",
        }
    }
}

impl FromStr for ChannelType {
    type Err = AdminError;
    fn from_str(s: &str) -> Result<Self, AdminError> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ChannelType::Standard),
            "private" => Ok(ChannelType::Private),
            _ => Err(AdminError::InvalidChannelType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ChannelType {
    type Error = AdminError;
    fn try_from(s: String) -> Result<Self, AdminError> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MemberRole {
    Owner,
    #[default]
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Member => "member",
        }
    }
}

impl FromStr for MemberRole {
    type Err = AdminError;
    fn from_str(s: &str) -> Result<Self, AdminError> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(MemberRole::Owner),
            "member" => Ok(MemberRole::Member),
            _ => Err(AdminError::InvalidRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for MemberRole {
    type Error = AdminError;
    fn try_from(s: String) -> Result<Self, AdminError> {
        s.parse()
    }
}

macro_rules! display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(TeamVisibility, ChannelType, MemberRole);

/// Lifecycle of a team. Archiving is the delete primitive, so a team that
/// was "deleted" still exists remotely in the `Archived` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamLifecycle {
    Active,
    Archived,
}

impl TeamLifecycle {
    pub fn from_archived(is_archived: bool) -> Self {
        if is_archived {
            TeamLifecycle::Archived
        } else {
            TeamLifecycle::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiphyRating {
    Strict,
    #[default]
    Moderate,
}

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

/// Team-level behaviour switches applied at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamSettings {
    pub allow_guest_create_channels: bool,
    pub allow_guest_delete_channels: bool,
    pub allow_create_update_channels: bool,
    pub allow_delete_channels: bool,
    pub allow_add_remove_apps: bool,
    pub allow_create_update_remove_tabs: bool,
    pub allow_create_update_remove_connectors: bool,
    pub allow_user_edit_messages: bool,
    pub allow_user_delete_messages: bool,
    pub allow_team_mentions: bool,
    pub allow_channel_mentions: bool,
    pub allow_giphy: bool,
    pub giphy_content_rating: GiphyRating,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            allow_guest_create_channels: false,
            allow_guest_delete_channels: false,
            allow_create_update_channels: true,
            allow_delete_channels: true,
            allow_add_remove_apps: true,
            allow_create_update_remove_tabs: true,
            allow_create_update_remove_connectors: true,
            allow_user_edit_messages: true,
            allow_user_delete_messages: true,
            allow_team_mentions: true,
            allow_channel_mentions: true,
            allow_giphy: true,
            giphy_content_rating: GiphyRating::Moderate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeam {
    pub display_name: String,
    pub description: String,
    pub visibility: TeamVisibility,
    pub settings: TeamSettings,
}

/// Identifier and location of a freshly created remote resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedResource {
    pub id: String,
    pub display_name: String,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamInfo {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub visibility: Option<TeamVisibility>,
    pub web_url: Option<String>,
    pub lifecycle: TeamLifecycle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub visibility: Option<TeamVisibility>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub display_name: String,
    pub description: Option<String>,
    pub channel_type: ChannelType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelInfo {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub web_url: Option<String>,
    pub channel_type: Option<ChannelType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberInfo {
    pub member_id: String,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: MemberRole,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub user_principal_name: String,
    pub display_name: String,
    pub mail_nickname: String,
    pub password: String,
    pub force_change_password: bool,
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub user_principal_name: String,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub mail: Option<String>,
    pub account_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub subject: String,
    pub html_body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub save_to_sent_items: bool,
}

// ---------------------------------------------------------------------------
// ResourceClient
// ---------------------------------------------------------------------------

/// Single-resource operations against the remote service.
///
/// Each method maps to exactly one remote call. Implementations must be
/// safe to share across concurrently running provisioning requests.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn create_team(&self, team: &NewTeam) -> RemoteResult<CreatedResource>;

    async fn get_team(&self, team_id: &str) -> RemoteResult<TeamInfo>;

    async fn list_teams(&self, max_results: usize) -> RemoteResult<Vec<TeamSummary>>;

    /// Soft-delete. Archiving an already archived team must succeed.
    async fn archive_team(&self, team_id: &str) -> RemoteResult<()>;

    async fn create_channel(
        &self,
        team_id: &str,
        channel: &NewChannel,
    ) -> RemoteResult<CreatedResource>;

    async fn list_channels(&self, team_id: &str) -> RemoteResult<Vec<ChannelInfo>>;

    async fn delete_channel(&self, team_id: &str, channel_id: &str) -> RemoteResult<()>;

    /// Look up a directory identity by user principal name.
    /// `Ok(None)` means the lookup succeeded but found nobody.
    async fn resolve_user(&self, email: &str) -> RemoteResult<Option<String>>;

    /// Returns the membership id (distinct from the user id).
    async fn add_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> RemoteResult<String>;

    async fn remove_member(&self, team_id: &str, member_id: &str) -> RemoteResult<()>;

    async fn list_members(&self, team_id: &str) -> RemoteResult<Vec<MemberInfo>>;

    async fn create_user(&self, user: &NewUser) -> RemoteResult<UserInfo>;

    async fn get_user(&self, user_principal_name: &str) -> RemoteResult<UserInfo>;

    async fn list_users(&self, max_results: usize) -> RemoteResult<Vec<UserInfo>>;

    async fn send_mail(&self, from: &str, mail: &OutgoingMail) -> RemoteResult<()>;

    /// Connection probe: the tenant's display name, if any is returned.
    async fn organization_name(&self) -> RemoteResult<Option<String>>;
}
