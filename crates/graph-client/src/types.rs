//! Wire shapes of the Microsoft Graph v1.0 resources this crate touches.
//!
//! Only the fields the admin server reads or writes are modelled; unknown
//! fields are ignored on deserialization.

use m365_core::directory::{
    ChannelInfo, ChannelType, MemberInfo, MemberRole, NewChannel, NewTeam, NewUser, TeamInfo,
    TeamLifecycle, TeamSummary, TeamVisibility, UserInfo,
};
use serde::{Deserialize, Serialize};

pub const TEAM_TEMPLATE_BINDING: &str =
    "https://graph.microsoft.com/v1.0/teamsTemplates('standard')";
pub const AAD_USER_MEMBER_TYPE: &str = "#microsoft.graph.aadUserConversationMember";

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCreateBody {
    #[serde(rename = "template@odata.bind")]
    pub template: &'static str,
    pub display_name: String,
    pub description: String,
    pub visibility: &'static str,
    pub member_settings: MemberSettings,
    pub guest_settings: GuestSettings,
    pub messaging_settings: MessagingSettings,
    pub fun_settings: FunSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSettings {
    pub allow_create_update_channels: bool,
    pub allow_delete_channels: bool,
    pub allow_add_remove_apps: bool,
    pub allow_create_update_remove_tabs: bool,
    pub allow_create_update_remove_connectors: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSettings {
    pub allow_create_update_channels: bool,
    pub allow_delete_channels: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingSettings {
    pub allow_user_edit_messages: bool,
    pub allow_user_delete_messages: bool,
    pub allow_team_mentions: bool,
    pub allow_channel_mentions: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunSettings {
    pub allow_giphy: bool,
    pub giphy_content_rating: &'static str,
}

impl From<&NewTeam> for TeamCreateBody {
    fn from(team: &NewTeam) -> Self {
        let s = &team.settings;
        Self {
            template: TEAM_TEMPLATE_BINDING,
            display_name: team.display_name.clone(),
            description: team.description.clone(),
            visibility: graph_visibility(team.visibility),
            member_settings: MemberSettings {
                allow_create_update_channels: s.allow_create_update_channels,
                allow_delete_channels: s.allow_delete_channels,
                allow_add_remove_apps: s.allow_add_remove_apps,
                allow_create_update_remove_tabs: s.allow_create_update_remove_tabs,
                allow_create_update_remove_connectors: s.allow_create_update_remove_connectors,
            },
            guest_settings: GuestSettings {
                allow_create_update_channels: s.allow_guest_create_channels,
                allow_delete_channels: s.allow_guest_delete_channels,
            },
            messaging_settings: MessagingSettings {
                allow_user_edit_messages: s.allow_user_edit_messages,
                allow_user_delete_messages: s.allow_user_delete_messages,
                allow_team_mentions: s.allow_team_mentions,
                allow_channel_mentions: s.allow_channel_mentions,
            },
            fun_settings: FunSettings {
                allow_giphy: s.allow_giphy,
                giphy_content_rating: match s.giphy_content_rating {
                    m365_core::directory::GiphyRating::Strict => "strict",
                    m365_core::directory::GiphyRating::Moderate => "moderate",
                },
            },
        }
    }
}

fn graph_visibility(v: TeamVisibility) -> &'static str {
    match v {
        TeamVisibility::Public => "public",
        TeamVisibility::Private => "private",
    }
}

fn parse_visibility(v: Option<&str>) -> Option<TeamVisibility> {
    v.and_then(|v| v.parse().ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

impl From<Team> for TeamInfo {
    fn from(t: Team) -> Self {
        TeamInfo {
            visibility: parse_visibility(t.visibility.as_deref()),
            lifecycle: TeamLifecycle::from_archived(t.is_archived),
            id: t.id,
            display_name: t.display_name,
            description: t.description,
            web_url: t.web_url,
        }
    }
}

/// A group as returned by `GET /groups`; teams are groups provisioned
/// with the `Team` resource option.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub description: Option<String>,
    pub visibility: Option<String>,
}

impl From<Group> for TeamSummary {
    fn from(g: Group) -> Self {
        TeamSummary {
            visibility: parse_visibility(g.visibility.as_deref()),
            id: g.id,
            display_name: g.display_name,
            description: g.description,
        }
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCreateBody {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub membership_type: &'static str,
}

impl From<&NewChannel> for ChannelCreateBody {
    fn from(c: &NewChannel) -> Self {
        Self {
            display_name: c.display_name.clone(),
            description: c.description.clone(),
            membership_type: c.channel_type.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub web_url: Option<String>,
    pub membership_type: Option<String>,
}

impl From<Channel> for ChannelInfo {
    fn from(c: Channel) -> Self {
        ChannelInfo {
            channel_type: c
                .membership_type
                .as_deref()
                .and_then(|t| t.parse::<ChannelType>().ok()),
            id: c.id,
            display_name: c.display_name,
            description: c.description,
            email: c.email,
            web_url: c.web_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MemberAddBody {
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    pub roles: Vec<&'static str>,
    #[serde(rename = "user@odata.bind")]
    pub user_binding: String,
}

impl MemberAddBody {
    pub fn new(base_url: &str, user_id: &str, role: MemberRole) -> Self {
        Self {
            odata_type: AAD_USER_MEMBER_TYPE,
            roles: match role {
                MemberRole::Owner => vec!["owner"],
                MemberRole::Member => Vec::new(),
            },
            user_binding: format!("{base_url}/users('{user_id}')"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl From<Member> for MemberInfo {
    fn from(m: Member) -> Self {
        let role = if m.roles.iter().any(|r| r.eq_ignore_ascii_case("owner")) {
            MemberRole::Owner
        } else {
            MemberRole::Member
        };
        MemberInfo {
            member_id: m.id,
            user_id: m.user_id,
            display_name: m.display_name,
            email: m.email,
            role,
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateBody {
    pub account_enabled: bool,
    pub display_name: String,
    pub mail_nickname: String,
    pub user_principal_name: String,
    pub password_profile: PasswordProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
    pub force_change_password_next_sign_in: bool,
    pub password: String,
}

impl From<&NewUser> for UserCreateBody {
    fn from(u: &NewUser) -> Self {
        Self {
            account_enabled: true,
            display_name: u.display_name.clone(),
            mail_nickname: u.mail_nickname.clone(),
            user_principal_name: u.user_principal_name.clone(),
            password_profile: PasswordProfile {
                force_change_password_next_sign_in: u.force_change_password,
                password: u.password.clone(),
            },
            given_name: u.given_name.clone(),
            surname: u.surname.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub user_principal_name: String,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub mail: Option<String>,
    pub account_enabled: Option<bool>,
}

impl From<User> for UserInfo {
    fn from(u: User) -> Self {
        UserInfo {
            id: u.id,
            user_principal_name: u.user_principal_name,
            display_name: u.display_name,
            given_name: u.given_name,
            surname: u.surname,
            mail: u.mail,
            account_enabled: u.account_enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserId {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Mail
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailBody {
    pub message: Message,
    pub save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub subject: String,
    pub body: ItemBody,
    pub to_recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc_recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc_recipients: Vec<Recipient>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Serialize)]
pub struct EmailAddress {
    pub address: String,
}

pub fn recipients(addresses: &[String]) -> Vec<Recipient> {
    addresses
        .iter()
        .map(|a| Recipient {
            email_address: EmailAddress { address: a.clone() },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use m365_core::directory::TeamSettings;
    use serde_json::json;

    #[test]
    fn team_body_groups_settings_like_graph() {
        let body = TeamCreateBody::from(&NewTeam {
            display_name: "Ops".into(),
            description: "Operations".into(),
            visibility: TeamVisibility::Public,
            settings: TeamSettings::default(),
        });
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["template@odata.bind"], TEAM_TEMPLATE_BINDING);
        assert_eq!(v["visibility"], "public");
        assert_eq!(v["guestSettings"]["allowCreateUpdateChannels"], false);
        assert_eq!(v["memberSettings"]["allowDeleteChannels"], true);
        assert_eq!(v["funSettings"]["giphyContentRating"], "moderate");
    }

    #[test]
    fn owner_role_is_read_from_roles_array() {
        let m: Member = serde_json::from_value(json!({
            "id": "m-1",
            "displayName": "Ana",
            "roles": ["owner"],
            "userId": "u-1",
            "email": "ana@contoso.com"
        }))
        .unwrap();
        let info = MemberInfo::from(m);
        assert_eq!(info.role, MemberRole::Owner);
        assert_eq!(info.user_id.as_deref(), Some("u-1"));

        let m: Member = serde_json::from_value(json!({"id": "m-2"})).unwrap();
        assert_eq!(MemberInfo::from(m).role, MemberRole::Member);
    }

    #[test]
    fn member_binding_points_at_user() {
        let body = MemberAddBody::new("https://graph.microsoft.com/v1.0", "u-9", MemberRole::Member);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["@odata.type"], AAD_USER_MEMBER_TYPE);
        assert_eq!(v["roles"], json!([]));
        assert_eq!(
            v["user@odata.bind"],
            "https://graph.microsoft.com/v1.0/users('u-9')"
        );
    }

    #[test]
    fn archived_flag_maps_to_lifecycle() {
        let t: Team = serde_json::from_value(json!({
            "id": "t-1",
            "displayName": "Ops",
            "visibility": "private",
            "isArchived": true
        }))
        .unwrap();
        let info = TeamInfo::from(t);
        assert_eq!(info.lifecycle, TeamLifecycle::Archived);
        assert_eq!(info.visibility, Some(TeamVisibility::Private));
    }
}
