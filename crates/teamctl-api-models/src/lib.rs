#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the team server v4 API.
//!
//! The CLI encodes requests and decodes responses through these types only, so
//! field names track the server's JSON contract one-to-one. Every field the CLI
//! does not strictly need carries `#[serde(default)]` so older or newer server
//! builds that omit it still decode.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while converting wire values into typed model fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Outgoing webhook trigger mode was outside the known range.
    #[error("unknown trigger mode {value}")]
    UnknownTriggerWhen {
        /// Offending numeric value.
        value: i64,
    },
    /// Trigger mode name was not recognised.
    #[error("invalid trigger-when value '{value}' (expected exact or start)")]
    InvalidTriggerWhenName {
        /// Offending name.
        value: String,
    },
}

/// Error document returned by the server on non-success responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    /// Translation identifier of the error.
    #[serde(default)]
    pub id: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Server-side diagnostic detail, often empty.
    #[serde(default)]
    pub detailed_error: String,
    /// Request identifier echoed by the server.
    #[serde(default)]
    pub request_id: String,
    /// HTTP status code mirrored in the body.
    #[serde(default)]
    pub status_code: u16,
}

/// Generic `{"status": "OK"}` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusOk {
    /// Acknowledgement string.
    #[serde(default)]
    pub status: String,
}

/// A user account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Opaque 26-character identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Primary email address.
    #[serde(default)]
    pub email: String,
    /// Optional nickname.
    #[serde(default)]
    pub nickname: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Space-separated role names.
    #[serde(default)]
    pub roles: String,
    /// Creation timestamp in epoch milliseconds.
    #[serde(default)]
    pub create_at: i64,
    /// Deactivation timestamp; zero while the account is active.
    #[serde(default)]
    pub delete_at: i64,
}

impl User {
    /// Whether the account has been deactivated.
    #[must_use]
    pub const fn is_deactivated(&self) -> bool {
        self.delete_at != 0
    }
}

/// A bot account. Bots are users; `user_id` is the backing user's ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bot {
    /// Identifier of the backing user.
    pub user_id: String,
    /// Bot username.
    pub username: String,
    /// Display name shown in the UI.
    #[serde(default)]
    pub display_name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Identifier of the owning user.
    #[serde(default)]
    pub owner_id: String,
    /// Creation timestamp in epoch milliseconds.
    #[serde(default)]
    pub create_at: i64,
    /// Last update timestamp in epoch milliseconds.
    #[serde(default)]
    pub update_at: i64,
    /// Disable timestamp; zero while the bot is enabled.
    #[serde(default)]
    pub delete_at: i64,
}

impl Bot {
    /// Whether the bot is currently disabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.delete_at != 0
    }
}

/// Payload for creating a bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotCreateRequest {
    /// Bot username.
    pub username: String,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Sparse bot update; absent fields leave the stored values untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotPatch {
    /// Replacement username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Replacement display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Replacement description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BotPatch {
    /// True when the patch would not change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.display_name.is_none() && self.description.is_none()
    }
}

/// Team visibility, encoded by the server as a one-letter code.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TeamType {
    /// Anyone on the server may join.
    #[default]
    #[serde(rename = "O")]
    Open,
    /// Invite-only.
    #[serde(rename = "I")]
    Invite,
}

impl TeamType {
    /// Human label used in CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Invite => "private",
        }
    }
}

/// A team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    /// Opaque identifier.
    pub id: String,
    /// URL-safe unique name.
    pub name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Administrator email.
    #[serde(default)]
    pub email: String,
    /// Visibility.
    #[serde(rename = "type", default)]
    pub kind: TeamType,
    /// Whether open invites are allowed.
    #[serde(default)]
    pub allow_open_invite: bool,
    /// Creation timestamp in epoch milliseconds.
    #[serde(default)]
    pub create_at: i64,
    /// Last update timestamp in epoch milliseconds.
    #[serde(default)]
    pub update_at: i64,
    /// Archive timestamp; zero while the team is active.
    #[serde(default)]
    pub delete_at: i64,
}

impl Team {
    /// Whether the team is archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.delete_at > 0
    }
}

/// Payload for creating a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamCreateRequest {
    /// URL-safe unique name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Visibility.
    #[serde(rename = "type")]
    pub kind: TeamType,
    /// Optional administrator email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Search request for teams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamSearch {
    /// Term matched against team names and display names.
    pub term: String,
}

/// Privacy update payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamPrivacy {
    /// Target visibility.
    pub privacy: TeamType,
}

/// Membership record returned when a user joins a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    /// Team identifier.
    pub team_id: String,
    /// User identifier.
    pub user_id: String,
    /// Space-separated role names.
    #[serde(default)]
    pub roles: String,
    /// Removal timestamp; zero while the membership is active.
    #[serde(default)]
    pub delete_at: i64,
}

/// A channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Opaque identifier.
    pub id: String,
    /// Owning team identifier; empty for direct and group channels.
    #[serde(default)]
    pub team_id: String,
    /// Unique name within the team.
    pub name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// One-letter channel type code.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Archive timestamp; zero while the channel is active.
    #[serde(default)]
    pub delete_at: i64,
}

/// An incoming webhook, which lets external systems post into a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingWebhook {
    /// Opaque identifier.
    #[serde(default)]
    pub id: String,
    /// Target channel.
    pub channel_id: String,
    /// Team of the target channel.
    #[serde(default)]
    pub team_id: String,
    /// Owner of the hook.
    #[serde(default)]
    pub user_id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Username posts appear under.
    #[serde(default)]
    pub username: String,
    /// Icon shown on posts.
    #[serde(default)]
    pub icon_url: String,
    /// Whether posts are restricted to `channel_id`.
    #[serde(default)]
    pub channel_locked: bool,
    /// Creation timestamp in epoch milliseconds.
    #[serde(default)]
    pub create_at: i64,
    /// Last update timestamp in epoch milliseconds.
    #[serde(default)]
    pub update_at: i64,
    /// Deletion timestamp.
    #[serde(default)]
    pub delete_at: i64,
}

/// When an outgoing webhook fires relative to its trigger words.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "i64", into = "i64")]
pub enum TriggerWhen {
    /// First word matches a trigger word exactly.
    #[default]
    Exact,
    /// First word starts with a trigger word.
    Start,
}

impl TriggerWhen {
    /// Parse the CLI spelling of a trigger mode.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTriggerWhenName`] for anything other than
    /// `exact` or `start`.
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        match name {
            "exact" => Ok(Self::Exact),
            "start" => Ok(Self::Start),
            other => Err(ModelError::InvalidTriggerWhenName {
                value: other.to_string(),
            }),
        }
    }

    /// CLI spelling of the trigger mode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Start => "start",
        }
    }
}

impl TryFrom<i64> for TriggerWhen {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Exact),
            1 => Ok(Self::Start),
            other => Err(ModelError::UnknownTriggerWhen { value: other }),
        }
    }
}

impl From<TriggerWhen> for i64 {
    fn from(value: TriggerWhen) -> Self {
        match value {
            TriggerWhen::Exact => 0,
            TriggerWhen::Start => 1,
        }
    }
}

impl Display for TriggerWhen {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// An outgoing webhook, which posts channel messages to external URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingWebhook {
    /// Opaque identifier.
    #[serde(default)]
    pub id: String,
    /// Owning team.
    pub team_id: String,
    /// Optional channel restriction; empty means any public channel.
    #[serde(default)]
    pub channel_id: String,
    /// Creator of the hook.
    #[serde(default)]
    pub creator_id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Words that fire the hook.
    #[serde(default)]
    pub trigger_words: Vec<String>,
    /// Matching mode for `trigger_words`.
    #[serde(default)]
    pub trigger_when: TriggerWhen,
    /// Callback URLs receiving the payload.
    #[serde(default)]
    pub callback_urls: Vec<String>,
    /// Payload content type.
    #[serde(default)]
    pub content_type: String,
    /// Username responses appear under.
    #[serde(default)]
    pub username: String,
    /// Icon shown on responses.
    #[serde(default)]
    pub icon_url: String,
    /// Creation timestamp in epoch milliseconds.
    #[serde(default)]
    pub create_at: i64,
    /// Last update timestamp in epoch milliseconds.
    #[serde(default)]
    pub update_at: i64,
    /// Deletion timestamp.
    #[serde(default)]
    pub delete_at: i64,
}
