//! Notification event model and wire decoding
//!
//! A [`NotificationEvent`] is the immutable record delivered by the remote
//! source. Identity is the [`NotificationId`]: two events with the same id are
//! the same logical notification even when delivered twice.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable unique identifier assigned by the remote source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Create a notification id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity of the authenticated user that remote reads are keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    /// Friend requests and friendship changes
    FriendRequest,
    /// Direct and race chat messages
    ChatMessage,
    /// Race and achievement activity
    ActivityUpdate,
    /// Anything else the backend sends
    System,
}

impl NotificationCategory {
    /// All categories in display order
    pub const ALL: [NotificationCategory; 4] = [
        NotificationCategory::FriendRequest,
        NotificationCategory::ChatMessage,
        NotificationCategory::ActivityUpdate,
        NotificationCategory::System,
    ];

    /// Parse a wire category string
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "friend-request" => Some(NotificationCategory::FriendRequest),
            "chat-message" => Some(NotificationCategory::ChatMessage),
            "activity-update" => Some(NotificationCategory::ActivityUpdate),
            "system" => Some(NotificationCategory::System),
            _ => None,
        }
    }

    /// Convert to the wire category string
    pub fn as_wire(&self) -> &'static str {
        match self {
            NotificationCategory::FriendRequest => "friend-request",
            NotificationCategory::ChatMessage => "chat-message",
            NotificationCategory::ActivityUpdate => "activity-update",
            NotificationCategory::System => "system",
        }
    }
}

/// Specific notification type sent in the wire `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Incoming friend request
    FriendRequest,
    /// Friend request was accepted
    FriendAccepted,
    /// Friend request was declined
    FriendDeclined,
    /// Friendship was removed
    FriendRemoved,
    /// Direct one-to-one chat message
    ChatMessage,
    /// Race group chat message
    RaceChatMessage,
    /// Invitation to join a race
    InviteRace,
    /// Someone asked to join the user's race
    NewJoinRequest,
    /// Race started
    RaceBegin,
    /// User won a race
    RaceWon,
    /// User finished a race
    RaceCompleted,
    /// First participant crossed the finish
    RaceFirstFinisher,
    /// Finish deadline is approaching
    RaceDeadlineAlert,
    /// Race was cancelled
    RaceCancelled,
    /// Organizer accepted a join request
    JoinRequestAccepted,
    /// Invitee accepted an invite
    InviteAccepted,
    /// Organizer declined a join request
    JoinRequestDeclined,
    /// Invitee declined an invite
    InviteDeclined,
    /// Race creation confirmation
    RaceCreated,
    /// Public race broadcast
    PublicRaceAnnouncement,
    /// Participant joined a race
    RaceParticipantJoined,
    /// User overtook someone
    RaceOvertaking,
    /// User was overtaken
    RaceOvertaken,
    /// Overtake between other participants
    RaceOvertakingGeneral,
    /// Race leader changed
    RaceLeaderChange,
    /// User reached a progress milestone
    RaceMilestonePersonal,
    /// Another participant reached a milestone
    RaceMilestoneAlert,
    /// Race ending countdown
    RaceCountdownTimer,
    /// Opponent is close behind
    RaceProximityAlert,
    /// Upcoming race reminder
    RaceReminder,
    /// Unknown notification type
    Unknown,
}

impl NotificationKind {
    /// Convert from the wire `type` string
    pub fn from_wire(value: &str) -> Self {
        match value {
            "FriendRequest" => NotificationKind::FriendRequest,
            "FriendAccepted" => NotificationKind::FriendAccepted,
            "FriendDeclined" => NotificationKind::FriendDeclined,
            "FriendRemoved" => NotificationKind::FriendRemoved,
            "ChatMessage" => NotificationKind::ChatMessage,
            "RaceChatMessage" => NotificationKind::RaceChatMessage,
            "InviteRace" => NotificationKind::InviteRace,
            "NewJoinRequest" => NotificationKind::NewJoinRequest,
            "RaceBegin" => NotificationKind::RaceBegin,
            "RaceWon" => NotificationKind::RaceWon,
            "RaceCompleted" => NotificationKind::RaceCompleted,
            "RaceFirstFinisher" => NotificationKind::RaceFirstFinisher,
            "RaceDeadlineAlert" => NotificationKind::RaceDeadlineAlert,
            "RaceCancelled" => NotificationKind::RaceCancelled,
            "JoinRequestAccepted" => NotificationKind::JoinRequestAccepted,
            "InviteAccepted" => NotificationKind::InviteAccepted,
            "JoinRequestDeclined" => NotificationKind::JoinRequestDeclined,
            "InviteDeclined" => NotificationKind::InviteDeclined,
            "RaceCreated" => NotificationKind::RaceCreated,
            "PublicRaceAnnouncement" => NotificationKind::PublicRaceAnnouncement,
            "RaceParticipantJoined" => NotificationKind::RaceParticipantJoined,
            "RaceOvertaking" => NotificationKind::RaceOvertaking,
            "RaceOvertaken" => NotificationKind::RaceOvertaken,
            "RaceOvertakingGeneral" => NotificationKind::RaceOvertakingGeneral,
            "RaceLeaderChange" => NotificationKind::RaceLeaderChange,
            "RaceMilestonePersonal" => NotificationKind::RaceMilestonePersonal,
            "RaceMilestoneAlert" => NotificationKind::RaceMilestoneAlert,
            "RaceCountdownTimer" => NotificationKind::RaceCountdownTimer,
            "RaceProximityAlert" => NotificationKind::RaceProximityAlert,
            "RaceReminder" => NotificationKind::RaceReminder,
            _ => NotificationKind::Unknown,
        }
    }

    /// Convert to the wire `type` string
    pub fn as_wire(&self) -> &'static str {
        match self {
            NotificationKind::FriendRequest => "FriendRequest",
            NotificationKind::FriendAccepted => "FriendAccepted",
            NotificationKind::FriendDeclined => "FriendDeclined",
            NotificationKind::FriendRemoved => "FriendRemoved",
            NotificationKind::ChatMessage => "ChatMessage",
            NotificationKind::RaceChatMessage => "RaceChatMessage",
            NotificationKind::InviteRace => "InviteRace",
            NotificationKind::NewJoinRequest => "NewJoinRequest",
            NotificationKind::RaceBegin => "RaceBegin",
            NotificationKind::RaceWon => "RaceWon",
            NotificationKind::RaceCompleted => "RaceCompleted",
            NotificationKind::RaceFirstFinisher => "RaceFirstFinisher",
            NotificationKind::RaceDeadlineAlert => "RaceDeadlineAlert",
            NotificationKind::RaceCancelled => "RaceCancelled",
            NotificationKind::JoinRequestAccepted => "JoinRequestAccepted",
            NotificationKind::InviteAccepted => "InviteAccepted",
            NotificationKind::JoinRequestDeclined => "JoinRequestDeclined",
            NotificationKind::InviteDeclined => "InviteDeclined",
            NotificationKind::RaceCreated => "RaceCreated",
            NotificationKind::PublicRaceAnnouncement => "PublicRaceAnnouncement",
            NotificationKind::RaceParticipantJoined => "RaceParticipantJoined",
            NotificationKind::RaceOvertaking => "RaceOvertaking",
            NotificationKind::RaceOvertaken => "RaceOvertaken",
            NotificationKind::RaceOvertakingGeneral => "RaceOvertakingGeneral",
            NotificationKind::RaceLeaderChange => "RaceLeaderChange",
            NotificationKind::RaceMilestonePersonal => "RaceMilestonePersonal",
            NotificationKind::RaceMilestoneAlert => "RaceMilestoneAlert",
            NotificationKind::RaceCountdownTimer => "RaceCountdownTimer",
            NotificationKind::RaceProximityAlert => "RaceProximityAlert",
            NotificationKind::RaceReminder => "RaceReminder",
            NotificationKind::Unknown => "Unknown",
        }
    }

    /// Category implied by this kind when the record carries none
    pub fn category(&self) -> NotificationCategory {
        match self {
            NotificationKind::FriendRequest
            | NotificationKind::FriendAccepted
            | NotificationKind::FriendDeclined
            | NotificationKind::FriendRemoved => NotificationCategory::FriendRequest,
            NotificationKind::ChatMessage | NotificationKind::RaceChatMessage => {
                NotificationCategory::ChatMessage
            }
            NotificationKind::Unknown => NotificationCategory::System,
            _ => NotificationCategory::ActivityUpdate,
        }
    }
}

/// Reasons a wire record cannot be turned into a [`NotificationEvent`]
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The record is not an object of the expected shape
    #[error("Invalid notification record: {0}")]
    Invalid(#[from] serde_json::Error),

    /// Missing or empty `id`
    #[error("Notification record has no id")]
    MissingId,

    /// Neither `type` nor `category` present
    #[error("Notification {0} has neither type nor category")]
    MissingType(String),

    /// `category` is not one of the known categories
    #[error("Notification {id} has unknown category {category:?}")]
    UnknownCategory {
        /// Record id
        id: String,
        /// Offending category string
        category: String,
    },

    /// Missing or unparseable `createdAt`
    #[error("Notification {0} has an invalid createdAt")]
    InvalidTimestamp(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNotification {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    created_at: Option<WireTimestamp>,
}

/// An inbound notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    id: NotificationId,
    category: NotificationCategory,
    kind: NotificationKind,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Create an event with an explicit category
    pub fn new(
        id: impl Into<NotificationId>,
        category: NotificationCategory,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            kind: NotificationKind::Unknown,
            payload,
            created_at,
        }
    }

    /// Set the specific kind
    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Decode a wire record
    pub fn from_wire(record: &serde_json::Value) -> Result<Self, DecodeError> {
        let wire = WireNotification::deserialize(record)?;

        let id = match wire.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(DecodeError::MissingId),
        };

        let kind = wire.kind.as_deref().map(NotificationKind::from_wire);
        let category = match (wire.category, kind) {
            (Some(category), _) => NotificationCategory::from_wire(&category)
                .ok_or_else(|| DecodeError::UnknownCategory { id: id.clone(), category })?,
            (None, Some(kind)) => kind.category(),
            (None, None) => return Err(DecodeError::MissingType(id)),
        };

        let created_at = match wire.created_at {
            Some(WireTimestamp::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
            Some(WireTimestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            None => None,
        }
        .ok_or_else(|| DecodeError::InvalidTimestamp(id.clone()))?;

        let payload = match wire.data {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };

        Ok(Self {
            id: NotificationId::new(id),
            category,
            kind: kind.unwrap_or(NotificationKind::Unknown),
            payload,
            created_at,
        })
    }

    /// Encode back into the wire shape
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_str(),
            "type": self.kind.as_wire(),
            "category": self.category.as_wire(),
            "data": self.payload,
            "createdAt": self.created_at.to_rfc3339(),
        })
    }

    /// Stable identifier
    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    /// Broad category
    pub fn category(&self) -> NotificationCategory {
        self.category
    }

    /// Specific kind
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Opaque display data
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Look up a string field in the payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// When the remote source created the notification
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
