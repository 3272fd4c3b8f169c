use chrono::{DateTime, Utc};

use crate::channel::Side;

/// Audit record of one translated exchange. Append-only: the engine writes
/// exactly one entry per successfully translated inbound message and never
/// updates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLogEntry {
    pub id: i64,
    pub discord_user_id: String,
    pub discord_username: String,
    pub channel_side: Side,
    pub original_message: String,
    /// None when translation was skipped (whitespace-only content).
    pub translated_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatLogEntry {
    pub discord_user_id: String,
    pub discord_username: String,
    pub channel_side: Side,
    pub original_message: String,
    pub translated_message: Option<String>,
}

/// Bidirectional pointer between an original message and its mirror, used to
/// replay edits, deletions, and reactions onto the right counterpart. At most
/// one link exists per original message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLink {
    pub id: i64,
    pub original_message_id: String,
    pub mirrored_message_id: String,
    pub original_channel_id: String,
    pub mirrored_channel_id: String,
    /// Webhook that posted the mirror; edits and deletes must go through it.
    pub webhook_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMirrorLink {
    pub original_message_id: String,
    pub mirrored_message_id: String,
    pub original_channel_id: String,
    pub mirrored_channel_id: String,
    pub webhook_id: String,
}
