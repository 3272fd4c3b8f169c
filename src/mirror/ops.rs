use anyhow::Result;
use async_trait::async_trait;

/// Payload for a new mirrored post. The display name is given raw; the
/// executor appends the loop-prevention marker before posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPost {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub attachment_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMirror {
    pub message_id: String,
    pub webhook_id: String,
}

/// Platform-neutral emoji value carried between reaction events and the
/// counterpart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionEmoji {
    Unicode(String),
    Custom {
        id: u64,
        name: Option<String>,
        animated: bool,
    },
}

impl std::fmt::Display for ReactionEmoji {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionEmoji::Unicode(value) => f.write_str(value),
            ReactionEmoji::Custom { id, name, .. } => {
                write!(f, ":{}:{}", name.as_deref().unwrap_or(""), id)
            }
        }
    }
}

/// The engine's only write path onto the chat platform.
///
/// Mirrored messages are created, edited, and deleted through per-channel
/// impersonation webhooks; reactions go through the bot's own identity
/// because webhooks cannot react. `edit_mirror`/`delete_mirror` return
/// `Ok(false)` when the webhook no longer exists or the platform rejects the
/// call; the sync is skipped, logged by the implementation, never retried.
#[async_trait]
pub trait MirrorOperations: Send + Sync {
    async fn post_mirror(&self, channel_id: &str, post: &MirrorPost) -> Result<PostedMirror>;

    async fn edit_mirror(
        &self,
        channel_id: &str,
        webhook_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<bool>;

    async fn delete_mirror(
        &self,
        channel_id: &str,
        webhook_id: &str,
        message_id: &str,
    ) -> Result<bool>;

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &ReactionEmoji,
    ) -> Result<()>;

    /// Remove `emoji` from the target message only if the bot itself had
    /// added it; reactions from humans on the mirror side are never touched.
    async fn remove_own_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &ReactionEmoji,
    ) -> Result<()>;

    /// Mark the original message with the warning reaction and reply with a
    /// localized notice. Used only when creating a mirror fails.
    async fn notify_failure(&self, channel_id: &str, message_id: &str, notice: &str)
    -> Result<()>;
}
