use async_trait::async_trait;

use super::DatabaseError;
use super::models::{ChatLogEntry, MirrorLink, NewChatLogEntry, NewMirrorLink};

#[async_trait]
pub trait ChatLogStore: Send + Sync {
    /// Persist an entry and return it with the store-assigned id and
    /// timestamp. There are no update or delete operations.
    async fn save(&self, entry: &NewChatLogEntry) -> Result<ChatLogEntry, DatabaseError>;
    async fn find_by_user(
        &self,
        discord_user_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError>;
    async fn find_recent(&self, limit: i64) -> Result<Vec<ChatLogEntry>, DatabaseError>;
}

#[async_trait]
pub trait MirrorLinkStore: Send + Sync {
    /// Persist a link. A second link for the same original message id is a
    /// constraint violation, surfaced as a query error.
    async fn save(&self, link: &NewMirrorLink) -> Result<MirrorLink, DatabaseError>;
    async fn find_by_original(
        &self,
        original_message_id: &str,
    ) -> Result<Option<MirrorLink>, DatabaseError>;
    async fn find_by_mirror(
        &self,
        mirrored_message_id: &str,
    ) -> Result<Option<MirrorLink>, DatabaseError>;
    async fn delete_by_original(&self, original_message_id: &str) -> Result<(), DatabaseError>;
    async fn delete_by_mirror(&self, mirrored_message_id: &str) -> Result<(), DatabaseError>;
}
