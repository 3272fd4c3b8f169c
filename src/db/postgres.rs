use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::channel::Side;
use crate::db::manager::Pool;
use crate::db::schema::{chat_logs, mirror_links};

use super::{
    DatabaseError,
    models::{ChatLogEntry, MirrorLink, NewChatLogEntry, NewMirrorLink},
};

fn parse_side(s: &str) -> Result<Side, DatabaseError> {
    Side::parse(s).ok_or_else(|| DatabaseError::Query(format!("unknown channel side: {s}")))
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_logs)]
struct DbChatLogEntry {
    id: i64,
    discord_user_id: String,
    discord_username: String,
    channel_side: String,
    original_message: String,
    translated_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl DbChatLogEntry {
    fn to_chat_log_entry(&self) -> Result<ChatLogEntry, DatabaseError> {
        Ok(ChatLogEntry {
            id: self.id,
            discord_user_id: self.discord_user_id.clone(),
            discord_username: self.discord_username.clone(),
            channel_side: parse_side(&self.channel_side)?,
            original_message: self.original_message.clone(),
            translated_message: self.translated_message.clone(),
            created_at: self.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = chat_logs)]
struct NewDbChatLogEntry<'a> {
    discord_user_id: &'a str,
    discord_username: &'a str,
    channel_side: &'a str,
    original_message: &'a str,
    translated_message: Option<&'a str>,
    created_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mirror_links)]
struct DbMirrorLink {
    id: i64,
    original_message_id: String,
    mirrored_message_id: String,
    original_channel_id: String,
    mirrored_channel_id: String,
    webhook_id: String,
    created_at: DateTime<Utc>,
}

impl From<DbMirrorLink> for MirrorLink {
    fn from(value: DbMirrorLink) -> Self {
        Self {
            id: value.id,
            original_message_id: value.original_message_id,
            mirrored_message_id: value.mirrored_message_id,
            original_channel_id: value.original_channel_id,
            mirrored_channel_id: value.mirrored_channel_id,
            webhook_id: value.webhook_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = mirror_links)]
struct NewDbMirrorLink<'a> {
    original_message_id: &'a str,
    mirrored_message_id: &'a str,
    original_channel_id: &'a str,
    mirrored_channel_id: &'a str,
    webhook_id: &'a str,
    created_at: &'a DateTime<Utc>,
}

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

pub struct PostgresChatLogStore {
    pool: Pool,
}

impl PostgresChatLogStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::ChatLogStore for PostgresChatLogStore {
    async fn save(&self, entry: &NewChatLogEntry) -> Result<ChatLogEntry, DatabaseError> {
        let entry = entry.clone();
        with_connection(self.pool.clone(), move |conn| {
            let created_at = Utc::now();
            let new_entry = NewDbChatLogEntry {
                discord_user_id: &entry.discord_user_id,
                discord_username: &entry.discord_username,
                channel_side: entry.channel_side.as_str(),
                original_message: &entry.original_message,
                translated_message: entry.translated_message.as_deref(),
                created_at: &created_at,
            };

            let saved: DbChatLogEntry = diesel::insert_into(chat_logs::table)
                .values(&new_entry)
                .returning(DbChatLogEntry::as_returning())
                .get_result(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            saved.to_chat_log_entry()
        })
        .await
    }

    async fn find_by_user(
        &self,
        discord_user_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        let user_id = discord_user_id.to_string();
        with_connection(self.pool.clone(), move |conn| {
            let results = chat_logs::table
                .filter(chat_logs::discord_user_id.eq(user_id))
                .order(chat_logs::id.desc())
                .limit(limit)
                .select(DbChatLogEntry::as_select())
                .load::<DbChatLogEntry>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            results.iter().map(|e| e.to_chat_log_entry()).collect()
        })
        .await
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let results = chat_logs::table
                .order(chat_logs::id.desc())
                .limit(limit)
                .select(DbChatLogEntry::as_select())
                .load::<DbChatLogEntry>(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            results.iter().map(|e| e.to_chat_log_entry()).collect()
        })
        .await
    }
}

pub struct PostgresMirrorLinkStore {
    pool: Pool,
}

impl PostgresMirrorLinkStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::MirrorLinkStore for PostgresMirrorLinkStore {
    async fn save(&self, link: &NewMirrorLink) -> Result<MirrorLink, DatabaseError> {
        let link = link.clone();
        with_connection(self.pool.clone(), move |conn| {
            let created_at = Utc::now();
            let new_link = NewDbMirrorLink {
                original_message_id: &link.original_message_id,
                mirrored_message_id: &link.mirrored_message_id,
                original_channel_id: &link.original_channel_id,
                mirrored_channel_id: &link.mirrored_channel_id,
                webhook_id: &link.webhook_id,
                created_at: &created_at,
            };

            let saved: DbMirrorLink = diesel::insert_into(mirror_links::table)
                .values(&new_link)
                .returning(DbMirrorLink::as_returning())
                .get_result(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            Ok(saved.into())
        })
        .await
    }

    async fn find_by_original(
        &self,
        original_message_id: &str,
    ) -> Result<Option<MirrorLink>, DatabaseError> {
        let message_id = original_message_id.to_string();
        with_connection(self.pool.clone(), move |conn| {
            Ok(mirror_links::table
                .filter(mirror_links::original_message_id.eq(message_id))
                .select(DbMirrorLink::as_select())
                .first::<DbMirrorLink>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(Into::into))
        })
        .await
    }

    async fn find_by_mirror(
        &self,
        mirrored_message_id: &str,
    ) -> Result<Option<MirrorLink>, DatabaseError> {
        let message_id = mirrored_message_id.to_string();
        with_connection(self.pool.clone(), move |conn| {
            Ok(mirror_links::table
                .filter(mirror_links::mirrored_message_id.eq(message_id))
                .select(DbMirrorLink::as_select())
                .first::<DbMirrorLink>(conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(Into::into))
        })
        .await
    }

    async fn delete_by_original(&self, original_message_id: &str) -> Result<(), DatabaseError> {
        let message_id = original_message_id.to_string();
        with_connection(self.pool.clone(), move |conn| {
            diesel::delete(
                mirror_links::table.filter(mirror_links::original_message_id.eq(message_id)),
            )
            .execute(conn)
            .map(|_| ())
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn delete_by_mirror(&self, mirrored_message_id: &str) -> Result<(), DatabaseError> {
        let message_id = mirrored_message_id.to_string();
        with_connection(self.pool.clone(), move |conn| {
            diesel::delete(
                mirror_links::table.filter(mirror_links::mirrored_message_id.eq(message_id)),
            )
            .execute(conn)
            .map(|_| ())
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}
