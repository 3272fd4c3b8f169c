use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::channel::Side;
use crate::db::schema_sqlite::{chat_logs, mirror_links};

use super::{
    DatabaseError,
    models::{ChatLogEntry, MirrorLink, NewChatLogEntry, NewMirrorLink},
};

diesel::define_sql_function! {
    fn last_insert_rowid() -> diesel::sql_types::BigInt;
}

fn establish_connection(db_path: &str) -> Result<SqliteConnection, DatabaseError> {
    let conn_string = format!("sqlite://{}", db_path);
    SqliteConnection::establish(&conn_string)
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

// SQLite stores timestamps as RFC3339 text and primary keys as i32; the
// public models keep i64 ids and chrono timestamps.
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

fn parse_side(s: &str) -> Result<Side, DatabaseError> {
    Side::parse(s).ok_or_else(|| DatabaseError::Query(format!("unknown channel side: {s}")))
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_logs)]
struct DbChatLogEntry {
    id: i32,
    discord_user_id: String,
    discord_username: String,
    channel_side: String,
    original_message: String,
    translated_message: Option<String>,
    created_at: String,
}

impl DbChatLogEntry {
    fn to_chat_log_entry(&self) -> Result<ChatLogEntry, DatabaseError> {
        Ok(ChatLogEntry {
            id: self.id as i64,
            discord_user_id: self.discord_user_id.clone(),
            discord_username: self.discord_username.clone(),
            channel_side: parse_side(&self.channel_side)?,
            original_message: self.original_message.clone(),
            translated_message: self.translated_message.clone(),
            created_at: string_to_datetime(&self.created_at)?,
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
    created_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mirror_links)]
struct DbMirrorLink {
    id: i32,
    original_message_id: String,
    mirrored_message_id: String,
    original_channel_id: String,
    mirrored_channel_id: String,
    webhook_id: String,
    created_at: String,
}

impl DbMirrorLink {
    fn to_mirror_link(&self) -> Result<MirrorLink, DatabaseError> {
        Ok(MirrorLink {
            id: self.id as i64,
            original_message_id: self.original_message_id.clone(),
            mirrored_message_id: self.mirrored_message_id.clone(),
            original_channel_id: self.original_channel_id.clone(),
            mirrored_channel_id: self.mirrored_channel_id.clone(),
            webhook_id: self.webhook_id.clone(),
            created_at: string_to_datetime(&self.created_at)?,
        })
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
    created_at: String,
}

pub struct SqliteChatLogStore {
    db_path: Arc<String>,
}

impl SqliteChatLogStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::ChatLogStore for SqliteChatLogStore {
    async fn save(&self, entry: &NewChatLogEntry) -> Result<ChatLogEntry, DatabaseError> {
        let entry = entry.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let created_at = Utc::now();
            let new_entry = NewDbChatLogEntry {
                discord_user_id: &entry.discord_user_id,
                discord_username: &entry.discord_username,
                channel_side: entry.channel_side.as_str(),
                original_message: &entry.original_message,
                translated_message: entry.translated_message.as_deref(),
                created_at: datetime_to_string(&created_at),
            };

            diesel::insert_into(chat_logs::table)
                .values(&new_entry)
                .execute(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let row_id: i64 = diesel::select(last_insert_rowid())
                .get_result(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            Ok(ChatLogEntry {
                id: row_id,
                discord_user_id: entry.discord_user_id,
                discord_username: entry.discord_username,
                channel_side: entry.channel_side,
                original_message: entry.original_message,
                translated_message: entry.translated_message,
                created_at,
            })
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn find_by_user(
        &self,
        discord_user_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        let user_id = discord_user_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let results = chat_logs::table
                .filter(chat_logs::discord_user_id.eq(user_id))
                .order(chat_logs::id.desc())
                .limit(limit)
                .select(DbChatLogEntry::as_select())
                .load::<DbChatLogEntry>(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            results.iter().map(|e| e.to_chat_log_entry()).collect()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::chat_logs::dsl::*;
            let results = chat_logs
                .order(id.desc())
                .limit(limit)
                .select(DbChatLogEntry::as_select())
                .load::<DbChatLogEntry>(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            results.iter().map(|e| e.to_chat_log_entry()).collect()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteMirrorLinkStore {
    db_path: Arc<String>,
}

impl SqliteMirrorLinkStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::MirrorLinkStore for SqliteMirrorLinkStore {
    async fn save(&self, link: &NewMirrorLink) -> Result<MirrorLink, DatabaseError> {
        let link = link.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let created_at = Utc::now();
            let new_link = NewDbMirrorLink {
                original_message_id: &link.original_message_id,
                mirrored_message_id: &link.mirrored_message_id,
                original_channel_id: &link.original_channel_id,
                mirrored_channel_id: &link.mirrored_channel_id,
                webhook_id: &link.webhook_id,
                created_at: datetime_to_string(&created_at),
            };

            diesel::insert_into(mirror_links::table)
                .values(&new_link)
                .execute(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let row_id: i64 = diesel::select(last_insert_rowid())
                .get_result(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            Ok(MirrorLink {
                id: row_id,
                original_message_id: link.original_message_id,
                mirrored_message_id: link.mirrored_message_id,
                original_channel_id: link.original_channel_id,
                mirrored_channel_id: link.mirrored_channel_id,
                webhook_id: link.webhook_id,
                created_at,
            })
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn find_by_original(
        &self,
        original_message_id: &str,
    ) -> Result<Option<MirrorLink>, DatabaseError> {
        let message_id = original_message_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            mirror_links::table
                .filter(mirror_links::original_message_id.eq(message_id))
                .select(DbMirrorLink::as_select())
                .first::<DbMirrorLink>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|l| l.to_mirror_link())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn find_by_mirror(
        &self,
        mirrored_message_id: &str,
    ) -> Result<Option<MirrorLink>, DatabaseError> {
        let message_id = mirrored_message_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            mirror_links::table
                .filter(mirror_links::mirrored_message_id.eq(message_id))
                .select(DbMirrorLink::as_select())
                .first::<DbMirrorLink>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|l| l.to_mirror_link())
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn delete_by_original(&self, original_message_id: &str) -> Result<(), DatabaseError> {
        let message_id = original_message_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::delete(
                mirror_links::table.filter(mirror_links::original_message_id.eq(message_id)),
            )
            .execute(&mut conn)
            .map(|_| ())
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn delete_by_mirror(&self, mirrored_message_id: &str) -> Result<(), DatabaseError> {
        let message_id = mirrored_message_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::delete(
                mirror_links::table.filter(mirror_links::mirrored_message_id.eq(message_id)),
            )
            .execute(&mut conn)
            .map(|_| ())
            .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}
