use std::sync::Arc;

use crate::config::{DatabaseConfig, DbType as ConfigDbType};
use crate::db::{ChatLogStore, DatabaseError, MirrorLinkStore};

use diesel::RunQueryDsl;

#[cfg(feature = "postgres")]
use crate::db::postgres::{PostgresChatLogStore, PostgresMirrorLinkStore};
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "postgres")]
use diesel::r2d2::{self, ConnectionManager};

#[cfg(feature = "postgres")]
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{SqliteChatLogStore, SqliteMirrorLinkStore};
#[cfg(feature = "sqlite")]
use diesel::Connection;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "postgres")]
    postgres_pool: Option<Pool>,
    #[cfg(feature = "sqlite")]
    sqlite_path: Option<String>,
    chat_log_store: Arc<dyn ChatLogStore>,
    mirror_link_store: Arc<dyn MirrorLinkStore>,
    db_type: DbType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

impl From<ConfigDbType> for DbType {
    fn from(value: ConfigDbType) -> Self {
        match value {
            ConfigDbType::Postgres => DbType::Postgres,
            ConfigDbType::Sqlite => DbType::Sqlite,
        }
    }
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = DbType::from(config.db_type());

        match db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let manager =
                    ConnectionManager::<PgConnection>::new(config.connection_string());

                let pool = r2d2::Pool::builder()
                    .max_size(config.max_connections().unwrap_or(10))
                    .min_idle(Some(config.min_connections().unwrap_or(1)))
                    .build(manager)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;

                let chat_log_store = Arc::new(PostgresChatLogStore::new(pool.clone()));
                let mirror_link_store = Arc::new(PostgresMirrorLinkStore::new(pool.clone()));

                Ok(Self {
                    postgres_pool: Some(pool),
                    #[cfg(feature = "sqlite")]
                    sqlite_path: None,
                    chat_log_store,
                    mirror_link_store,
                    db_type,
                })
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config.sqlite_path().ok_or_else(|| {
                    DatabaseError::Connection("sqlite path not configured".to_string())
                })?;
                let path_arc = Arc::new(path.clone());

                let chat_log_store = Arc::new(SqliteChatLogStore::new(path_arc.clone()));
                let mirror_link_store = Arc::new(SqliteMirrorLinkStore::new(path_arc));

                Ok(Self {
                    #[cfg(feature = "postgres")]
                    postgres_pool: None,
                    sqlite_path: Some(path),
                    chat_log_store,
                    mirror_link_store,
                    db_type,
                })
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Connection(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Connection(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = self.postgres_pool.as_ref().ok_or_else(|| {
                    DatabaseError::Migration("postgres pool not initialized".to_string())
                })?;
                Self::migrate_postgres(pool).await
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = self.sqlite_path.as_ref().ok_or_else(|| {
                    DatabaseError::Migration("sqlite path not initialized".to_string())
                })?;
                Self::migrate_sqlite(path).await
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Migration(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Migration(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    #[cfg(feature = "postgres")]
    async fn migrate_postgres(pool: &Pool) -> Result<(), DatabaseError> {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS chat_logs (
                    id BIGSERIAL PRIMARY KEY,
                    discord_user_id TEXT NOT NULL,
                    discord_username TEXT NOT NULL,
                    channel_side TEXT NOT NULL,
                    original_message TEXT NOT NULL,
                    translated_message TEXT,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS mirror_links (
                    id BIGSERIAL PRIMARY KEY,
                    original_message_id TEXT NOT NULL UNIQUE,
                    mirrored_message_id TEXT NOT NULL,
                    original_channel_id TEXT NOT NULL,
                    mirrored_channel_id TEXT NOT NULL,
                    webhook_id TEXT NOT NULL,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_chat_logs_created_at ON chat_logs(created_at)",
                "CREATE INDEX IF NOT EXISTS idx_chat_logs_user_id ON chat_logs(discord_user_id)",
                "CREATE INDEX IF NOT EXISTS idx_chat_logs_channel_side ON chat_logs(channel_side)",
                "CREATE INDEX IF NOT EXISTS idx_mirror_links_mirrored ON mirror_links(mirrored_message_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(feature = "sqlite")]
    async fn migrate_sqlite(path: &str) -> Result<(), DatabaseError> {
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let conn_string = format!("sqlite://{}", path);
            let mut conn = SqliteConnection::establish(&conn_string)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS chat_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    discord_user_id TEXT NOT NULL,
                    discord_username TEXT NOT NULL,
                    channel_side TEXT NOT NULL,
                    original_message TEXT NOT NULL,
                    translated_message TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS mirror_links (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    original_message_id TEXT NOT NULL UNIQUE,
                    mirrored_message_id TEXT NOT NULL,
                    original_channel_id TEXT NOT NULL,
                    mirrored_channel_id TEXT NOT NULL,
                    webhook_id TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_chat_logs_created_at ON chat_logs(created_at)",
                "CREATE INDEX IF NOT EXISTS idx_chat_logs_user_id ON chat_logs(discord_user_id)",
                "CREATE INDEX IF NOT EXISTS idx_chat_logs_channel_side ON chat_logs(channel_side)",
                "CREATE INDEX IF NOT EXISTS idx_mirror_links_mirrored ON mirror_links(mirrored_message_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn chat_log_store(&self) -> Arc<dyn ChatLogStore> {
        self.chat_log_store.clone()
    }

    pub fn mirror_link_store(&self) -> Arc<dyn MirrorLinkStore> {
        self.mirror_link_store.clone()
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use tempfile::NamedTempFile;

    use super::DatabaseManager;
    use crate::channel::Side;
    use crate::config::DatabaseConfig;
    use crate::db::{ChatLogStore as _, MirrorLinkStore as _, NewChatLogEntry, NewMirrorLink};

    async fn open_manager(db_path: String) -> DatabaseManager {
        let config = DatabaseConfig {
            url: None,
            filename: Some(db_path),
            max_connections: Some(1),
            min_connections: Some(1),
        };
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        manager
    }

    #[tokio::test]
    async fn sqlite_mirror_link_roundtrip() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let db_path = file.path().to_string_lossy().to_string();
        let manager = open_manager(db_path.clone()).await;

        let link = NewMirrorLink {
            original_message_id: "msg-1".to_string(),
            mirrored_message_id: "mirror-1".to_string(),
            original_channel_id: "111".to_string(),
            mirrored_channel_id: "222".to_string(),
            webhook_id: "wh-1".to_string(),
        };

        let saved = manager
            .mirror_link_store()
            .save(&link)
            .await
            .expect("save link");
        assert!(saved.id > 0);

        let forward = manager
            .mirror_link_store()
            .find_by_original("msg-1")
            .await
            .expect("forward lookup")
            .expect("link exists");
        assert_eq!(forward.mirrored_message_id, "mirror-1");

        // Survives a reopen of the database.
        let reopened = open_manager(db_path).await;
        let reverse = reopened
            .mirror_link_store()
            .find_by_mirror("mirror-1")
            .await
            .expect("reverse lookup")
            .expect("link exists after reopen");
        assert_eq!(reverse.original_message_id, "msg-1");

        reopened
            .mirror_link_store()
            .delete_by_original("msg-1")
            .await
            .expect("delete link");

        let gone = reopened
            .mirror_link_store()
            .find_by_original("msg-1")
            .await
            .expect("lookup after delete");
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn sqlite_chat_log_append_and_query() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(file.path().to_string_lossy().to_string()).await;

        let entry = NewChatLogEntry {
            discord_user_id: "user-1".to_string(),
            discord_username: "alice".to_string(),
            channel_side: Side::A,
            original_message: "こんにちは".to_string(),
            translated_message: Some("Hello".to_string()),
        };

        let saved = manager.chat_log_store().save(&entry).await.expect("save");
        assert!(saved.id > 0);
        assert_eq!(saved.channel_side, Side::A);
        assert_eq!(saved.translated_message.as_deref(), Some("Hello"));

        let recent = manager
            .chat_log_store()
            .find_recent(10)
            .await
            .expect("find recent");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].original_message, "こんにちは");

        let by_user = manager
            .chat_log_store()
            .find_by_user("user-1", 10)
            .await
            .expect("find by user");
        assert_eq!(by_user.len(), 1);

        let none = manager
            .chat_log_store()
            .find_by_user("user-2", 10)
            .await
            .expect("find by other user");
        assert!(none.is_empty());
    }
}
