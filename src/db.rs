pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{ChatLogEntry, MirrorLink, NewChatLogEntry, NewMirrorLink};
pub use self::stores::{ChatLogStore, MirrorLinkStore};

pub mod error;
pub mod manager;
pub mod models;
pub mod stores;

#[cfg(feature = "postgres")]
pub mod schema;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;

#[cfg(feature = "sqlite")]
pub mod sqlite;
