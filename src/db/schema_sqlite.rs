// SQLite schema definitions
// Mirrors schema.rs with SQLite-compatible types (integer keys, text dates)

diesel::table! {
    chat_logs (id) {
        id -> Integer,
        discord_user_id -> Text,
        discord_username -> Text,
        channel_side -> Text,
        original_message -> Text,
        translated_message -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    mirror_links (id) {
        id -> Integer,
        original_message_id -> Text,
        mirrored_message_id -> Text,
        original_channel_id -> Text,
        mirrored_channel_id -> Text,
        webhook_id -> Text,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(chat_logs, mirror_links);
