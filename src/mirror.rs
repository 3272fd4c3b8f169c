use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelDirectory, Side};
use crate::db::{ChatLogStore, MirrorLinkStore, NewChatLogEntry, NewMirrorLink};
use crate::translation::TranslationService;

pub mod logic;
pub mod loop_guard;
pub mod ops;

pub use self::ops::{MirrorOperations, MirrorPost, PostedMirror, ReactionEmoji};

use self::logic::{DeletePlan, edit_requires_sync, plan_delete, preview_text, resolve_counterpart};

/// A message-created event, lifted out of platform types by the gateway.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    /// Account name; for webhook posts this is the webhook display name and
    /// carries the loop marker.
    pub author_username: String,
    /// Per-guild display name shown on the mirror.
    pub author_display_name: String,
    pub author_avatar_url: Option<String>,
    pub author_is_bot: bool,
    pub via_webhook: bool,
    pub content: String,
    pub attachment_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EditedMessage {
    pub id: String,
    pub channel_id: String,
    pub author_username: String,
    pub author_is_bot: bool,
    pub via_webhook: bool,
    /// The platform does not always deliver the previous body.
    pub old_content: Option<String>,
    pub new_content: String,
}

#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub channel_id: String,
    pub message_id: String,
    pub user_is_bot: bool,
    pub emoji: ReactionEmoji,
}

/// The mirror synchronization engine. One stateless handler per inbound
/// event kind; every handler is a no-op for channels outside the configured
/// pair and for events produced by the engine's own mirroring.
pub struct MirrorEngine {
    directory: ChannelDirectory,
    translation: Arc<TranslationService>,
    ops: Arc<dyn MirrorOperations>,
    chat_logs: Arc<dyn ChatLogStore>,
    links: Arc<dyn MirrorLinkStore>,
    loop_marker: String,
}

impl MirrorEngine {
    pub fn new(
        directory: ChannelDirectory,
        translation: Arc<TranslationService>,
        ops: Arc<dyn MirrorOperations>,
        chat_logs: Arc<dyn ChatLogStore>,
        links: Arc<dyn MirrorLinkStore>,
        loop_marker: String,
    ) -> Self {
        Self {
            directory,
            translation,
            ops,
            chat_logs,
            links,
            loop_marker,
        }
    }

    pub async fn handle_message_created(&self, msg: &InboundMessage) -> Result<()> {
        if !loop_guard::should_translate(
            msg.author_is_bot,
            msg.via_webhook,
            &msg.author_username,
            &self.loop_marker,
        ) {
            debug!(
                "ignoring mirror artifact message_id={} channel_id={}",
                msg.id, msg.channel_id
            );
            return Ok(());
        }

        let Some(side) = self.directory.classify(&msg.channel_id) else {
            return Ok(());
        };

        debug!(
            "inbound message message_id={} side={} sender={} content_preview={}",
            msg.id,
            side,
            msg.author_id,
            preview_text(&msg.content)
        );

        let outcome = match self.translation.translate_for_side(&msg.content, side).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    "translation failed message_id={} side={}: {err}",
                    msg.id, side
                );
                self.notify_failure(msg, side).await;
                return Ok(());
            }
        };

        let entry = NewChatLogEntry {
            discord_user_id: msg.author_id.clone(),
            discord_username: msg.author_username.clone(),
            channel_side: side,
            original_message: msg.content.clone(),
            translated_message: (!outcome.skipped).then(|| outcome.translated_text.clone()),
        };
        if let Err(err) = self.chat_logs.save(&entry).await {
            error!("chat log write failed message_id={}: {err}", msg.id);
            return Ok(());
        }

        let target_channel = self.directory.opposite_channel_id(side);
        let post = MirrorPost {
            display_name: msg.author_display_name.clone(),
            avatar_url: msg.author_avatar_url.clone(),
            content: outcome.translated_text.clone(),
            attachment_urls: msg.attachment_urls.clone(),
        };

        let posted = match self.ops.post_mirror(target_channel, &post).await {
            Ok(posted) => posted,
            Err(err) => {
                error!(
                    "mirror post failed message_id={} target_channel={}: {err}",
                    msg.id, target_channel
                );
                self.notify_failure(msg, side).await;
                return Ok(());
            }
        };

        info!(
            "mirrored message {} -> {} ({} -> {})",
            msg.id,
            posted.message_id,
            side,
            side.opposite()
        );

        let link = NewMirrorLink {
            original_message_id: msg.id.clone(),
            mirrored_message_id: posted.message_id.clone(),
            original_channel_id: msg.channel_id.clone(),
            mirrored_channel_id: target_channel.to_string(),
            webhook_id: posted.webhook_id.clone(),
        };
        if let Err(err) = self.links.save(&link).await {
            // The mirror exists but can never be synced again; nothing to
            // roll back.
            warn!(
                "mirror link write failed original={} mirror={}: {err}",
                msg.id, posted.message_id
            );
        }

        Ok(())
    }

    pub async fn handle_message_edited(&self, evt: &EditedMessage) -> Result<()> {
        if loop_guard::is_mirror_artifact(
            evt.author_is_bot,
            evt.via_webhook,
            &evt.author_username,
            &self.loop_marker,
        ) {
            return Ok(());
        }

        if !edit_requires_sync(evt.old_content.as_deref(), &evt.new_content) {
            debug!("edit without content change message_id={}", evt.id);
            return Ok(());
        }

        let Some(side) = self.directory.classify(&evt.channel_id) else {
            return Ok(());
        };

        let Some(link) = self.links.find_by_original(&evt.id).await? else {
            info!("no mirror found for edited message {}", evt.id);
            return Ok(());
        };

        let outcome = self
            .translation
            .translate_for_side(&evt.new_content, side)
            .await?;

        let edited = self
            .ops
            .edit_mirror(
                &link.mirrored_channel_id,
                &link.webhook_id,
                &link.mirrored_message_id,
                &outcome.translated_text,
            )
            .await?;

        if edited {
            info!(
                "synced edit of {} to mirror {}",
                evt.id, link.mirrored_message_id
            );
        } else {
            warn!(
                "edit sync skipped original={} mirror={}",
                evt.id, link.mirrored_message_id
            );
        }

        Ok(())
    }

    pub async fn handle_message_deleted(&self, channel_id: &str, message_id: &str) -> Result<()> {
        if self.directory.classify(channel_id).is_none() {
            return Ok(());
        }

        let forward = self.links.find_by_original(message_id).await?;
        let reverse = if forward.is_none() {
            self.links.find_by_mirror(message_id).await?
        } else {
            None
        };

        match plan_delete(forward.as_ref(), reverse.as_ref()) {
            DeletePlan::MirrorAndRecord {
                mirror_channel_id,
                mirror_message_id,
                webhook_id,
            } => {
                match self
                    .ops
                    .delete_mirror(&mirror_channel_id, &webhook_id, &mirror_message_id)
                    .await
                {
                    Ok(true) => info!("deleted mirror {} of {}", mirror_message_id, message_id),
                    Ok(false) => warn!(
                        "delete sync skipped original={} mirror={}",
                        message_id, mirror_message_id
                    ),
                    Err(err) => warn!(
                        "mirror delete failed original={} mirror={}: {err}",
                        message_id, mirror_message_id
                    ),
                }
                // The record goes regardless of how the platform call went.
                self.links.delete_by_original(message_id).await?;
            }
            DeletePlan::RecordOnly => {
                self.links.delete_by_mirror(message_id).await?;
                info!(
                    "removed mirror record for out-of-band deleted mirror {}",
                    message_id
                );
            }
            DeletePlan::Ignore => {}
        }

        Ok(())
    }

    pub async fn handle_reaction_added(&self, evt: &ReactionEvent) -> Result<()> {
        if evt.user_is_bot {
            return Ok(());
        }
        if self.directory.classify(&evt.channel_id).is_none() {
            return Ok(());
        }

        let Some(counterpart) = self.resolve_counterpart(&evt.message_id).await? else {
            return Ok(());
        };

        self.ops
            .add_reaction(&counterpart.channel_id, &counterpart.message_id, &evt.emoji)
            .await?;
        debug!(
            "synced reaction {} from {} to {}",
            evt.emoji, evt.message_id, counterpart.message_id
        );
        Ok(())
    }

    pub async fn handle_reaction_removed(&self, evt: &ReactionEvent) -> Result<()> {
        if evt.user_is_bot {
            return Ok(());
        }
        if self.directory.classify(&evt.channel_id).is_none() {
            return Ok(());
        }

        let Some(counterpart) = self.resolve_counterpart(&evt.message_id).await? else {
            return Ok(());
        };

        self.ops
            .remove_own_reaction(&counterpart.channel_id, &counterpart.message_id, &evt.emoji)
            .await?;
        debug!(
            "synced reaction removal {} from {} to {}",
            evt.emoji, evt.message_id, counterpart.message_id
        );
        Ok(())
    }

    /// Reactions and deletes can originate on either end of a link.
    async fn resolve_counterpart(
        &self,
        message_id: &str,
    ) -> Result<Option<logic::CounterpartRef>> {
        let forward = self.links.find_by_original(message_id).await?;
        let reverse = if forward.is_none() {
            self.links.find_by_mirror(message_id).await?
        } else {
            None
        };
        Ok(resolve_counterpart(forward.as_ref(), reverse.as_ref()))
    }

    async fn notify_failure(&self, msg: &InboundMessage, side: Side) {
        if let Err(err) = self
            .ops
            .notify_failure(&msg.channel_id, &msg.id, self.directory.failure_notice(side))
            .await
        {
            warn!(
                "failed to notify user of mirror failure message_id={}: {err}",
                msg.id
            );
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use tempfile::NamedTempFile;
    use tokio::sync::Mutex;

    use super::{
        EditedMessage, InboundMessage, MirrorEngine, MirrorOperations, MirrorPost, PostedMirror,
        ReactionEmoji, ReactionEvent,
    };
    use crate::channel::{ChannelDirectory, Side};
    use crate::config::{ChannelsConfig, DatabaseConfig, SideChannelConfig};
    use crate::db::{ChatLogStore as _, DatabaseManager, MirrorLinkStore as _};
    use crate::translation::{TranslationError, TranslationService, Translator};

    const MARKER: &str = "\u{200B}";
    const SIDE_A: &str = "111";
    const SIDE_B: &str = "222";

    struct FakeTranslator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(
            &self,
            text: &str,
            _source_lang: &str,
            _target_lang: &str,
        ) -> Result<String, TranslationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranslationError::EmptyResponse);
            }
            match text {
                "こんにちは" => Ok("Hello".to_string()),
                other => Ok(format!("{other} [en]")),
            }
        }
    }

    #[derive(Default)]
    struct RecordingOps {
        posts: Mutex<Vec<(String, MirrorPost)>>,
        edits: Mutex<Vec<(String, String, String, String)>>,
        deletes: Mutex<Vec<(String, String, String)>>,
        reactions_added: Mutex<Vec<(String, String, ReactionEmoji)>>,
        reactions_removed: Mutex<Vec<(String, String, ReactionEmoji)>>,
        notices: Mutex<Vec<(String, String, String)>>,
        post_counter: AtomicUsize,
        fail_posts: bool,
        fail_deletes: bool,
    }

    #[async_trait]
    impl MirrorOperations for RecordingOps {
        async fn post_mirror(&self, channel_id: &str, post: &MirrorPost) -> Result<PostedMirror> {
            if self.fail_posts {
                return Err(anyhow!("post rejected"));
            }
            let n = self.post_counter.fetch_add(1, Ordering::SeqCst) + 1;
            self.posts
                .lock()
                .await
                .push((channel_id.to_string(), post.clone()));
            Ok(PostedMirror {
                message_id: format!("mirror-{n}"),
                webhook_id: "wh-1".to_string(),
            })
        }

        async fn edit_mirror(
            &self,
            channel_id: &str,
            webhook_id: &str,
            message_id: &str,
            content: &str,
        ) -> Result<bool> {
            self.edits.lock().await.push((
                channel_id.to_string(),
                webhook_id.to_string(),
                message_id.to_string(),
                content.to_string(),
            ));
            Ok(true)
        }

        async fn delete_mirror(
            &self,
            channel_id: &str,
            webhook_id: &str,
            message_id: &str,
        ) -> Result<bool> {
            if self.fail_deletes {
                return Err(anyhow!("delete rejected"));
            }
            self.deletes.lock().await.push((
                channel_id.to_string(),
                webhook_id.to_string(),
                message_id.to_string(),
            ));
            Ok(true)
        }

        async fn add_reaction(
            &self,
            channel_id: &str,
            message_id: &str,
            emoji: &ReactionEmoji,
        ) -> Result<()> {
            self.reactions_added.lock().await.push((
                channel_id.to_string(),
                message_id.to_string(),
                emoji.clone(),
            ));
            Ok(())
        }

        async fn remove_own_reaction(
            &self,
            channel_id: &str,
            message_id: &str,
            emoji: &ReactionEmoji,
        ) -> Result<()> {
            self.reactions_removed.lock().await.push((
                channel_id.to_string(),
                message_id.to_string(),
                emoji.clone(),
            ));
            Ok(())
        }

        async fn notify_failure(
            &self,
            channel_id: &str,
            message_id: &str,
            notice: &str,
        ) -> Result<()> {
            self.notices.lock().await.push((
                channel_id.to_string(),
                message_id.to_string(),
                notice.to_string(),
            ));
            Ok(())
        }
    }

    struct Harness {
        engine: MirrorEngine,
        ops: Arc<RecordingOps>,
        translator: Arc<FakeTranslator>,
        db: DatabaseManager,
        _db_file: NamedTempFile,
    }

    fn directory() -> ChannelDirectory {
        ChannelDirectory::new(&ChannelsConfig {
            side_a: SideChannelConfig {
                id: SIDE_A.to_string(),
                source_lang: "JA".to_string(),
                target_lang: "JA".to_string(),
                failure_notice: "翻訳中にエラーが発生しました。".to_string(),
            },
            side_b: SideChannelConfig {
                id: SIDE_B.to_string(),
                source_lang: "EN".to_string(),
                target_lang: "EN-US".to_string(),
                failure_notice: "An error occurred during translation.".to_string(),
            },
        })
    }

    async fn harness(ops: RecordingOps, fail_translation: bool) -> Harness {
        let db_file = NamedTempFile::new().expect("temp sqlite file");
        let config = DatabaseConfig {
            url: None,
            filename: Some(db_file.path().to_string_lossy().to_string()),
            max_connections: Some(1),
            min_connections: Some(1),
        };
        let db = DatabaseManager::new(&config).await.expect("db manager");
        db.migrate().await.expect("migrate");

        let translator = Arc::new(FakeTranslator {
            calls: AtomicUsize::new(0),
            fail: fail_translation,
        });
        let ops = Arc::new(ops);
        let engine = MirrorEngine::new(
            directory(),
            Arc::new(TranslationService::new(translator.clone(), directory())),
            ops.clone(),
            db.chat_log_store(),
            db.mirror_link_store(),
            MARKER.to_string(),
        );

        Harness {
            engine,
            ops,
            translator,
            db,
            _db_file: db_file,
        }
    }

    fn message(id: &str, channel_id: &str, content: &str) -> InboundMessage {
        InboundMessage {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            author_id: "user-1".to_string(),
            author_username: "alice".to_string(),
            author_display_name: "Alice".to_string(),
            author_avatar_url: Some("https://cdn.example/avatar.png".to_string()),
            author_is_bot: false,
            via_webhook: false,
            content: content.to_string(),
            attachment_urls: Vec::new(),
        }
    }

    fn emoji() -> ReactionEmoji {
        ReactionEmoji::Unicode("👍".to_string())
    }

    #[tokio::test]
    async fn create_mirrors_translates_logs_and_links() {
        let h = harness(RecordingOps::default(), false).await;

        h.engine
            .handle_message_created(&message("orig-1", SIDE_A, "こんにちは"))
            .await
            .expect("create handled");

        let posts = h.ops.posts.lock().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, SIDE_B);
        assert_eq!(posts[0].1.content, "Hello");
        assert_eq!(posts[0].1.display_name, "Alice");

        let logs = h
            .db
            .chat_log_store()
            .find_recent(10)
            .await
            .expect("find recent");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].channel_side, Side::A);
        assert_eq!(logs[0].original_message, "こんにちは");
        assert_eq!(logs[0].translated_message.as_deref(), Some("Hello"));

        let forward = h
            .db
            .mirror_link_store()
            .find_by_original("orig-1")
            .await
            .expect("forward lookup")
            .expect("link exists");
        let reverse = h
            .db
            .mirror_link_store()
            .find_by_mirror(&forward.mirrored_message_id)
            .await
            .expect("reverse lookup")
            .expect("link exists");
        assert_eq!(forward, reverse);
        assert_eq!(forward.original_channel_id, SIDE_A);
        assert_eq!(forward.mirrored_channel_id, SIDE_B);
        assert_eq!(forward.webhook_id, "wh-1");
        assert_ne!(forward.original_message_id, forward.mirrored_message_id);
    }

    #[tokio::test]
    async fn mirror_artifacts_produce_no_log_and_no_link() {
        let h = harness(RecordingOps::default(), false).await;

        let mut artifact = message("orig-1", SIDE_A, "hello");
        artifact.via_webhook = true;
        artifact.author_username = format!("Alice{MARKER}");
        h.engine
            .handle_message_created(&artifact)
            .await
            .expect("artifact handled");

        let mut bot = message("orig-2", SIDE_A, "hello");
        bot.author_is_bot = true;
        h.engine
            .handle_message_created(&bot)
            .await
            .expect("bot message handled");

        assert!(h.ops.posts.lock().await.is_empty());
        assert!(
            h.db.chat_log_store()
                .find_recent(10)
                .await
                .expect("find recent")
                .is_empty()
        );
        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconfigured_channel_is_ignored() {
        let h = harness(RecordingOps::default(), false).await;

        h.engine
            .handle_message_created(&message("orig-1", "999", "hello"))
            .await
            .expect("handled");

        assert!(h.ops.posts.lock().await.is_empty());
        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whitespace_only_message_logs_without_translation() {
        let h = harness(RecordingOps::default(), false).await;

        let mut msg = message("orig-1", SIDE_B, "   ");
        msg.attachment_urls = vec!["https://cdn.example/cat.png".to_string()];
        h.engine
            .handle_message_created(&msg)
            .await
            .expect("handled");

        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);

        let logs = h
            .db
            .chat_log_store()
            .find_recent(10)
            .await
            .expect("find recent");
        assert_eq!(logs.len(), 1);
        assert!(logs[0].translated_message.is_none());

        let posts = h.ops.posts.lock().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1.content, "   ");
        assert_eq!(posts[0].1.attachment_urls.len(), 1);
    }

    #[tokio::test]
    async fn translation_failure_notifies_user_and_creates_nothing() {
        let h = harness(RecordingOps::default(), true).await;

        h.engine
            .handle_message_created(&message("orig-1", SIDE_A, "こんにちは"))
            .await
            .expect("handled");

        assert!(h.ops.posts.lock().await.is_empty());
        assert!(
            h.db.mirror_link_store()
                .find_by_original("orig-1")
                .await
                .expect("lookup")
                .is_none()
        );

        let notices = h.ops.notices.lock().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, SIDE_A);
        assert_eq!(notices[0].1, "orig-1");
        assert!(notices[0].2.contains("翻訳中にエラー"));
    }

    #[tokio::test]
    async fn post_failure_notifies_user_and_leaves_no_link() {
        let h = harness(
            RecordingOps {
                fail_posts: true,
                ..RecordingOps::default()
            },
            false,
        )
        .await;

        h.engine
            .handle_message_created(&message("orig-1", SIDE_B, "hello"))
            .await
            .expect("handled");

        assert!(
            h.db.mirror_link_store()
                .find_by_original("orig-1")
                .await
                .expect("lookup")
                .is_none()
        );
        let notices = h.ops.notices.lock().await;
        assert_eq!(notices.len(), 1);
        assert!(notices[0].2.starts_with("An error occurred"));
    }

    async fn seeded(h: &Harness) {
        h.engine
            .handle_message_created(&message("orig-1", SIDE_A, "こんにちは"))
            .await
            .expect("seed create");
    }

    #[tokio::test]
    async fn edit_syncs_freshly_translated_content_once() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_message_edited(&EditedMessage {
                id: "orig-1".to_string(),
                channel_id: SIDE_A.to_string(),
                author_username: "alice".to_string(),
                author_is_bot: false,
                via_webhook: false,
                old_content: Some("こんにちは".to_string()),
                new_content: "さようなら".to_string(),
            })
            .await
            .expect("edit handled");

        let edits = h.ops.edits.lock().await;
        assert_eq!(edits.len(), 1);
        let (channel, webhook, message, content) = &edits[0];
        assert_eq!(channel, SIDE_B);
        assert_eq!(webhook, "wh-1");
        assert_eq!(message, "mirror-1");
        assert_eq!(content, "さようなら [en]");
    }

    #[tokio::test]
    async fn edit_with_identical_content_triggers_nothing() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;
        let calls_after_seed = h.translator.calls.load(Ordering::SeqCst);

        h.engine
            .handle_message_edited(&EditedMessage {
                id: "orig-1".to_string(),
                channel_id: SIDE_A.to_string(),
                author_username: "alice".to_string(),
                author_is_bot: false,
                via_webhook: false,
                old_content: Some("こんにちは".to_string()),
                new_content: "こんにちは".to_string(),
            })
            .await
            .expect("edit handled");

        assert!(h.ops.edits.lock().await.is_empty());
        assert_eq!(h.translator.calls.load(Ordering::SeqCst), calls_after_seed);
    }

    #[tokio::test]
    async fn edit_without_link_is_a_noop() {
        let h = harness(RecordingOps::default(), false).await;

        h.engine
            .handle_message_edited(&EditedMessage {
                id: "unknown".to_string(),
                channel_id: SIDE_A.to_string(),
                author_username: "alice".to_string(),
                author_is_bot: false,
                via_webhook: false,
                old_content: None,
                new_content: "hello".to_string(),
            })
            .await
            .expect("edit handled");

        assert!(h.ops.edits.lock().await.is_empty());
    }

    #[tokio::test]
    async fn deleting_the_original_tears_down_mirror_and_record() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_message_deleted(SIDE_A, "orig-1")
            .await
            .expect("delete handled");

        let deletes = h.ops.deletes.lock().await;
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].2, "mirror-1");

        assert!(
            h.db.mirror_link_store()
                .find_by_original("orig-1")
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn record_is_purged_even_when_mirror_delete_fails() {
        let h = harness(
            RecordingOps {
                fail_deletes: true,
                ..RecordingOps::default()
            },
            false,
        )
        .await;
        seeded(&h).await;

        h.engine
            .handle_message_deleted(SIDE_A, "orig-1")
            .await
            .expect("delete handled");

        assert!(
            h.db.mirror_link_store()
                .find_by_original("orig-1")
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn deleting_the_mirror_side_purges_only_the_record() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_message_deleted(SIDE_B, "mirror-1")
            .await
            .expect("delete handled");

        // No counter-delete was attempted against the original.
        assert!(h.ops.deletes.lock().await.is_empty());
        assert!(
            h.db.mirror_link_store()
                .find_by_mirror("mirror-1")
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn reaction_on_the_original_lands_on_the_mirror() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_reaction_added(&ReactionEvent {
                channel_id: SIDE_A.to_string(),
                message_id: "orig-1".to_string(),
                user_is_bot: false,
                emoji: emoji(),
            })
            .await
            .expect("reaction handled");

        let added = h.ops.reactions_added.lock().await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].0, SIDE_B);
        assert_eq!(added[0].1, "mirror-1");
    }

    #[tokio::test]
    async fn reaction_on_the_mirror_lands_on_the_original() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_reaction_added(&ReactionEvent {
                channel_id: SIDE_B.to_string(),
                message_id: "mirror-1".to_string(),
                user_is_bot: false,
                emoji: emoji(),
            })
            .await
            .expect("reaction handled");

        let added = h.ops.reactions_added.lock().await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].0, SIDE_A);
        assert_eq!(added[0].1, "orig-1");
    }

    #[tokio::test]
    async fn reaction_removal_goes_through_the_own_reaction_path() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_reaction_removed(&ReactionEvent {
                channel_id: SIDE_A.to_string(),
                message_id: "orig-1".to_string(),
                user_is_bot: false,
                emoji: emoji(),
            })
            .await
            .expect("reaction handled");

        let removed = h.ops.reactions_removed.lock().await;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].1, "mirror-1");
        assert!(h.ops.reactions_added.lock().await.is_empty());
    }

    #[tokio::test]
    async fn bot_reactions_are_ignored() {
        let h = harness(RecordingOps::default(), false).await;
        seeded(&h).await;

        h.engine
            .handle_reaction_added(&ReactionEvent {
                channel_id: SIDE_A.to_string(),
                message_id: "orig-1".to_string(),
                user_is_bot: true,
                emoji: emoji(),
            })
            .await
            .expect("reaction handled");

        assert!(h.ops.reactions_added.lock().await.is_empty());
    }

    #[tokio::test]
    async fn reaction_on_untracked_message_is_a_noop() {
        let h = harness(RecordingOps::default(), false).await;

        h.engine
            .handle_reaction_added(&ReactionEvent {
                channel_id: SIDE_A.to_string(),
                message_id: "unknown".to_string(),
                user_is_bot: false,
                emoji: emoji(),
            })
            .await
            .expect("reaction handled");

        assert!(h.ops.reactions_added.lock().await.is_empty());
    }
}
