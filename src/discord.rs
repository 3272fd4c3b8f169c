use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use serenity::all::{
    ChannelId, Client as SerenityClient, Context as SerenityContext, EmojiId,
    EventHandler as SerenityEventHandler, GatewayIntents, GuildId, Http,
    Message as SerenityMessage, MessageId, MessageUpdateEvent, Reaction, ReactionType, Ready,
    UserId, Webhook,
};
use serenity::builder::{CreateAttachment, CreateMessage, EditWebhookMessage, ExecuteWebhook};
use tokio::sync::{Mutex as AsyncMutex, RwLock, oneshot};

use crate::config::Config;
use crate::mirror::{
    EditedMessage, InboundMessage, MirrorEngine, MirrorOperations, MirrorPost, PostedMirror,
    ReactionEmoji, ReactionEvent, loop_guard,
};

use self::webhook::{WebhookManager, webhook_url};

pub mod webhook;

const INITIAL_LOGIN_RETRY_SECONDS: u64 = 2;
const MAX_LOGIN_RETRY_SECONDS: u64 = 300;

#[derive(Clone)]
pub struct DiscordClient {
    config: Arc<Config>,
    login_state: Arc<AsyncMutex<DiscordLoginState>>,
    engine: Arc<RwLock<Option<Arc<MirrorEngine>>>>,
    http: Arc<RwLock<Option<Arc<Http>>>>,
    bot_user_id: Arc<RwLock<Option<UserId>>>,
    webhooks: Arc<WebhookManager>,
}

#[derive(Default)]
struct DiscordLoginState {
    is_logged_in: bool,
    gateway_task: Option<tokio::task::JoinHandle<()>>,
}

struct GatewayHandler {
    ready_sender: Arc<AsyncMutex<Option<oneshot::Sender<()>>>>,
    http_sender: Arc<AsyncMutex<Option<oneshot::Sender<Arc<Http>>>>>,
    engine: Arc<RwLock<Option<Arc<MirrorEngine>>>>,
    bot_user_id: Arc<RwLock<Option<UserId>>>,
}

impl GatewayHandler {
    async fn engine(&self) -> Option<Arc<MirrorEngine>> {
        self.engine.read().await.clone()
    }

    async fn reaction_event(&self, reaction: &Reaction) -> ReactionEvent {
        let own_id = *self.bot_user_id.read().await;
        let user_is_bot = reaction
            .member
            .as_ref()
            .map(|member| member.user.bot)
            .unwrap_or(false)
            || (reaction.user_id.is_some() && reaction.user_id == own_id);

        ReactionEvent {
            channel_id: reaction.channel_id.to_string(),
            message_id: reaction.message_id.to_string(),
            user_is_bot,
            emoji: reaction_emoji_from(&reaction.emoji),
        }
    }
}

#[serenity::async_trait]
impl SerenityEventHandler for GatewayHandler {
    async fn ready(&self, ctx: SerenityContext, ready: Ready) {
        info!(
            "discord gateway ready as {} ({})",
            ready.user.name, ready.user.id
        );
        *self.bot_user_id.write().await = Some(ready.user.id);
        if let Some(sender) = self.ready_sender.lock().await.take() {
            let _ = sender.send(());
        }
        if let Some(sender) = self.http_sender.lock().await.take() {
            let _ = sender.send(ctx.http);
        }
    }

    async fn message(&self, _ctx: SerenityContext, msg: SerenityMessage) {
        let Some(engine) = self.engine().await else {
            debug!("ignoring discord message before engine binding");
            return;
        };

        let inbound = InboundMessage {
            id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            author_id: msg.author.id.to_string(),
            author_username: msg.author.name.clone(),
            author_display_name: message_display_name(&msg),
            author_avatar_url: Some(
                msg.author
                    .avatar_url()
                    .unwrap_or_else(|| msg.author.default_avatar_url()),
            ),
            author_is_bot: msg.author.bot,
            via_webhook: msg.webhook_id.is_some(),
            content: msg.content.clone(),
            attachment_urls: msg.attachments.iter().map(|a| a.url.clone()).collect(),
        };

        if let Err(err) = engine.handle_message_created(&inbound).await {
            error!("failed to handle discord message {}: {err}", msg.id);
        }
    }

    async fn message_update(
        &self,
        _ctx: SerenityContext,
        old_if_available: Option<SerenityMessage>,
        new_if_available: Option<SerenityMessage>,
        update: MessageUpdateEvent,
    ) {
        let Some(engine) = self.engine().await else {
            return;
        };

        let Some(new_content) = update.content.clone() else {
            // Embed-only updates carry no body; nothing to sync.
            return;
        };

        let via_webhook = new_if_available
            .as_ref()
            .map(|m| m.webhook_id.is_some())
            .unwrap_or(false);

        let edited = EditedMessage {
            id: update.id.to_string(),
            channel_id: update.channel_id.to_string(),
            author_username: update
                .author
                .as_ref()
                .map(|author| author.name.clone())
                .unwrap_or_default(),
            author_is_bot: update.author.as_ref().is_some_and(|author| author.bot),
            via_webhook,
            old_content: old_if_available.map(|m| m.content.clone()),
            new_content,
        };

        if let Err(err) = engine.handle_message_edited(&edited).await {
            error!("failed to handle discord message update {}: {err}", update.id);
        }
    }

    async fn message_delete(
        &self,
        _ctx: SerenityContext,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        let Some(engine) = self.engine().await else {
            return;
        };

        if let Err(err) = engine
            .handle_message_deleted(&channel_id.to_string(), &deleted_message_id.to_string())
            .await
        {
            error!(
                "failed to handle discord message delete {}: {err}",
                deleted_message_id
            );
        }
    }

    async fn message_delete_bulk(
        &self,
        _ctx: SerenityContext,
        channel_id: ChannelId,
        deleted_message_ids: Vec<MessageId>,
        _guild_id: Option<GuildId>,
    ) {
        let Some(engine) = self.engine().await else {
            return;
        };

        for message_id in unique_message_ids(deleted_message_ids) {
            if let Err(err) = engine
                .handle_message_deleted(&channel_id.to_string(), &message_id.to_string())
                .await
            {
                error!(
                    "failed to handle discord bulk message delete for {}: {err}",
                    message_id
                );
            }
        }
    }

    async fn reaction_add(&self, _ctx: SerenityContext, reaction: Reaction) {
        let Some(engine) = self.engine().await else {
            return;
        };

        let event = self.reaction_event(&reaction).await;
        if let Err(err) = engine.handle_reaction_added(&event).await {
            error!(
                "failed to handle discord reaction add on {}: {err}",
                reaction.message_id
            );
        }
    }

    async fn reaction_remove(&self, _ctx: SerenityContext, reaction: Reaction) {
        let Some(engine) = self.engine().await else {
            return;
        };

        let event = self.reaction_event(&reaction).await;
        if let Err(err) = engine.handle_reaction_removed(&event).await {
            error!(
                "failed to handle discord reaction remove on {}: {err}",
                reaction.message_id
            );
        }
    }
}

fn message_display_name(msg: &SerenityMessage) -> String {
    msg.member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone())
}

fn unique_message_ids(ids: Vec<MessageId>) -> Vec<MessageId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn reaction_emoji_from(value: &ReactionType) -> ReactionEmoji {
    match value {
        ReactionType::Unicode(unicode) => ReactionEmoji::Unicode(unicode.clone()),
        ReactionType::Custom { animated, id, name } => ReactionEmoji::Custom {
            id: id.get(),
            name: name.clone(),
            animated: *animated,
        },
        other => ReactionEmoji::Unicode(other.to_string()),
    }
}

fn reaction_type_from(value: &ReactionEmoji) -> ReactionType {
    match value {
        ReactionEmoji::Unicode(unicode) => ReactionType::Unicode(unicode.clone()),
        ReactionEmoji::Custom { id, name, animated } => ReactionType::Custom {
            animated: *animated,
            id: EmojiId::new(*id),
            name: name.clone(),
        },
    }
}

fn parse_id(value: &str, what: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| anyhow!("invalid {what}: {value}"))
}

impl DiscordClient {
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        info!("initializing discord client");
        let webhooks = Arc::new(WebhookManager::new(config.mirror.webhook_name.clone()));
        Ok(Self {
            config,
            login_state: Arc::new(AsyncMutex::new(DiscordLoginState::default())),
            engine: Arc::new(RwLock::new(None)),
            http: Arc::new(RwLock::new(None)),
            bot_user_id: Arc::new(RwLock::new(None)),
            webhooks,
        })
    }

    pub async fn set_engine(&self, engine: Arc<MirrorEngine>) {
        *self.engine.write().await = Some(engine);
    }

    pub async fn login(&self) -> Result<()> {
        let mut state = self.login_state.lock().await;
        if state.is_logged_in {
            return Ok(());
        }

        let intents = if self.config.auth.use_privileged_intents {
            GatewayIntents::all()
        } else {
            GatewayIntents::non_privileged()
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let (http_tx, http_rx) = oneshot::channel();
        let event_handler = GatewayHandler {
            ready_sender: Arc::new(AsyncMutex::new(Some(ready_tx))),
            http_sender: Arc::new(AsyncMutex::new(Some(http_tx))),
            engine: self.engine.clone(),
            bot_user_id: self.bot_user_id.clone(),
        };

        let mut gateway_client = SerenityClient::builder(&self.config.auth.bot_token, intents)
            .event_handler(event_handler)
            .await
            .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))?;

        let gateway_task = tokio::spawn(async move {
            if let Err(err) = gateway_client.start_autosharded().await {
                error!("discord gateway stopped: {err}");
            }
        });

        match tokio::time::timeout(std::time::Duration::from_secs(30), ready_rx).await {
            Ok(Ok(())) => {
                state.is_logged_in = true;
                state.gateway_task = Some(gateway_task);
                info!("discord bot login succeeded and gateway is connected");

                if let Ok(Ok(http)) =
                    tokio::time::timeout(std::time::Duration::from_secs(5), http_rx).await
                {
                    *self.http.write().await = Some(http);
                }

                Ok(())
            }
            Ok(Err(_)) => {
                gateway_task.abort();
                Err(anyhow!("discord gateway exited before receiving Ready event"))
            }
            Err(_) => {
                gateway_task.abort();
                Err(anyhow!("timed out waiting for discord Ready event"))
            }
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut retry_seconds = INITIAL_LOGIN_RETRY_SECONDS;

        loop {
            match self.login().await {
                Ok(()) => {
                    info!("discord client is ready");
                    return Ok(());
                }
                Err(err) => {
                    error!(
                        "failed to start discord client: {err}. retrying in {} seconds",
                        retry_seconds
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(retry_seconds)).await;
                    retry_seconds = (retry_seconds * 2).min(MAX_LOGIN_RETRY_SECONDS);
                }
            }
        }
    }

    pub async fn stop(&self) -> Result<()> {
        let mut state = self.login_state.lock().await;
        if !state.is_logged_in {
            return Ok(());
        }

        if let Some(gateway_task) = state.gateway_task.take() {
            gateway_task.abort();
            match gateway_task.await {
                Ok(()) => info!("discord gateway task exited"),
                Err(join_err) if join_err.is_cancelled() => {
                    info!("discord gateway task aborted")
                }
                Err(join_err) => {
                    error!("discord gateway task join error: {join_err}");
                }
            }
        }

        state.is_logged_in = false;
        info!("discord client stopped");
        Ok(())
    }

    async fn http(&self) -> Result<Arc<Http>> {
        self.http
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("discord http client not available"))
    }
}

#[async_trait]
impl MirrorOperations for DiscordClient {
    async fn post_mirror(&self, channel_id: &str, post: &MirrorPost) -> Result<PostedMirror> {
        let http = self.http().await?;
        let channel_id_num = parse_id(channel_id, "channel id")?;

        let actor = self.webhooks.get_or_create(&http, channel_id_num).await?;
        let url = webhook_url(actor.id, &actor.token);
        let webhook = Webhook::from_url(http.as_ref(), &url)
            .await
            .map_err(|e| anyhow!("failed to resolve webhook: {e}"))?;

        let marked_name =
            loop_guard::mark_display_name(&post.display_name, &self.config.mirror.loop_marker);

        // Attachments are re-uploaded through the webhook; a URL that cannot
        // be fetched is appended to the body instead of being dropped.
        let mut content = post.content.clone();
        let mut files = Vec::new();
        for attachment_url in &post.attachment_urls {
            match CreateAttachment::url(http.as_ref(), attachment_url).await {
                Ok(attachment) => files.push(attachment),
                Err(err) => {
                    warn!("failed to fetch attachment {attachment_url}: {err}");
                    if !content.is_empty() {
                        content.push('\n');
                    }
                    content.push_str(attachment_url);
                }
            }
        }

        let mut builder = ExecuteWebhook::new()
            .content(content)
            .username(marked_name)
            .add_files(files);
        if let Some(avatar_url) = &post.avatar_url {
            builder = builder.avatar_url(avatar_url);
        }

        let message = webhook
            .execute(http.as_ref(), true, builder)
            .await
            .map_err(|e| anyhow!("webhook send failed: {e}"))?
            .ok_or_else(|| anyhow!("webhook execution returned no message"))?;

        debug!(
            "posted mirror message_id={} channel={} webhook={}",
            message.id, channel_id, actor.id
        );

        Ok(PostedMirror {
            message_id: message.id.to_string(),
            webhook_id: actor.id.to_string(),
        })
    }

    async fn edit_mirror(
        &self,
        channel_id: &str,
        webhook_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<bool> {
        let http = self.http().await?;
        let channel_id_num = parse_id(channel_id, "channel id")?;
        let webhook_id_num = parse_id(webhook_id, "webhook id")?;
        let message_id_num = parse_id(message_id, "message id")?;

        let Some(webhook) = self
            .webhooks
            .get_by_id(&http, channel_id_num, webhook_id_num)
            .await?
        else {
            warn!("webhook {} gone from channel {}", webhook_id, channel_id);
            return Ok(false);
        };

        match webhook
            .edit_message(
                http.as_ref(),
                MessageId::new(message_id_num),
                EditWebhookMessage::new().content(content),
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                warn!("webhook edit failed message_id={}: {err}", message_id);
                Ok(false)
            }
        }
    }

    async fn delete_mirror(
        &self,
        channel_id: &str,
        webhook_id: &str,
        message_id: &str,
    ) -> Result<bool> {
        let http = self.http().await?;
        let channel_id_num = parse_id(channel_id, "channel id")?;
        let webhook_id_num = parse_id(webhook_id, "webhook id")?;
        let message_id_num = parse_id(message_id, "message id")?;

        let Some(webhook) = self
            .webhooks
            .get_by_id(&http, channel_id_num, webhook_id_num)
            .await?
        else {
            warn!("webhook {} gone from channel {}", webhook_id, channel_id);
            return Ok(false);
        };

        match webhook
            .delete_message(http.as_ref(), None, MessageId::new(message_id_num))
            .await
        {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!("webhook delete failed message_id={}: {err}", message_id);
                Ok(false)
            }
        }
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &ReactionEmoji,
    ) -> Result<()> {
        let http = self.http().await?;
        let channel = ChannelId::new(parse_id(channel_id, "channel id")?);
        let message = MessageId::new(parse_id(message_id, "message id")?);

        http.create_reaction(channel, message, &reaction_type_from(emoji))
            .await
            .map_err(|e| anyhow!("failed to add reaction: {e}"))
    }

    async fn remove_own_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &ReactionEmoji,
    ) -> Result<()> {
        let http = self.http().await?;
        let channel = ChannelId::new(parse_id(channel_id, "channel id")?);
        let message_id_num = MessageId::new(parse_id(message_id, "message id")?);
        let reaction = reaction_type_from(emoji);

        let message = http
            .get_message(channel, message_id_num)
            .await
            .map_err(|e| anyhow!("failed to fetch message for reaction check: {e}"))?;

        let own = message
            .reactions
            .iter()
            .any(|r| r.me && r.reaction_type == reaction);
        if !own {
            // Anything on the mirror we did not put there belongs to a human.
            debug!(
                "no own reaction {} on message {}, leaving it alone",
                emoji, message_id
            );
            return Ok(());
        }

        http.delete_reaction_me(channel, message_id_num, &reaction)
            .await
            .map_err(|e| anyhow!("failed to remove own reaction: {e}"))
    }

    async fn notify_failure(
        &self,
        channel_id: &str,
        message_id: &str,
        notice: &str,
    ) -> Result<()> {
        let http = self.http().await?;
        let channel = ChannelId::new(parse_id(channel_id, "channel id")?);
        let message = MessageId::new(parse_id(message_id, "message id")?);

        let warning = ReactionType::Unicode(self.config.mirror.warning_emoji.clone());
        if let Err(err) = http.create_reaction(channel, message, &warning).await {
            warn!("failed to mark message {} with warning: {err}", message_id);
        }

        channel
            .send_message(
                http.as_ref(),
                CreateMessage::new()
                    .content(notice)
                    .reference_message((channel, message)),
            )
            .await
            .map_err(|e| anyhow!("failed to send failure notice: {e}"))?;

        Ok(())
    }
}
