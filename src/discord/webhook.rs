use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use secrecy::ExposeSecret;
use serenity::all::{ChannelId, Http, Webhook};
use serenity::builder::CreateWebhook;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// A usable impersonation actor for one channel: the webhook id plus the
/// token needed to post, edit, and delete through it.
#[derive(Debug, Clone)]
pub struct WebhookActor {
    pub id: u64,
    pub token: String,
}

pub fn webhook_url(id: u64, token: &str) -> String {
    format!("https://discord.com/api/webhooks/{id}/{token}")
}

/// Per-channel webhook cache. Lookup order: in-memory cache, then the
/// channel's existing webhooks (matched by name *and* bot ownership, which
/// keeps the actor identity stable across restarts), then creation. Cache
/// population is single-flight per channel so concurrent first use cannot
/// create duplicate webhooks.
pub struct WebhookManager {
    webhook_name: String,
    cache: RwLock<HashMap<u64, WebhookActor>>,
    creation_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl WebhookManager {
    pub fn new(webhook_name: String) -> Self {
        Self {
            webhook_name,
            cache: RwLock::new(HashMap::new()),
            creation_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_create(&self, http: &Http, channel_id: u64) -> Result<WebhookActor> {
        if let Some(actor) = self.cache.read().await.get(&channel_id) {
            return Ok(actor.clone());
        }

        let lock = {
            let mut locks = self.creation_locks.lock().await;
            locks
                .entry(channel_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        // Another task may have populated the entry while we waited.
        if let Some(actor) = self.cache.read().await.get(&channel_id) {
            return Ok(actor.clone());
        }

        let actor = self.find_or_create(http, channel_id).await?;
        self.cache
            .write()
            .await
            .insert(channel_id, actor.clone());
        Ok(actor)
    }

    async fn find_or_create(&self, http: &Http, channel_id: u64) -> Result<WebhookActor> {
        let channel = ChannelId::new(channel_id);
        let webhooks = channel
            .webhooks(http)
            .await
            .map_err(|e| anyhow!("failed to fetch webhooks for channel {channel_id}: {e}"))?;

        let bot_id = http
            .get_current_user()
            .await
            .map_err(|e| anyhow!("failed to resolve own user: {e}"))?
            .id;

        let existing = webhooks.iter().find(|w| {
            w.name.as_deref() == Some(self.webhook_name.as_str())
                && w.user.as_ref().is_some_and(|u| u.id == bot_id)
        });

        let webhook = match existing {
            Some(webhook) => {
                debug!(
                    "adopted existing webhook id={} channel={}",
                    webhook.id, channel_id
                );
                webhook.clone()
            }
            None => {
                let created = channel
                    .create_webhook(http, CreateWebhook::new(&self.webhook_name))
                    .await
                    .map_err(|e| anyhow!("failed to create webhook: {e}"))?;
                info!("created webhook id={} channel={}", created.id, channel_id);
                created
            }
        };

        let token = webhook
            .token
            .clone()
            .ok_or_else(|| anyhow!("webhook has no token"))?
            .expose_secret()
            .to_string();

        Ok(WebhookActor {
            id: webhook.id.get(),
            token,
        })
    }

    /// Direct lookup for the edit/delete paths, where the mirror link
    /// already records which webhook posted the mirror. Returns None when
    /// the webhook no longer exists; callers treat that as "cannot sync".
    pub async fn get_by_id(
        &self,
        http: &Http,
        channel_id: u64,
        webhook_id: u64,
    ) -> Result<Option<Webhook>> {
        let webhooks = ChannelId::new(channel_id)
            .webhooks(http)
            .await
            .map_err(|e| anyhow!("failed to fetch webhooks for channel {channel_id}: {e}"))?;
        Ok(webhooks.into_iter().find(|w| w.id.get() == webhook_id))
    }

    pub async fn clear_cache(&self, channel_id: Option<u64>) {
        let mut cache = self.cache.write().await;
        match channel_id {
            Some(channel_id) => {
                cache.remove(&channel_id);
            }
            None => cache.clear(),
        }
    }
}
