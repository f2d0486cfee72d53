//! Telegram channel: long-poll getUpdates and sendMessage via Bot API.

use crate::channels::handle::ChannelHandle;
use crate::channels::inbound::{InboundEvent, InboundKind};
use crate::channels::outbound::OutboundMessage;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const TELEGRAM_CHANNEL_ID: &str = "telegram";
const LONG_POLL_TIMEOUT: u64 = 30;
const POLL_ERROR_BACKOFF_SECS: u64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("{method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} failed: {status} {description}")]
    Api {
        method: &'static str,
        status: reqwest::StatusCode,
        description: String,
    },
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// Telegram update payload (getUpdates result item or webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub web_app_data: Option<WebAppData>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Data sent by a web app opened from a keyboard button.
#[derive(Debug, Deserialize)]
pub struct WebAppData {
    pub data: String,
    #[serde(default)]
    pub button_text: Option<String>,
}

impl TelegramUpdate {
    /// The event this update carries, if any. App data wins over text; other updates are ignored.
    pub fn into_event(self) -> Option<InboundEvent> {
        let msg = self.message?;
        let kind = match (msg.web_app_data, msg.text) {
            (Some(app), _) => InboundKind::AppData(app.data),
            (None, Some(text)) => InboundKind::Text(text),
            (None, None) => return None,
        };
        Some(InboundEvent {
            channel_id: TELEGRAM_CHANNEL_ID.to_string(),
            conversation_id: msg.chat.id.to_string(),
            kind,
        })
    }
}

/// Telegram channel connector: long-polls for updates and sends replies via sendMessage.
pub struct TelegramChannel {
    id: String,
    token: String,
    api_base: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            id: TELEGRAM_CHANNEL_ID.to_string(),
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Start the getUpdates long-poll loop and forward events to the bot. Returns a handle to await on shutdown.
    pub fn start_inbound(self: Arc<Self>, inbound_tx: mpsc::Sender<InboundEvent>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// POST a Bot API method with a JSON body and unwrap the `{ok, result}` envelope.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        body: &serde_json::Value,
    ) -> Result<Option<T>, TelegramError> {
        let res = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|source| TelegramError::Http { method, source })?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|source| TelegramError::Http { method, source })?;
        let envelope: Option<ApiResponse<T>> = serde_json::from_str(&text).ok();
        match envelope {
            Some(env) if status.is_success() && env.ok => Ok(env.result),
            Some(env) => Err(TelegramError::Api {
                method,
                status,
                description: env.description.unwrap_or_default(),
            }),
            None => Err(TelegramError::Api {
                method,
                status,
                description: text,
            }),
        }
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), TelegramError> {
        let mut body = serde_json::json!({
            "timeout": LONG_POLL_TIMEOUT,
            "allowed_updates": ["message"],
        });
        if let Some(off) = offset {
            body["offset"] = serde_json::Value::from(off);
        }
        let updates: Vec<TelegramUpdate> = self.call("getUpdates", &body).await?.unwrap_or_default();
        let next_offset = updates.iter().map(|u| u.update_id).max().map(|id| id + 1);
        Ok((updates, next_offset))
    }

    /// Set webhook URL (and optional secret). When set, Telegram POSTs updates to the URL instead of getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({ "url": url, "allowed_updates": ["message"] });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        self.call::<serde_json::Value>("setWebhook", &body).await?;
        Ok(())
    }

    /// Remove webhook so the bot can use getUpdates again.
    pub async fn delete_webhook(&self) -> Result<(), TelegramError> {
        self.call::<serde_json::Value>("deleteWebhook", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Send a message to a chat via sendMessage API.
    pub async fn send_message(&self, chat_id: &str, message: &OutboundMessage) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": message.text });
        if let Some(mode) = message.parse_mode {
            body["parse_mode"] = serde_json::json!(mode);
        }
        if let Some(ref keyboard) = message.reply_markup {
            body["reply_markup"] = serde_json::json!(keyboard);
        }
        self.call::<serde_json::Value>("sendMessage", &body).await?;
        Ok(())
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, inbound_tx: mpsc::Sender<InboundEvent>) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                if next.is_some() {
                    offset = next;
                }
                for event in updates.into_iter().filter_map(TelegramUpdate::into_event) {
                    if inbound_tx.send(event).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(POLL_ERROR_BACKOFF_SECS)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, conversation_id: &str, message: &OutboundMessage) -> Result<(), String> {
        TelegramChannel::send_message(self, conversation_id, message)
            .await
            .map_err(|e| e.to_string())
    }
}
