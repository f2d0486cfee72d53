//! Bot HTTP server and channel lifecycle (single port).

use crate::bot::handler::{handle_event, BotContext};
use crate::channels::{ChannelHandle, InboundEvent, TelegramChannel, TelegramUpdate};
use crate::config::{self, BotSettings, Config};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const INBOUND_QUEUE: usize = 64;
const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";
/// How long queued events may take to be answered after the server stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// getUpdates long-poll loop.
    Polling,
    /// Telegram POSTs updates to `/telegram/webhook`.
    Webhook,
}

impl DeliveryMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Webhook => "webhook",
        }
    }
}

/// Shared state for the HTTP handlers.
#[derive(Clone)]
struct ServerState {
    mode: DeliveryMode,
    port: u16,
    webhook_secret: Option<String>,
    /// Sender for inbound events (webhook POSTs). Processor task receives.
    inbound_tx: mpsc::Sender<InboundEvent>,
}

/// Run the bot: resolve settings, start the Telegram channel (polling or webhook), and serve HTTP
/// on config.gateway.bind:config.gateway.port. Blocks until shutdown (e.g. Ctrl+C).
/// Fails immediately when the bot token or web app URL is missing.
pub async fn run_bot(config: Config) -> Result<()> {
    let settings = BotSettings::resolve(&config).context("invalid configuration")?;
    let ctx = BotContext::new(settings);
    let telegram = Arc::new(TelegramChannel::new(
        ctx.settings.bot_token.clone(),
        ctx.settings.api_base.clone(),
    ));
    log::info!("web app base url: {}", ctx.settings.webapp_url);

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(INBOUND_QUEUE);
    let mut channel_tasks: Vec<JoinHandle<()>> = Vec::new();
    let processor = spawn_processor(ctx.clone(), telegram.clone(), inbound_rx);

    let telegram_cfg = &config.channels.telegram;
    let webhook_url = telegram_cfg
        .webhook_url
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let bind = config.gateway.bind.trim();
    let mode = if let Some(ref url) = webhook_url {
        let secret = telegram_cfg.webhook_secret.as_deref();
        if secret.is_none() && !config::is_loopback_bind(bind) {
            log::warn!(
                "webhook endpoint on {} has no secret; set channels.telegram.webhookSecret",
                bind
            );
        }
        telegram
            .set_webhook(url, secret)
            .await
            .with_context(|| format!("registering telegram webhook {}", url))?;
        log::info!("telegram channel registered (webhook mode): {}", url);
        DeliveryMode::Webhook
    } else {
        // Leftover webhooks make getUpdates fail with 409.
        if let Err(e) = telegram.delete_webhook().await {
            log::debug!("telegram delete_webhook before polling: {}", e);
        }
        channel_tasks.push(telegram.clone().start_inbound(inbound_tx.clone()));
        log::info!("telegram channel registered and getUpdates loop started");
        DeliveryMode::Polling
    };

    let state = ServerState {
        mode,
        port: config.gateway.port,
        webhook_secret: telegram_cfg.webhook_secret.clone(),
        inbound_tx,
    };
    let app = Router::new()
        .route("/", get(health_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("bot listening on {} ({})", bind_addr, mode.as_str());

    // Serving consumes the router, so every sender is gone once this returns.
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(telegram, mode, channel_tasks))
        .await;
    drain_processor(processor, DRAIN_TIMEOUT).await;
    served.context("bot server exited")?;
    log::info!("bot stopped");
    Ok(())
}

/// Single consumer of the inbound queue; runs until every sender is dropped and the queue is empty.
fn spawn_processor(
    ctx: BotContext,
    channel: Arc<dyn ChannelHandle>,
    mut inbound_rx: mpsc::Receiver<InboundEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = inbound_rx.recv().await {
            handle_event(&ctx, channel.as_ref(), event).await;
        }
        log::debug!("inbound processor stopped");
    })
}

/// Wait for the processor to answer what is still queued. Aborts it after `limit`.
/// Returns true when the queue was fully drained.
async fn drain_processor(mut processor: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, &mut processor).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::warn!("inbound processor failed: {}", e);
            false
        }
        Err(_) => {
            log::warn!(
                "inbound processor still busy after {}s, dropping queued events",
                limit.as_secs()
            );
            processor.abort();
            false
        }
    }
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops the poll loop, removes the webhook if used, and awaits channel tasks.
async fn shutdown_signal(
    telegram: Arc<TelegramChannel>,
    mode: DeliveryMode,
    channel_tasks: Vec<JoinHandle<()>>,
) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping telegram channel");

    telegram.stop();
    if mode == DeliveryMode::Webhook {
        if let Err(e) = telegram.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }

    for h in channel_tasks {
        if let Err(e) = h.await {
            log::warn!("telegram channel task failed: {}", e);
        }
    }
    log::info!("channel tasks finished");
}

/// POST /telegram/webhook — receives Telegram update JSON; verifies optional secret, queues the event.
async fn telegram_webhook(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    if state.mode != DeliveryMode::Webhook {
        return StatusCode::NOT_FOUND;
    }
    if let Some(ref expected) = state.webhook_secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("telegram webhook: body is not JSON: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    // Acknowledge JSON we cannot read as an update; a non-2xx answer makes Telegram redeliver it.
    let update = match TelegramUpdate::deserialize(value) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("telegram webhook: skipping unrecognized update: {}", e);
            return StatusCode::OK;
        }
    };
    let Some(event) = update.into_event() else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(event).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for health checks).
async fn health_http(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "mode": state.mode.as_str(),
        "port": state.port,
    }))
}
