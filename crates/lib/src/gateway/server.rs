//! Relay server: wires the Telegram channel to the dispatcher and serves the
//! health + webhook HTTP routes.
//!
//! Inbound messages flow through an mpsc queue; each one is handled in its own
//! task so one user's slow provider call cannot stall another's reply.

use crate::channels::{ChannelHandle, InboundMessage, TelegramChannel, TelegramUpdate};
use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::nlu::DialogflowClient;
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
struct RelayState {
    config: Arc<Config>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

/// Handle one inbound message end to end: dispatch, then deliver the reply to
/// the conversation it came from. The dispatcher guarantees exactly one reply
/// per message; delivery failures are logged, never retried.
async fn process_inbound_message(
    dispatcher: Arc<Dispatcher>,
    channel: Option<Arc<dyn ChannelHandle>>,
    msg: InboundMessage,
) {
    let outbound = dispatcher.on_message(&msg).await;
    let Some(channel) = channel else {
        log::warn!("inbound: no connector running for channel {}", msg.channel_id);
        return;
    };
    if let Err(e) = channel.send_message(&msg.conversation_id, &outbound.text).await {
        log::warn!("inbound: send_message failed (user {}): {}", outbound.user_id, e);
    }
}

/// Run the relay; binds the HTTP server to config.gateway.bind:config.gateway.port.
/// Starts the Telegram connector in webhook mode when `channels.telegram.webhookUrl`
/// is set, otherwise in getUpdates long-poll mode. Blocks until shutdown.
pub async fn run_relay(config: Config) -> Result<()> {
    let nlu = DialogflowClient::new(
        config::resolve_dialogflow_project(&config).unwrap_or_default(),
        config::resolve_dialogflow_token(&config),
        config::resolve_dialogflow_endpoint(&config),
        config.nlu.language_code.clone(),
        config.nlu.timeout_secs,
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(nlu)));
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundMessage>(64);

    let telegram_token = config::resolve_telegram_token(&config);
    let webhook_url = config.channels.telegram.webhook_url.clone();
    let mut channel_tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut webhook_mode = false;
    let telegram: Option<Arc<TelegramChannel>> = if let Some(token) = telegram_token {
        let telegram = Arc::new(TelegramChannel::new(Some(token)));
        if let Some(ref url) = webhook_url {
            webhook_mode = true;
            let secret = config.channels.telegram.webhook_secret.as_deref();
            if let Err(e) = telegram.set_webhook(url, secret).await {
                log::warn!("telegram set_webhook failed: {}", e);
            } else {
                log::info!("telegram channel started (webhook mode): {}", url);
            }
        } else {
            let handle = telegram.clone().start_inbound(inbound_tx.clone());
            channel_tasks.push(handle);
            log::info!("telegram channel started (getUpdates long-poll mode)");
        }
        Some(telegram)
    } else {
        log::warn!("telegram bot token not configured, no channel connector started");
        None
    };

    let outbound: Option<Arc<dyn ChannelHandle>> =
        telegram.clone().map(|t| t as Arc<dyn ChannelHandle>);
    {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                tokio::spawn(process_inbound_message(
                    dispatcher.clone(),
                    outbound.clone(),
                    msg,
                ));
            }
        });
    }

    let state = RelayState {
        config: Arc::new(config.clone()),
        inbound_tx,
    };
    let app = Router::new()
        .route("/", get(health_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("relay listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(telegram, webhook_mode, channel_tasks))
        .await
        .context("relay server exited")?;
    log::info!("relay stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops the Telegram connector, removes the webhook if one was set, then
/// awaits in-process channel tasks.
async fn shutdown_signal(
    telegram: Option<Arc<TelegramChannel>>,
    webhook_mode: bool,
    channel_tasks: Vec<JoinHandle<()>>,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channel connectors");

    if let Some(ref t) = telegram {
        t.stop();
        if webhook_mode {
            if let Err(e) = t.delete_webhook().await {
                log::debug!("telegram delete_webhook on shutdown: {}", e);
            }
        }
    }

    for h in channel_tasks {
        let _ = h.await;
    }
    log::info!("channel tasks finished");
}

/// POST /telegram/webhook — receives Telegram update JSON; verifies optional secret, pushes InboundMessage.
async fn telegram_webhook(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.config.channels.telegram.webhook_secret {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let Some(inbound) = update.into_inbound("telegram") else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(inbound).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}
