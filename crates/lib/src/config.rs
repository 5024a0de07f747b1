//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.parley/config.json`) and
//! environment. Credentials are validated up front by `require_configured` so
//! a misconfigured relay fails at startup, not on the first message.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings (health probe, Telegram webhook).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// NLU provider settings (Dialogflow).
    #[serde(default)]
    pub nlu: NluConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the HTTP server (default 8787).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"). Webhook mode needs a bind that is
    /// reachable from the URL registered with Telegram.
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8787
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config (Telegram bot token, webhook settings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// When set, use webhook mode: Telegram POSTs updates to this URL. If unset, long-poll getUpdates is used.
    pub webhook_url: Option<String>,
    /// Optional secret for webhook verification (X-Telegram-Bot-Api-Secret-Token). Used only when webhook_url is set.
    pub webhook_secret: Option<String>,
}

/// NLU provider (Dialogflow) config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NluConfig {
    /// Dialogflow project id. Overridden by DIALOGFLOW_PROJECT_ID env when set.
    pub project_id: Option<String>,
    /// Bearer token for the Dialogflow REST API. Overridden by DIALOGFLOW_ACCESS_TOKEN env when set.
    pub access_token: Option<String>,
    /// Locale sent with every query (default "en").
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// API endpoint override (default https://dialogflow.googleapis.com).
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds; a call past this bound is treated as
    /// provider-unavailable (default 10).
    pub timeout_secs: Option<u64>,
}

fn default_language_code() -> String {
    "en".to_string()
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            access_token: None,
            language_code: default_language_code(),
            endpoint: None,
            timeout_secs: None,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    std::env::var("TELEGRAM_BOT_TOKEN")
        .ok()
        .and_then(non_empty)
        .or_else(|| {
            config
                .channels
                .telegram
                .bot_token
                .clone()
                .and_then(non_empty)
        })
}

/// Resolve the Dialogflow project id: env DIALOGFLOW_PROJECT_ID overrides config.
pub fn resolve_dialogflow_project(config: &Config) -> Option<String> {
    std::env::var("DIALOGFLOW_PROJECT_ID")
        .ok()
        .and_then(non_empty)
        .or_else(|| config.nlu.project_id.clone().and_then(non_empty))
}

/// Resolve the Dialogflow bearer token: env DIALOGFLOW_ACCESS_TOKEN overrides config.
pub fn resolve_dialogflow_token(config: &Config) -> Option<String> {
    std::env::var("DIALOGFLOW_ACCESS_TOKEN")
        .ok()
        .and_then(non_empty)
        .or_else(|| config.nlu.access_token.clone().and_then(non_empty))
}

/// Resolve the Dialogflow API base URL: env DIALOGFLOW_API_BASE overrides config.
pub fn resolve_dialogflow_endpoint(config: &Config) -> Option<String> {
    std::env::var("DIALOGFLOW_API_BASE")
        .ok()
        .and_then(non_empty)
        .or_else(|| config.nlu.endpoint.clone().and_then(non_empty))
}

/// Fail fast when the relay cannot run: the Telegram token and the Dialogflow
/// project id must be present (config or env) before anything starts.
pub fn require_configured(config: &Config) -> Result<()> {
    if resolve_telegram_token(config).is_none() {
        anyhow::bail!(
            "telegram bot token not configured (set channels.telegram.botToken or TELEGRAM_BOT_TOKEN)"
        );
    }
    if resolve_dialogflow_project(config).is_none() {
        anyhow::bail!(
            "dialogflow project id not configured (set nlu.projectId or DIALOGFLOW_PROJECT_ID)"
        );
    }
    Ok(())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PARLEY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".parley").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or PARLEY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
