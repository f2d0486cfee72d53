//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.miniapp-bot/config.json`) and environment.
//! The bot token and the web app URL are required; everything else has defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Telegram Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings (health check and webhook endpoint).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// External web application the menu buttons open.
    #[serde(default)]
    pub web_app: WebAppConfig,
}

/// HTTP bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the HTTP server (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15152
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

/// Per-channel config.
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
    /// Bot API base URL. Overridden by TELEGRAM_API_BASE env when set.
    pub api_base: Option<String>,
}

/// Web app settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAppConfig {
    /// Base URL of the web app (e.g. "https://example.github.io/miniapp"). Overridden by MINIAPP_WEBAPP_URL env.
    pub url: Option<String>,
}

/// A required setting that was not found in env or config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("telegram bot token not configured (set channels.telegram.botToken or TELEGRAM_BOT_TOKEN)")]
    MissingBotToken,
    #[error("web app url not configured (set webApp.url or MINIAPP_WEBAPP_URL)")]
    MissingWebAppUrl,
}

/// Non-empty trimmed env value.
fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_non_empty("TELEGRAM_BOT_TOKEN")
        .or_else(|| non_empty(config.channels.telegram.bot_token.as_ref()))
}

/// Resolve the web app base URL: env MINIAPP_WEBAPP_URL overrides config. Trailing slashes are dropped.
pub fn resolve_webapp_url(config: &Config) -> Option<String> {
    env_non_empty("MINIAPP_WEBAPP_URL")
        .or_else(|| non_empty(config.web_app.url.as_ref()))
        .map(|s| s.trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Bot API base URL: env TELEGRAM_API_BASE, then config, then the public endpoint.
pub fn resolve_telegram_api_base(config: &Config) -> String {
    env_non_empty("TELEGRAM_API_BASE")
        .or_else(|| non_empty(config.channels.telegram.api_base.as_ref()))
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| TELEGRAM_API_BASE.to_string())
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Settings the bot cannot start without, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub bot_token: String,
    pub webapp_url: String,
    pub api_base: String,
}

impl BotSettings {
    /// Resolve required settings from env and config. Fails when the token or web app URL is missing.
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        let bot_token = resolve_telegram_token(config).ok_or(ConfigError::MissingBotToken)?;
        let webapp_url = resolve_webapp_url(config).ok_or(ConfigError::MissingWebAppUrl)?;
        Ok(Self {
            bot_token,
            webapp_url,
            api_base: resolve_telegram_api_base(config),
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("MINIAPP_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".miniapp-bot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
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

#[cfg(test)]
mod tests {
    use super::*;

    // Tests below avoid env overrides; they only exercise config-file values.
    fn config_with(token: Option<&str>, url: Option<&str>) -> Config {
        let mut config = Config::default();
        config.channels.telegram.bot_token = token.map(String::from);
        config.web_app.url = url.map(String::from);
        config
    }

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 15152);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn parses_camel_case_file() {
        let json = r#"{
            "gateway": { "port": 9000 },
            "channels": { "telegram": { "botToken": "123:abc", "webhookUrl": "https://bot.example/telegram/webhook" } },
            "webApp": { "url": "https://app.example/" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.channels.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(
            config.channels.telegram.webhook_url.as_deref(),
            Some("https://bot.example/telegram/webhook")
        );
        assert_eq!(config.web_app.url.as_deref(), Some("https://app.example/"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = config_with(Some("   "), Some(""));
        assert!(non_empty(config.channels.telegram.bot_token.as_ref()).is_none());
        assert!(non_empty(config.web_app.url.as_ref()).is_none());
    }

    #[test]
    fn settings_require_token_and_url() {
        if std::env::var("TELEGRAM_BOT_TOKEN").is_ok() || std::env::var("MINIAPP_WEBAPP_URL").is_ok() {
            return;
        }
        assert!(matches!(
            BotSettings::resolve(&config_with(None, Some("https://app.example"))),
            Err(ConfigError::MissingBotToken)
        ));
        assert!(matches!(
            BotSettings::resolve(&config_with(Some("123:abc"), None)),
            Err(ConfigError::MissingWebAppUrl)
        ));
        let settings =
            BotSettings::resolve(&config_with(Some("123:abc"), Some("https://app.example/"))).unwrap();
        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.webapp_url, "https://app.example");
    }

    #[test]
    fn loopback_binds() {
        assert!(is_loopback_bind("127.0.0.1"));
        assert!(is_loopback_bind(" localhost "));
        assert!(!is_loopback_bind("0.0.0.0"));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("miniapp-config-test-does-not-exist.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert!(config.channels.telegram.bot_token.is_none());
        assert_eq!(config.gateway.port, 15152);
    }
}
