//! Telegram Bot API announcement sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{Announcement, AnnouncementSink, TransportError};

/// Telegram caps photo captions at 1024 characters.
const MAX_PHOTO_CAPTION: usize = 1024;

/// Telegram sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chat that receives update posts (numeric id or `@username`).
    pub update_chat: String,
    /// Base URL (default: https://api.telegram.org).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Posts announcements to an update channel via the Bot API.
pub struct TelegramSink {
    client: Client,
    base_url: String,
    bot_token: String,
    update_chat: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
    parameters: Option<TelegramResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct TelegramResponseParameters {
    retry_after: Option<u64>,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> Result<Self, TransportError> {
        if config.bot_token.is_empty() {
            return Err(TransportError::NotConfigured(
                "Telegram bot token is required".to_string(),
            ));
        }
        if config.update_chat.is_empty() {
            return Err(TransportError::NotConfigured(
                "Telegram update chat is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .api_base_url
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            bot_token: config.bot_token,
            update_chat: config.update_chat,
        })
    }

    /// Bot API method and JSON body for an announcement. Posts with a poster
    /// go out as `sendPhoto`, everything else as `sendMessage`.
    fn build_request(&self, announcement: &Announcement) -> (&'static str, Value) {
        let reply_markup = announcement.button.as_ref().map(|b| {
            json!({
                "inline_keyboard": [[{ "text": b.label, "url": b.url }]]
            })
        });

        let (method, mut body) = match announcement.photo_url {
            Some(ref photo) => (
                "sendPhoto",
                json!({
                    "chat_id": self.update_chat,
                    "photo": photo,
                    "caption": truncate_chars(&announcement.text, MAX_PHOTO_CAPTION),
                    "parse_mode": "Markdown",
                }),
            ),
            None => (
                "sendMessage",
                json!({
                    "chat_id": self.update_chat,
                    "text": announcement.text,
                    "parse_mode": "Markdown",
                    "disable_web_page_preview": true,
                }),
            ),
        };

        if let (Some(markup), Some(obj)) = (reply_markup, body.as_object_mut()) {
            obj.insert("reply_markup".to_string(), markup);
        }

        (method, body)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[async_trait]
impl AnnouncementSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, announcement: &Announcement) -> Result<(), TransportError> {
        let (method, body) = self.build_request(announcement);
        let url = format!("{}/bot{}/{}", self.base_url, self.bot_token, method);

        debug!(
            "Telegram {}: fingerprint={}",
            method, announcement.fingerprint
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        let parsed: Option<TelegramResponse> = response.json().await.ok();

        if status == 429 {
            return Err(TransportError::RateLimited {
                retry_after_secs: parsed
                    .and_then(|r| r.parameters)
                    .and_then(|p| p.retry_after),
            });
        }
        if status.is_server_error() {
            return Err(TransportError::Unavailable(format!(
                "Telegram returned {}",
                status
            )));
        }

        match parsed {
            Some(r) if r.ok => Ok(()),
            Some(r) => Err(TransportError::Rejected(
                r.description
                    .unwrap_or_else(|| format!("Telegram returned {}", status)),
            )),
            None => Err(TransportError::Rejected(format!(
                "Unparseable Telegram response ({})",
                status
            ))),
        }
    }
}
