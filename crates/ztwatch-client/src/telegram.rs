//! Telegram Bot API report sink.

use serde::Serialize;
use tracing::{error, info};

use ztwatch_core::config::TelegramConfig;
use ztwatch_health::ReportSink;

use crate::error::Exhausted;
use crate::http::HttpClient;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
struct Credentials {
    bot_token: String,
    chat_id: String,
}

/// Delivers report text to one chat. Without credentials every send is
/// skipped.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    http: HttpClient,
    credentials: Option<Credentials>,
    api_url: String,
}

impl TelegramSink {
    pub fn new(http: HttpClient, config: &TelegramConfig) -> Self {
        let credentials = match (config.bot_token.as_deref(), config.chat_id.as_deref()) {
            (Some(token), Some(chat)) if !token.trim().is_empty() && !chat.trim().is_empty() => {
                Some(Credentials {
                    bot_token: token.trim().to_string(),
                    chat_id: chat.trim().to_string(),
                })
            }
            _ => None,
        };
        Self {
            http,
            credentials,
            api_url: TELEGRAM_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

impl TelegramSink {
    async fn deliver(&self, creds: &Credentials, text: &str) -> Result<(), Exhausted> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_url.trim_end_matches('/'),
            creds.bot_token
        );
        let body = SendMessage {
            chat_id: &creds.chat_id,
            text,
        };
        self.http
            .send("telegram sendMessage", || self.http.post(&url).json(&body))
            .await
    }
}

impl ReportSink for TelegramSink {
    async fn send(&self, text: &str) {
        let Some(creds) = &self.credentials else {
            info!("telegram credentials not configured, message not sent");
            return;
        };

        match self.deliver(creds, text).await {
            Ok(()) => info!(chars = text.chars().count(), "telegram message sent"),
            Err(e) => error!(error = %e, "failed to deliver telegram message"),
        }
    }
}
