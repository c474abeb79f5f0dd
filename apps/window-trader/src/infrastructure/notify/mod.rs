//! Notification Adapters
//!
//! - [`TelegramNotifier`]: posts each message to a Telegram chat through the
//!   Bot API `sendMessage` method
//! - [`LogNotifier`]: writes messages to the log when no chat is configured

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::application::ports::{Notifier, NotifyError};

/// Public Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot credentials and target chat.
#[derive(Clone)]
pub struct TelegramConfig {
    /// API base URL.
    pub api_base: String,
    /// Bot token.
    pub bot_token: String,
    /// Destination chat id.
    pub chat_id: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base)
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Delivers notifications to a Telegram chat.
///
/// The endpoint embeds the bot token, so neither `Debug` nor delivery errors
/// expose it.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for the configured bot and chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self {
            client,
            endpoint,
            chat_id: config.chat_id.clone(),
        })
    }
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("endpoint", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "window_trader::notify", text, "Notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer) -> TelegramConfig {
        TelegramConfig {
            api_base: server.uri(),
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_chat_id_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": "42",
                "text": "✅ Trade purchased for R_10. ID: 99"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(&config(&server)).unwrap();
        notifier
            .deliver("✅ Trade purchased for R_10. ID: 99")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(&config(&server)).unwrap();
        let result = notifier.deliver("hello").await;
        assert!(matches!(result, Err(NotifyError::Status(403))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let notifier = TelegramNotifier::new(&TelegramConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            bot_token: "t".to_string(),
            chat_id: "c".to_string(),
        })
        .unwrap();
        assert!(matches!(
            notifier.deliver("hello").await,
            Err(NotifyError::Http(_))
        ));
    }

    #[tokio::test]
    async fn bot_token_stays_out_of_errors_and_debug() {
        let notifier = TelegramNotifier::new(&TelegramConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            bot_token: "123456:SECRET-BOT-TOKEN".to_string(),
            chat_id: "42".to_string(),
        })
        .unwrap();

        let debug = format!("{notifier:?}");
        assert!(!debug.contains("SECRET-BOT-TOKEN"), "{debug}");
        assert!(debug.contains("[REDACTED]"));

        let error = notifier.deliver("hello").await.unwrap_err();
        let rendered = format!("{error} {error:?}");
        assert!(!rendered.contains("SECRET-BOT-TOKEN"), "{rendered}");
    }

    #[test]
    fn debug_redacts_bot_token() {
        let config = TelegramConfig {
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token: "secret-token".to_string(),
            chat_id: "42".to_string(),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.deliver("anything").await.is_ok());
    }
}
