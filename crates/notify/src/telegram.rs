use async_trait::async_trait;
use aurum_core::notify::entity::IncomingCommand;
use aurum_core::notify::error::NotifyError;
use aurum_core::notify::port::{CommandSource, Notifier};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Seconds Telegram may hold a `getUpdates` request open.
const LONG_POLL_SECS: u64 = 30;

/// # Summary
/// Builds the shared HTTP client with a bounded request timeout.
fn build_client(timeout: Duration) -> Result<Client, NotifyError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NotifyError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// # Summary
/// Rejects an empty token before any request is made.
fn require_token(bot_token: &str) -> Result<(), NotifyError> {
    if bot_token.trim().is_empty() {
        return Err(NotifyError::Config("Telegram bot token is empty".into()));
    }
    Ok(())
}

/// # Summary
/// A notifier implementation that sends messages via Telegram Bot API.
///
/// # Invariants
/// * `bot_token` must be valid.
/// * Every recipient must be a chat the bot can write to.
/// * Requests time out after 10 seconds.
pub struct TelegramNotifier {
    /// The Bot API token.
    bot_token: String,
    /// Bot API root, overridable for tests and proxies.
    api_base: String,
    /// The HTTP client used for requests.
    client: Client,
}

/// # Summary
/// Payload structure for Telegram `sendMessage` API.
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    /// # Summary
    /// Creates a new `TelegramNotifier`.
    ///
    /// # Arguments
    /// * `bot_token` - The Telegram Bot API token.
    ///
    /// # Returns
    /// * A new instance, or `NotifyError::Config` when the token is empty or the
    ///   HTTP client cannot be built.
    pub fn new(bot_token: String) -> Result<Self, NotifyError> {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    /// Same as [`TelegramNotifier::new`] with a custom Bot API root.
    pub fn with_api_base(bot_token: String, api_base: &str) -> Result<Self, NotifyError> {
        require_token(&bot_token)?;
        Ok(Self {
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: build_client(Duration::from_secs(10))?,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// # Summary
    /// Sends an HTML-formatted message to the given chat.
    ///
    /// # Logic
    /// 1. Constructs the Telegram API URL.
    /// 2. Sends a POST request with HTML parse mode.
    /// 3. Checks the response status and returns success or failure.
    ///
    /// # Arguments
    /// * `recipient` - The target chat ID.
    /// * `text` - The message body (Telegram HTML subset).
    ///
    /// # Returns
    /// * `Ok(())` if the message was sent successfully.
    /// * `Err(NotifyError)` if a network error occurs or the API returns a non-success status.
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = TelegramMessage {
            chat_id: recipient,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Telegram API error ({}): {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

/// # Summary
/// Long-polls `getUpdates` and yields text messages sent to the bot.
///
/// # Invariants
/// * The offset only moves forward, so each update is returned once.
pub struct TelegramCommandSource {
    bot_token: String,
    api_base: String,
    client: Client,
    /// Next update id to request.
    offset: AtomicI64,
}

#[derive(Deserialize, Debug)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    message: Option<UpdateMessage>,
}

#[derive(Deserialize, Debug)]
struct UpdateMessage {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

/// # Summary
/// Extracts text messages and the next offset from a `getUpdates` reply.
///
/// # Returns
/// * The messages in update order and the offset to request next
///   (`None` when the batch was empty).
fn commands_from_updates(
    reply: UpdatesResponse,
) -> Result<(Vec<IncomingCommand>, Option<i64>), NotifyError> {
    if !reply.ok {
        return Err(NotifyError::Platform(
            reply
                .description
                .unwrap_or_else(|| "getUpdates failed".to_string()),
        ));
    }

    let next_offset = reply.result.iter().map(|u| u.update_id + 1).max();
    let commands = reply
        .result
        .into_iter()
        .filter_map(|update| {
            let message = update.message?;
            Some(IncomingCommand {
                chat_id: message.chat.id.to_string(),
                text: message.text?,
            })
        })
        .collect();
    Ok((commands, next_offset))
}

impl TelegramCommandSource {
    /// # Summary
    /// Creates a command source for the given bot.
    ///
    /// # Arguments
    /// * `bot_token` - The Telegram Bot API token.
    pub fn new(bot_token: String) -> Result<Self, NotifyError> {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    /// Same as [`TelegramCommandSource::new`] with a custom Bot API root.
    pub fn with_api_base(bot_token: String, api_base: &str) -> Result<Self, NotifyError> {
        require_token(&bot_token)?;
        Ok(Self {
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            // the client timeout has to outlive the long poll
            client: build_client(Duration::from_secs(LONG_POLL_SECS + 10))?,
            offset: AtomicI64::new(0),
        })
    }
}

#[async_trait]
impl CommandSource for TelegramCommandSource {
    /// # Summary
    /// Fetches pending updates, waiting up to 30 seconds for new ones.
    ///
    /// # Logic
    /// 1. Calls `getUpdates` with the current offset and long-poll timeout.
    /// 2. Advances the offset past the newest update received.
    /// 3. Returns only messages that carry text.
    async fn poll_commands(&self) -> Result<Vec<IncomingCommand>, NotifyError> {
        let url = format!("{}/bot{}/getUpdates", self.api_base, self.bot_token);
        let offset = self.offset.load(Ordering::SeqCst);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("offset", offset.to_string().as_str()),
                ("timeout", LONG_POLL_SECS.to_string().as_str()),
                ("allowed_updates", r#"["message"]"#),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let reply: UpdatesResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Platform(format!("Malformed getUpdates reply: {}", e)))?;

        let (commands, next_offset) = commands_from_updates(reply)?;
        if let Some(next) = next_offset {
            self.offset.fetch_max(next, Ordering::SeqCst);
        }
        if !commands.is_empty() {
            debug!("Received {} Telegram messages", commands.len());
        }
        Ok(commands)
    }
}
