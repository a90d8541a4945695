//! Telegram Bot Integration
//!
//! Long-polls the Bot API for messages. `/eval` messages become snippet
//! requests, each run as its own task so a slow evaluation never holds up
//! polling. Session state is tracked in an availability flag: `getMe`
//! establishes the session, a failed poll terminates it and the next
//! successful poll re-establishes it.

use anyhow::{Context, Result};
use futures::FutureExt;
use reqwest::Client;
use sdk::types::{ConversationId, ResponseMessage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::parse::{command_name, parse_eval};
use super::render::{render, truncate};
use crate::config::ChatConfig;
use crate::lifecycle::ShutdownSignal;
use crate::message_bus::{Event, MessageBus};
use crate::pipeline::SnippetPipeline;

/// Delay before retrying after a failed poll
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TelegramBot {
    api_base_url: String,
    token: String,
    client: Client,
    poll_timeout_secs: u64,
    report_cleanup_failures: bool,
    pipeline: Arc<SnippetPipeline>,
    bus: MessageBus,
    available: Arc<AtomicBool>,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api_base_url", &self.api_base_url)
            .field("available", &self.is_available())
            .finish()
    }
}

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Deserialize, Debug)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BotUser {
    username: Option<String>,
}

impl TelegramBot {
    pub fn new(
        config: &ChatConfig,
        token: String,
        pipeline: Arc<SnippetPipeline>,
        bus: MessageBus,
    ) -> Self {
        Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            client: Client::builder()
                .timeout(Duration::from_secs(config.poll_timeout_secs + 30))
                .build()
                .unwrap_or_default(),
            poll_timeout_secs: config.poll_timeout_secs,
            report_cleanup_failures: config.report_cleanup_failures,
            pipeline,
            bus,
            available: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the chat session is currently established
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, self.token, method)
    }

    async fn set_available(&self, available: bool) {
        if self.available.swap(available, Ordering::SeqCst) == available {
            return;
        }
        if available {
            info!("Chat session established");
            self.bus.publish(Event::SessionEstablished).await;
        } else {
            warn!("Chat session terminated");
            self.bus.publish(Event::SessionTerminated).await;
        }
    }

    /// Check the token with `getMe` and mark the session established
    pub async fn connect(&self) -> Result<()> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .context("getMe request failed")?
            .json::<ApiResponse<BotUser>>()
            .await
            .context("getMe returned an unexpected body")?;

        if !response.ok {
            anyhow::bail!(
                "Telegram rejected the bot token: {}",
                response.description.unwrap_or_default()
            );
        }

        let username = response.result.and_then(|u| u.username).unwrap_or_default();
        info!(bot = %username, "Connected to Telegram");
        self.set_available(true).await;
        Ok(())
    }

    /// Poll until `shutdown` fires
    ///
    /// Evaluations still running at shutdown are aborted; their environments
    /// are released by the drop guard and the shutdown sweep.
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<()> {
        info!("Starting Telegram bot long-polling loop...");
        let mut offset = 0;
        let mut tasks = JoinSet::new();

        loop {
            if let Err(e) = self.connect().await {
                error!("Failed to connect to Telegram: {:#}", e);
                tokio::select! {
                    _ = shutdown.wait() => return Ok(()),
                    _ = tokio::time::sleep(RETRY_DELAY) => continue,
                }
            }
            break;
        }

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                polled = self.poll_once(offset, &mut tasks) => match polled {
                    Ok(next) => offset = next,
                    Err(e) => {
                        error!("Failed to fetch Telegram updates: {:#}", e);
                        tokio::select! {
                            _ = shutdown.wait() => break,
                            _ = tokio::time::sleep(RETRY_DELAY) => {}
                        }
                    }
                },
            }

            while let Some(Some(joined)) = tasks.join_next().now_or_never() {
                if let Err(e) = joined {
                    error!("Evaluation task failed: {}", e);
                }
            }
        }

        if !tasks.is_empty() {
            info!(pending = tasks.len(), "Aborting in-flight evaluations");
        }
        tasks.shutdown().await;
        self.set_available(false).await;
        Ok(())
    }

    /// Fetch one batch of updates and dispatch them
    ///
    /// Returns the offset for the next poll. Evaluations are spawned onto
    /// `tasks`. A failed fetch terminates the session; a successful one
    /// (re-)establishes it.
    pub async fn poll_once(&self, offset: i64, tasks: &mut JoinSet<()>) -> Result<i64> {
        let updates = match self.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                self.set_available(false).await;
                return Err(e);
            }
        };
        self.set_available(true).await;

        let mut next = offset;
        for update in updates {
            next = next.max(update.update_id + 1);
            if let Some(msg) = update.message {
                self.handle_message(msg, tasks).await;
            }
        }
        Ok(next)
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!(
            "{}?offset={}&timeout={}",
            self.method_url("getUpdates"),
            offset,
            self.poll_timeout_secs
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .json::<ApiResponse<Vec<Update>>>()
            .await?;

        if !response.ok {
            anyhow::bail!(
                "Telegram API returned ok=false: {}",
                response.description.unwrap_or_default()
            );
        }

        Ok(response.result.unwrap_or_default())
    }

    async fn handle_message(&self, msg: Message, tasks: &mut JoinSet<()>) {
        let chat_id = msg.chat.id;
        let Some(text) = msg.text else {
            return;
        };

        self.bus
            .publish(Event::MessageReceived {
                conversation_id: ConversationId::from(chat_id),
                text: text.clone(),
            })
            .await;

        let Some(command) = command_name(&text) else {
            return;
        };
        debug!(chat_id, command, "Received command");

        if command == "/eval" {
            let request = parse_eval(ConversationId::from(chat_id), &text);
            let bot = self.clone();
            tasks.spawn(async move {
                let outcome = bot.pipeline.run(request).await;
                bot.reply(chat_id, &outcome.response).await;
                if let Some(cleanup) = outcome.cleanup_error {
                    if bot.report_cleanup_failures {
                        bot.reply(chat_id, &cleanup).await;
                    }
                }
            });
            return;
        }

        let reply = match command {
            "/start" => "Evalbot is ready. Send /eval followed by expressions to evaluate them."
                .to_string(),
            "/status" => format!(
                "Evalbot is {}. Template: {}.",
                if self.is_available() { "online" } else { "offline" },
                if self.pipeline.provisioner().is_ready() {
                    "ready"
                } else {
                    "not ready"
                }
            ),
            "/help" => "Available commands:\n\
                 /eval [packages...] - Evaluate the expressions on the following lines\n\
                 /status - Check bot status\n\
                 /help   - Show this help\n\n\
                 Lines starting with `import ` are imports, every other line is an expression.\n\
                 The last expression's value is the reply."
                .to_string(),
            _ => format!("Unknown command: {}", command),
        };

        if let Err(e) = self.send_message(chat_id, &reply).await {
            error!("Failed to send command reply: {:#}", e);
        }
    }

    async fn reply(&self, chat_id: i64, response: &ResponseMessage) {
        let text = truncate(&render(&response.kind));
        if let Err(e) = self.send_message(chat_id, &text).await {
            error!("Failed to send reply to {}: {:#}", chat_id, e);
            return;
        }
        self.bus
            .publish(Event::ResponseEmitted {
                conversation_id: response.conversation_id.clone(),
                kind: response.kind.name().to_string(),
            })
            .await;
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        #[derive(Serialize)]
        struct SendMsgReq<'a> {
            chat_id: i64,
            text: &'a str,
        }

        self.client
            .post(self.method_url("sendMessage"))
            .json(&SendMsgReq { chat_id, text })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
