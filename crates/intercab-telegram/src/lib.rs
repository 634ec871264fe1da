// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the intercab role bots.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide. Each
//! role (rider, driver, operator) runs its own bot with its own token, so one
//! [`TelegramChannel`] serves exactly one role: long polling feeds its role
//! loop, and the notification router sends through it on behalf of the other
//! roles.

pub mod handler;
pub mod markup;

use async_trait::async_trait;
use intercab_core::error::IntercabError;
use intercab_core::traits::{ChannelAdapter, PluginAdapter};
use intercab_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageId, OutboundMessage,
    PlatformId, Role,
};
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ChatId, ParseMode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Buffered inbound updates per bot before long polling applies backpressure.
const INBOUND_BUFFER: usize = 100;

/// Telegram channel adapter implementing [`ChannelAdapter`] for one role's bot.
pub struct TelegramChannel {
    role: Role,
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter for `role`.
    pub fn new(role: Role, token: &str) -> Result<Self, IntercabError> {
        if token.trim().is_empty() {
            return Err(IntercabError::Config(format!(
                "telegram.{role}_token cannot be empty"
            )));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        Ok(Self {
            role,
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn channel_error(action: &str, e: teloxide::RequestError) -> IntercabError {
    IntercabError::Channel {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        match self.role {
            Role::Rider => "telegram-rider",
            Role::Driver => "telegram-driver",
            Role::Operator => "telegram-operator",
        }
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, IntercabError> {
        // Check if the bot token is valid by calling getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "{} bot unreachable: {e}",
                self.role
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), IntercabError> {
        debug!(role = %self.role, "Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_inline_buttons: true,
            supports_delete: true,
            max_message_length: Some(markup::MAX_MESSAGE_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), IntercabError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();
        let role = self.role;

        info!(%role, "starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = message_tx.clone();
                    async move {
                        if let Some(inbound) = handler::message_to_inbound(&msg)
                            && tx.send(inbound).await.is_err()
                        {
                            warn!(%role, "inbound channel closed, dropping message");
                        }
                        respond(())
                    }
                }))
                .branch(Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                    let tx = callback_tx.clone();
                    async move {
                        match handler::callback_to_inbound(&query) {
                            Some(inbound) => {
                                if tx.send(inbound).await.is_err() {
                                    warn!(%role, "inbound channel closed, dropping button press");
                                }
                            }
                            None => debug!(%role, "ignoring callback without data"),
                        }
                        respond(())
                    }
                }));

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // Silently ignore other updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, IntercabError> {
        let chat_id = ChatId(msg.chat_id);
        let text = markup::fit_message(&msg.text);
        let reply_markup = msg.keyboard.as_ref().map(markup::to_reply_markup);

        let mut request = self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
        if let Some(markup) = reply_markup.clone() {
            request = request.reply_markup(markup);
        }

        let sent = match request.await {
            Ok(sent) => sent,
            Err(e) if e.to_string().contains("can't parse entities") => {
                // Fall back to plain text.
                warn!(role = %self.role, error = %e, "HTML send failed, sending as plain text");
                let mut plain = self.bot.send_message(chat_id, text);
                if let Some(markup) = reply_markup {
                    plain = plain.reply_markup(markup);
                }
                plain.await.map_err(|e| channel_error("send message", e))?
            }
            Err(e) => return Err(channel_error("send message", e)),
        };

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundMessage, IntercabError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| IntercabError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn delete_message(
        &self,
        chat_id: PlatformId,
        message_id: &str,
    ) -> Result<(), IntercabError> {
        let msg_id = message_id
            .parse::<i32>()
            .map(teloxide::types::MessageId)
            .map_err(|e| IntercabError::Channel {
                message: format!("invalid message_id: {e}"),
                source: None,
            })?;

        self.bot
            .delete_message(ChatId(chat_id), msg_id)
            .await
            .map_err(|e| channel_error("delete message", e))?;
        Ok(())
    }

    async fn acknowledge(&self, ack_id: &str, text: Option<&str>) -> Result<(), IntercabError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(ack_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| channel_error("answer callback query", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_token() {
        let err = TelegramChannel::new(Role::Driver, "  ").err().unwrap();
        assert!(err.to_string().contains("driver_token"));
    }

    #[test]
    fn new_accepts_valid_token() {
        assert!(TelegramChannel::new(Role::Rider, "123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11").is_ok());
    }

    #[test]
    fn capabilities_are_correct() {
        let channel = TelegramChannel::new(Role::Operator, "test:token").unwrap();
        let caps = channel.capabilities();
        assert!(caps.supports_inline_buttons);
        assert!(caps.supports_delete);
        assert_eq!(caps.max_message_length, Some(4096));
    }

    #[test]
    fn plugin_adapter_metadata() {
        let channel = TelegramChannel::new(Role::Driver, "test:token").unwrap();
        assert_eq!(channel.name(), "telegram-driver");
        assert_eq!(channel.role(), Role::Driver);
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[tokio::test]
    async fn delete_rejects_non_numeric_message_id() {
        let channel = TelegramChannel::new(Role::Rider, "test:token").unwrap();
        assert!(channel.delete_message(1, "abc").await.is_err());
    }
}
