// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound messages, deletions and button acknowledgements for
//! assertion in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use intercab_core::IntercabError;
use intercab_core::traits::adapter::PluginAdapter;
use intercab_core::traits::channel::ChannelAdapter;
use intercab_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageContent, MessageId,
    OutboundMessage, PlatformId, Sender,
};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
///
/// `close()` makes `receive()` fail with a "channel closed" error once the
/// inbound queue is drained, which stops a role loop.
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    deleted: Arc<Mutex<Vec<(PlatformId, String)>>>,
    acks: Arc<Mutex<Vec<(String, Option<String>)>>>,
    failing: Arc<Mutex<HashSet<PlatformId>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    next_id: AtomicU64,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            acks: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inject an inbound message into the receive queue.
    ///
    /// The next call to `receive()` will return this message.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Stop accepting inbound messages; `receive()` fails once the queue is empty.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Make every send to `chat_id` fail, as when a user blocked the bot.
    pub async fn fail_sends_to(&self, chat_id: PlatformId) {
        self.failing.lock().await.insert(chat_id);
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Messages sent to one chat, in order.
    pub async fn sent_to(&self, chat_id: PlatformId) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// `(chat_id, message_id)` pairs passed to `delete_message()`.
    pub async fn deleted(&self) -> Vec<(PlatformId, String)> {
        self.deleted.lock().await.clone()
    }

    /// `(ack_id, toast)` pairs passed to `acknowledge()`.
    pub async fn acks(&self) -> Vec<(String, Option<String>)> {
        self.acks.lock().await.clone()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, IntercabError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IntercabError> {
        self.close().await;
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_inline_buttons: true,
            supports_delete: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), IntercabError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, IntercabError> {
        if self.failing.lock().await.contains(&msg.chat_id) {
            return Err(IntercabError::Channel {
                message: format!("chat {} is unreachable", msg.chat_id),
                source: None,
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(msg);
        Ok(MessageId(id.to_string()))
    }

    async fn receive(&self) -> Result<InboundMessage, IntercabError> {
        loop {
            // Register interest before checking so a close() in between is not missed.
            let notified = self.notify.notified();
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(IntercabError::Channel {
                    message: "mock channel closed".into(),
                    source: None,
                });
            }
            notified.await;
        }
    }

    async fn delete_message(
        &self,
        chat_id: PlatformId,
        message_id: &str,
    ) -> Result<(), IntercabError> {
        self.deleted
            .lock()
            .await
            .push((chat_id, message_id.to_string()));
        Ok(())
    }

    async fn acknowledge(&self, ack_id: &str, text: Option<&str>) -> Result<(), IntercabError> {
        self.acks
            .lock()
            .await
            .push((ack_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

/// Builds a text message from `platform_id` in its private chat.
pub fn text_from(platform_id: PlatformId, text: &str) -> InboundMessage {
    inbound(platform_id, MessageContent::Text(text.to_string()))
}

/// Builds a button press on message `message_id`.
pub fn button_from(platform_id: PlatformId, payload: &str, message_id: &str) -> InboundMessage {
    inbound(
        platform_id,
        MessageContent::Button {
            payload: payload.to_string(),
            message_id: Some(message_id.to_string()),
            ack_id: Some(format!("cb-{platform_id}-{message_id}")),
        },
    )
}

/// Builds a shared contact owned by the sender.
pub fn contact_from(platform_id: PlatformId, phone: &str) -> InboundMessage {
    inbound(
        platform_id,
        MessageContent::Contact {
            phone: phone.to_string(),
            owner: Some(platform_id),
        },
    )
}

fn inbound(platform_id: PlatformId, content: MessageContent) -> InboundMessage {
    static NEXT: AtomicU64 = AtomicU64::new(10_000);
    InboundMessage {
        id: NEXT.fetch_add(1, Ordering::SeqCst).to_string(),
        chat_id: platform_id,
        sender: Sender {
            platform_id,
            username: Some(format!("user{platform_id}")),
            full_name: format!("User {platform_id}"),
        },
        content,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
