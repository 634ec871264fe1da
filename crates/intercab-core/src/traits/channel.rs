// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the conversational transport of one role.

use async_trait::async_trait;

use crate::error::IntercabError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage, PlatformId};

/// Bidirectional conversational transport for a single role bot.
///
/// `receive` is only ever called by that role's event loop; `send` may be
/// called from any task (the notification router shares the adapter).
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), IntercabError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, IntercabError>;

    /// Receives the next inbound event from the channel.
    async fn receive(&self) -> Result<InboundMessage, IntercabError>;

    /// Deletes a previously sent message (used to remove stale inline controls).
    async fn delete_message(
        &self,
        _chat_id: PlatformId,
        _message_id: &str,
    ) -> Result<(), IntercabError> {
        Ok(())
    }

    /// Acknowledges a button press, optionally with a short toast text.
    async fn acknowledge(&self, _ack_id: &str, _text: Option<&str>) -> Result<(), IntercabError> {
        Ok(())
    }
}
