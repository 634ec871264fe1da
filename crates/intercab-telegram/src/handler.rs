// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update filtering and content extraction.
//!
//! Determines whether an incoming Telegram update should be processed and
//! converts it into a channel-agnostic [`InboundMessage`]. Only private chats
//! are served; every bot is a one-to-one conversation.

use intercab_core::types::{InboundMessage, MessageContent, PlatformId, Sender};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, User};
use tracing::debug;

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Maps a Telegram user to the sender identity the handlers work with.
pub fn sender(user: &User) -> Sender {
    Sender {
        platform_id: platform_id(user),
        username: user.username.clone(),
        full_name: user.full_name(),
    }
}

fn platform_id(user: &User) -> PlatformId {
    // Telegram user ids fit in 52 bits.
    user.id.0 as PlatformId
}

/// Extracts content from a Telegram message.
///
/// Handles text, shared contacts and mini app data. Returns `None` for
/// unsupported message types (stickers, photos, locations, ...).
pub fn extract_content(msg: &Message) -> Option<MessageContent> {
    if let Some(text) = msg.text() {
        return Some(MessageContent::Text(text.to_string()));
    }

    if let Some(contact) = msg.contact() {
        return Some(MessageContent::Contact {
            phone: contact.phone_number.clone(),
            owner: contact.user_id.map(|id| id.0 as PlatformId),
        });
    }

    if let Some(data) = msg.web_app_data() {
        return Some(MessageContent::WebApp(data.data.clone()));
    }

    debug!(msg_id = msg.id.0, "ignoring unsupported message type");
    None
}

/// Converts a private-chat message into an [`InboundMessage`].
pub fn message_to_inbound(msg: &Message) -> Option<InboundMessage> {
    if !is_dm(msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return None;
    }
    let from = msg.from.as_ref()?;
    let content = extract_content(msg)?;

    Some(InboundMessage {
        id: msg.id.0.to_string(),
        chat_id: msg.chat.id.0,
        sender: sender(from),
        content,
        timestamp: msg.date.to_rfc3339(),
    })
}

/// Converts an inline button press into an [`InboundMessage`].
///
/// The press is answered through `ack_id`; the message carrying the button is
/// kept so the handler can remove its stale controls.
pub fn callback_to_inbound(query: &CallbackQuery) -> Option<InboundMessage> {
    let payload = query.data.clone()?;
    let sender = sender(&query.from);
    let carrier = query.message.as_ref();

    Some(InboundMessage {
        id: query.id.to_string(),
        chat_id: carrier
            .map(|m| m.chat().id.0)
            .unwrap_or(sender.platform_id),
        content: MessageContent::Button {
            payload,
            message_id: carrier.map(|m| m.id().0.to_string()),
            ack_id: Some(query.id.to_string()),
        },
        sender,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_json(user_id: u64, username: Option<&str>) -> serde_json::Value {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Test",
            "last_name": "User",
        });
        if let Some(u) = username {
            from["username"] = serde_json::json!(u);
        }
        from
    }

    fn private_message(user_id: u64, body: serde_json::Value) -> Message {
        let mut json = serde_json::json!({
            "message_id": 7,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": user_json(user_id, Some("tester")),
        });
        for (k, v) in body.as_object().unwrap() {
            json[k] = v.clone();
        }
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": user_json(user_id, None),
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    #[test]
    fn text_message_maps_fields() {
        let msg = private_message(12345, serde_json::json!({ "text": "/start" }));
        let inbound = message_to_inbound(&msg).unwrap();

        assert_eq!(inbound.id, "7");
        assert_eq!(inbound.chat_id, 12345);
        assert_eq!(inbound.sender.platform_id, 12345);
        assert_eq!(inbound.sender.username.as_deref(), Some("tester"));
        assert_eq!(inbound.sender.full_name, "Test User");
        assert_eq!(inbound.content, MessageContent::Text("/start".into()));
    }

    #[test]
    fn contact_keeps_owner() {
        let msg = private_message(
            12345,
            serde_json::json!({
                "contact": {
                    "phone_number": "+79990001122",
                    "first_name": "Test",
                    "user_id": 12345,
                }
            }),
        );
        assert_eq!(
            extract_content(&msg),
            Some(MessageContent::Contact {
                phone: "+79990001122".into(),
                owner: Some(12345),
            })
        );
    }

    #[test]
    fn web_app_data_is_passed_through() {
        let msg = private_message(
            12345,
            serde_json::json!({
                "web_app_data": {
                    "data": "{\"action\":\"take_order\",\"order_id\":5}",
                    "button_text": "Open",
                }
            }),
        );
        assert_eq!(
            extract_content(&msg),
            Some(MessageContent::WebApp(
                "{\"action\":\"take_order\",\"order_id\":5}".into()
            ))
        );
    }

    #[test]
    fn group_messages_are_ignored() {
        assert!(!is_dm(&group_message(12345, "hello")));
        assert!(message_to_inbound(&group_message(12345, "hello")).is_none());
    }

    #[test]
    fn callback_carries_message_and_ack() {
        let json = serde_json::json!({
            "id": "cbq-1",
            "from": user_json(555, None),
            "chat_instance": "ci",
            "data": "take_100",
            "message": {
                "message_id": 42,
                "date": 1700000000i64,
                "chat": { "id": 555, "type": "private", "first_name": "Test" },
                "text": "New order available",
            },
        });
        let query: CallbackQuery = serde_json::from_value(json).unwrap();
        let inbound = callback_to_inbound(&query).unwrap();

        assert_eq!(inbound.chat_id, 555);
        assert_eq!(
            inbound.content,
            MessageContent::Button {
                payload: "take_100".into(),
                message_id: Some("42".into()),
                ack_id: Some("cbq-1".into()),
            }
        );
    }

    #[test]
    fn callback_without_data_is_ignored() {
        let json = serde_json::json!({
            "id": "cbq-2",
            "from": user_json(555, None),
            "chat_instance": "ci",
        });
        let query: CallbackQuery = serde_json::from_value(json).unwrap();
        assert!(callback_to_inbound(&query).is_none());
    }
}
