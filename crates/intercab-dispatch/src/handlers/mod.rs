// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-role conversation handlers.
//!
//! The role loop turns each inbound message into an [`Event`] (parsing button
//! payloads into [`Action`]s exactly once) and hands it, together with a
//! [`Turn`], to the handler for its role. Handlers return domain errors
//! unchanged; the loop decides how each error kind reaches the user.

pub mod driver;
pub mod operator;
pub mod rider;

use tracing::debug;

use intercab_core::action::Action;
use intercab_core::error::IntercabError;
use intercab_core::types::{MessageContent, Notice, PlatformId, Role, Sender, User, UserStatus};
use intercab_core::ChannelAdapter;

use crate::context::DispatchContext;
use crate::debounce::DebounceKey;
use crate::render::labels;
use crate::session::{Session, SessionStore};

/// An inbound message after transport-level parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Text(String),
    Action {
        action: Action,
        /// The message carrying the pressed button.
        message_id: Option<String>,
    },
    Contact {
        phone: String,
        owner: Option<PlatformId>,
    },
    WebApp(String),
}

impl Event {
    /// Parses inbound content. Returns `None` for a button payload that maps
    /// to no known action.
    pub fn from_content(content: MessageContent) -> Option<Self> {
        match content {
            MessageContent::Text(text) => {
                let trimmed = text.trim();
                if trimmed == "/start" || trimmed.starts_with("/start ") {
                    Some(Event::Start)
                } else {
                    Some(Event::Text(trimmed.to_string()))
                }
            }
            MessageContent::Button {
                payload,
                message_id,
                ..
            } => match payload.parse::<Action>() {
                Ok(action) => Some(Event::Action { action, message_id }),
                Err(e) => {
                    debug!(error = %e, "ignoring unknown button payload");
                    None
                }
            },
            MessageContent::Contact { phone, owner } => Some(Event::Contact { phone, owner }),
            MessageContent::WebApp(data) => Some(Event::WebApp(data)),
        }
    }

    /// The message whose inline controls become stale if this event fails.
    pub fn stale_message(&self) -> Option<&str> {
        match self {
            Event::Action { message_id, .. } => message_id.as_deref(),
            _ => None,
        }
    }
}

/// Everything a handler needs to process one inbound event.
pub struct Turn<'a> {
    pub ctx: &'a DispatchContext,
    pub channel: &'a (dyn ChannelAdapter + Send + Sync),
    pub sessions: &'a mut SessionStore,
    pub role: Role,
    pub chat_id: PlatformId,
    pub sender: &'a Sender,
    /// Platform id of the inbound message itself.
    pub message_id: &'a str,
}

impl Turn<'_> {
    /// Sends a notice to the current chat.
    pub async fn reply(&self, notice: Notice) -> Result<(), IntercabError> {
        self.channel.send(notice.to(self.chat_id)).await.map(|_| ())
    }

    pub async fn say(&self, text: impl Into<String>) -> Result<(), IntercabError> {
        self.reply(Notice::text(text)).await
    }

    /// Removes a message from the chat. Failures are not worth surfacing.
    pub async fn delete(&self, message_id: Option<&str>) {
        if let Some(id) = message_id
            && let Err(e) = self.channel.delete_message(self.chat_id, id).await
        {
            debug!(error = %e, message_id = id, "failed to delete message");
        }
    }

    /// The session for the sender, opened if the table has none.
    pub fn session(&mut self, user: &User) -> &mut Session {
        self.sessions.open(self.role, self.sender.platform_id, user.id)
    }

    /// The sender's user row, if registered.
    pub async fn current_user(&self) -> Result<Option<User>, IntercabError> {
        self.ctx
            .storage
            .find_user_by_platform_id(self.sender.platform_id)
            .await
    }

    /// Records `key` and reports whether it repeats within `window`.
    pub fn debounced(&mut self, user: &User, key: DebounceKey, window: std::time::Duration) -> bool {
        let hit = self.session(user).debounce.hit(key, window);
        if hit {
            debug!(role = %self.role, platform_id = self.sender.platform_id, ?key, "debounced");
        }
        hit
    }

    /// Whether a debounced menu entry repeats. Checked before the menu
    /// resets the session, so a repeat leaves the conversation untouched.
    pub fn repeated_menu(&mut self, user: &User, label: &str) -> bool {
        let (key, window) = match (self.role, label) {
            (Role::Rider, labels::NEW_ORDER) => (DebounceKey::NewOrder, self.ctx.order_debounce()),
            (Role::Driver, labels::ACTIVE_ORDERS) | (Role::Operator, labels::PENDING_ORDERS) => {
                (DebounceKey::OrderList, self.ctx.list_debounce())
            }
            (Role::Operator, labels::PENDING_DRIVERS) => {
                (DebounceKey::DriverList, self.ctx.list_debounce())
            }
            _ => return false,
        };
        self.debounced(user, key, window)
    }
}

/// Routes an event to the handler for the turn's role.
pub async fn handle(turn: &mut Turn<'_>, event: Event) -> Result<(), IntercabError> {
    match turn.role {
        Role::Rider => rider::handle(turn, event).await,
        Role::Driver => driver::handle(turn, event).await,
        Role::Operator => operator::handle(turn, event).await,
    }
}

/// Common contact-share handling: debounce, ownership check, phone update.
/// Returns `false` when the contact was ignored.
pub(crate) async fn store_contact(
    turn: &mut Turn<'_>,
    user: &User,
    phone: &str,
    owner: Option<PlatformId>,
) -> Result<bool, IntercabError> {
    let window = turn.ctx.contact_debounce();
    if turn.debounced(user, DebounceKey::Contact, window) {
        return Ok(false);
    }
    if owner.is_some_and(|o| o != turn.sender.platform_id) {
        turn.say("Please share your own phone number.").await?;
        return Ok(false);
    }
    let phone = phone.trim();
    if phone.is_empty() {
        turn.say("The shared contact has no phone number.").await?;
        return Ok(false);
    }
    turn.ctx.storage.set_user_phone(user.id, phone).await?;
    Ok(true)
}

pub(crate) fn status_refusal(status: UserStatus) -> Option<&'static str> {
    match status {
        UserStatus::Blocked => Some("Your account is blocked."),
        UserStatus::Rejected => Some("Your application was rejected."),
        _ => None,
    }
}

pub(crate) fn wrong_bot(role: Role) -> String {
    format!("This account is registered as {role}. Please use the {role} bot.")
}

pub(crate) const START_FIRST: &str = "Please send /start first.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_with_deep_link_is_start() {
        assert_eq!(
            Event::from_content(MessageContent::Text("/start ref42".into())),
            Some(Event::Start)
        );
        assert_eq!(
            Event::from_content(MessageContent::Text("  hello ".into())),
            Some(Event::Text("hello".into()))
        );
    }

    #[test]
    fn button_payload_is_parsed_once() {
        let event = Event::from_content(MessageContent::Button {
            payload: "take_100".into(),
            message_id: Some("55".into()),
            ack_id: Some("cb".into()),
        })
        .unwrap();
        assert_eq!(
            event,
            Event::Action {
                action: Action::Claim(100),
                message_id: Some("55".into())
            }
        );
        assert_eq!(event.stale_message(), Some("55"));
    }

    #[test]
    fn unknown_payload_is_dropped() {
        assert!(
            Event::from_content(MessageContent::Button {
                payload: "frobnicate".into(),
                message_id: None,
                ack_id: None,
            })
            .is_none()
        );
    }
}
