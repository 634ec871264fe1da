// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-role notification capability.

use async_trait::async_trait;

use crate::types::{Notice, PlatformId, Role, User, UserId};

/// "Deliver to a user of role R."
///
/// Delivery is best effort: implementations never return an error to the
/// caller. Failures are logged and reported through the implementation's own
/// failure hook, because the action that triggered the notification has
/// already been committed.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers to a user identified by internal id, resolving the platform id
    /// from the store. Returns whether the message was handed to the transport.
    async fn notify_user(&self, role: Role, user_id: UserId, notice: Notice) -> bool;

    /// Delivers to an already-known platform id.
    async fn notify_chat(&self, role: Role, chat_id: PlatformId, notice: Notice) -> bool;

    /// Delivers the same notice to many users concurrently. Returns the number
    /// of successful deliveries.
    async fn broadcast(&self, role: Role, recipients: &[User], notice: Notice) -> usize;
}
