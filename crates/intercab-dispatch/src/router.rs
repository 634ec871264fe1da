// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peer notification router.
//!
//! Each role bot runs its own event loop with its own outbound channel. The
//! router maps a role to that channel, registered once at start-up, and
//! resolves recipients through the store because the sender never holds a
//! session for a user of another role.
//!
//! Delivery is best effort: the state change that caused a notification has
//! already been committed, so failures are logged at `warn`, passed to the
//! optional failure hook, and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use intercab_core::error::IntercabError;
use intercab_core::types::{Notice, PlatformId, Role, User, UserId};
use intercab_core::{ChannelAdapter, Notifier, StorageAdapter};

/// A dropped notification, as reported to the failure hook.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub role: Role,
    pub chat_id: Option<PlatformId>,
    pub error: IntercabError,
}

/// Observer invoked for every dropped notification.
pub type FailureHook = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

/// Routes notifications to the channel serving each role.
pub struct PeerRouter {
    peers: HashMap<Role, Arc<dyn ChannelAdapter + Send + Sync>>,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    on_failure: Option<FailureHook>,
}

impl PeerRouter {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self {
            peers: HashMap::new(),
            storage,
            on_failure: None,
        }
    }

    /// Registers the outbound channel for `role`, replacing any previous one.
    pub fn register(&mut self, role: Role, channel: Arc<dyn ChannelAdapter + Send + Sync>) {
        debug!(%role, channel = channel.name(), "registered peer channel");
        self.peers.insert(role, channel);
    }

    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    pub fn is_registered(&self, role: Role) -> bool {
        self.peers.contains_key(&role)
    }

    fn report(&self, failure: DeliveryFailure) {
        warn!(
            role = %failure.role,
            chat_id = ?failure.chat_id,
            error = %failure.error,
            "notification dropped"
        );
        if let Some(hook) = &self.on_failure {
            hook(&failure);
        }
    }

    async fn deliver(&self, role: Role, chat_id: PlatformId, notice: Notice) -> bool {
        let Some(channel) = self.peers.get(&role) else {
            self.report(DeliveryFailure {
                role,
                chat_id: Some(chat_id),
                error: IntercabError::Delivery {
                    role,
                    message: "no peer registered".to_string(),
                },
            });
            return false;
        };

        match channel.send(notice.to(chat_id)).await {
            Ok(_) => true,
            Err(e) => {
                self.report(DeliveryFailure {
                    role,
                    chat_id: Some(chat_id),
                    error: IntercabError::Delivery {
                        role,
                        message: e.to_string(),
                    },
                });
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for PeerRouter {
    async fn notify_user(&self, role: Role, user_id: UserId, notice: Notice) -> bool {
        let user = match self.storage.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.report(DeliveryFailure {
                    role,
                    chat_id: None,
                    error: IntercabError::not_found("user", user_id),
                });
                return false;
            }
            Err(e) => {
                self.report(DeliveryFailure {
                    role,
                    chat_id: None,
                    error: e,
                });
                return false;
            }
        };
        self.deliver(role, user.platform_id, notice).await
    }

    async fn notify_chat(&self, role: Role, chat_id: PlatformId, notice: Notice) -> bool {
        self.deliver(role, chat_id, notice).await
    }

    async fn broadcast(&self, role: Role, recipients: &[User], notice: Notice) -> usize {
        let sends = recipients
            .iter()
            .map(|user| self.deliver(role, user.platform_id, notice.clone()));
        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        debug!(
            %role,
            recipients = recipients.len(),
            delivered,
            "broadcast complete"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use intercab_config::model::StorageConfig;
    use intercab_storage::SqliteStorage;
    use intercab_test_utils::MockChannel;

    async fn storage() -> (Arc<dyn StorageAdapter + Send + Sync>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("router.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        (Arc::new(storage), dir)
    }

    #[tokio::test]
    async fn notify_user_resolves_platform_id_from_store() {
        let (storage, _dir) = storage().await;
        let driver = storage
            .get_or_create_user(555, Some("dan"), "Dan", Role::Driver)
            .await
            .unwrap();
        let channel = Arc::new(MockChannel::new());
        let mut router = PeerRouter::new(storage.clone());
        router.register(Role::Driver, channel.clone());

        assert!(router.notify_user(Role::Driver, driver.id, Notice::text("hi")).await);
        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 555);
    }

    #[tokio::test]
    async fn missing_peer_is_reported_not_raised() {
        let (storage, _dir) = storage().await;
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        let router = PeerRouter::new(storage).with_failure_hook(Arc::new(move |f| {
            assert_eq!(f.role, Role::Operator);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!router.notify_chat(Role::Operator, 1, Notice::text("x")).await);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_user_is_dropped() {
        let (storage, _dir) = storage().await;
        let channel = Arc::new(MockChannel::new());
        let mut router = PeerRouter::new(storage);
        router.register(Role::Rider, channel.clone());

        assert!(!router.notify_user(Role::Rider, 9999, Notice::text("x")).await);
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_skips_failed_deliveries() {
        let (storage, _dir) = storage().await;
        let d1 = storage
            .get_or_create_user(1, None, "D1", Role::Driver)
            .await
            .unwrap();
        let d2 = storage
            .get_or_create_user(2, None, "D2", Role::Driver)
            .await
            .unwrap();
        let channel = Arc::new(MockChannel::new());
        channel.fail_sends_to(2).await;
        let mut router = PeerRouter::new(storage);
        router.register(Role::Driver, channel.clone());

        let delivered = router
            .broadcast(Role::Driver, &[d1, d2], Notice::text("offer"))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(channel.sent_to(1).await.len(), 1);
        assert!(channel.sent_to(2).await.is_empty());
    }
}
