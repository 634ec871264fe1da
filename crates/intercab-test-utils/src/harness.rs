// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete dispatch stack: a temp SQLite store,
//! one mock channel per role behind a real notification router, and the
//! three role loops. Tests drive it by feeding inbound messages to a role and
//! asserting on what each mock channel captured.

use std::sync::Arc;

use intercab_config::model::{DispatchConfig, OperatorConfig, StorageConfig};
use intercab_core::action::Action;
use intercab_core::types::{
    InboundMessage, LocationId, OutboundMessage, PlatformId, Role, TariffId, User, UserStatus,
};
use intercab_core::{IntercabError, StorageAdapter};
use intercab_dispatch::{DispatchContext, DispatchSettings, PeerRouter, RoleLoop};
use intercab_storage::SqliteStorage;

use crate::mock_channel::{MockChannel, button_from, contact_from, text_from};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    dispatch: DispatchConfig,
    operator: OperatorConfig,
    locations: Vec<String>,
    tariffs: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            operator: OperatorConfig::default(),
            locations: vec!["Airport".to_string(), "Downtown".to_string()],
            tariffs: vec!["Economy".to_string()],
        }
    }

    /// Set the login challenge credentials.
    pub fn with_operator_credentials(mut self, login: &str, password: &str) -> Self {
        self.operator.login = Some(login.to_string());
        self.operator.password = Some(password.to_string());
        self
    }

    /// Promote `platform_id` to operator on `/start`.
    pub fn with_bootstrap_operator(mut self, platform_id: PlatformId) -> Self {
        self.operator.bootstrap_ids.push(platform_id);
        self
    }

    /// Replace the dispatch tuning.
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replace the seeded catalog.
    pub fn with_catalog(mut self, locations: &[&str], tariffs: &[&str]) -> Self {
        self.locations = locations.iter().map(|s| s.to_string()).collect();
        self.tariffs = tariffs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, IntercabError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| IntercabError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);

        let mut locations = Vec::with_capacity(self.locations.len());
        for name in &self.locations {
            locations.push(storage.create_location(name).await?.id);
        }
        let mut tariffs = Vec::with_capacity(self.tariffs.len());
        for name in &self.tariffs {
            tariffs.push(storage.create_tariff(name).await?.id);
        }

        let rider_channel = Arc::new(MockChannel::new());
        let driver_channel = Arc::new(MockChannel::new());
        let operator_channel = Arc::new(MockChannel::new());

        let mut router = PeerRouter::new(storage.clone());
        router.register(Role::Rider, rider_channel.clone());
        router.register(Role::Driver, driver_channel.clone());
        router.register(Role::Operator, operator_channel.clone());

        let ctx = DispatchContext::new(
            storage.clone(),
            Arc::new(router),
            DispatchSettings {
                dispatch: self.dispatch,
                operator: self.operator,
            },
        );

        Ok(TestHarness {
            rider: RoleLoop::new(Role::Rider, rider_channel.clone(), ctx.clone()),
            driver: RoleLoop::new(Role::Driver, driver_channel.clone(), ctx.clone()),
            operator: RoleLoop::new(Role::Operator, operator_channel.clone(), ctx.clone()),
            rider_channel,
            driver_channel,
            operator_channel,
            storage,
            ctx,
            locations,
            tariffs,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock channels and temp storage.
pub struct TestHarness {
    pub rider_channel: Arc<MockChannel>,
    pub driver_channel: Arc<MockChannel>,
    pub operator_channel: Arc<MockChannel>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    pub ctx: DispatchContext,
    /// Seeded location ids, in builder order.
    pub locations: Vec<LocationId>,
    /// Seeded fare-class ids, in builder order.
    pub tariffs: Vec<TariffId>,
    rider: RoleLoop,
    driver: RoleLoop,
    operator: RoleLoop,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn channel(&self, role: Role) -> &Arc<MockChannel> {
        match role {
            Role::Rider => &self.rider_channel,
            Role::Driver => &self.driver_channel,
            Role::Operator => &self.operator_channel,
        }
    }

    pub fn role_loop(&self, role: Role) -> &RoleLoop {
        match role {
            Role::Rider => &self.rider,
            Role::Driver => &self.driver,
            Role::Operator => &self.operator,
        }
    }

    /// Feeds one inbound message to a role's loop, as if its bot received it.
    pub async fn send(&mut self, role: Role, msg: InboundMessage) -> Result<(), IntercabError> {
        let role_loop = match role {
            Role::Rider => &mut self.rider,
            Role::Driver => &mut self.driver,
            Role::Operator => &mut self.operator,
        };
        role_loop.handle_inbound(msg).await
    }

    pub async fn text(
        &mut self,
        role: Role,
        platform_id: PlatformId,
        text: &str,
    ) -> Result<(), IntercabError> {
        self.send(role, text_from(platform_id, text)).await
    }

    /// Presses a button carrying `action` on a previously sent message.
    pub async fn press(
        &mut self,
        role: Role,
        platform_id: PlatformId,
        action: &Action,
    ) -> Result<(), IntercabError> {
        self.send(role, button_from(platform_id, &action.to_string(), "1"))
            .await
    }

    pub async fn share_contact(
        &mut self,
        role: Role,
        platform_id: PlatformId,
        phone: &str,
    ) -> Result<(), IntercabError> {
        self.send(role, contact_from(platform_id, phone)).await
    }

    /// The last message a role's bot sent to `platform_id`.
    pub async fn last_sent(&self, role: Role, platform_id: PlatformId) -> Option<OutboundMessage> {
        self.channel(role).sent_to(platform_id).await.pop()
    }

    /// Registers a rider through the bot: `/start`, then a contact share.
    pub async fn register_rider(
        &mut self,
        platform_id: PlatformId,
        phone: &str,
    ) -> Result<User, IntercabError> {
        self.text(Role::Rider, platform_id, "/start").await?;
        self.share_contact(Role::Rider, platform_id, phone).await?;
        self.user(platform_id).await
    }

    /// Seeds an approved driver directly in the store.
    pub async fn active_driver(
        &self,
        platform_id: PlatformId,
        phone: &str,
    ) -> Result<User, IntercabError> {
        self.seed_user(platform_id, Role::Driver, phone).await
    }

    /// Seeds an active operator directly in the store.
    pub async fn operator(&self, platform_id: PlatformId) -> Result<User, IntercabError> {
        self.seed_user(platform_id, Role::Operator, "+10000000000").await
    }

    async fn seed_user(
        &self,
        platform_id: PlatformId,
        role: Role,
        phone: &str,
    ) -> Result<User, IntercabError> {
        let user = self
            .storage
            .get_or_create_user(
                platform_id,
                Some(&format!("user{platform_id}")),
                &format!("User {platform_id}"),
                role,
            )
            .await?;
        self.storage.set_user_phone(user.id, phone).await?;
        self.storage.set_user_status(user.id, UserStatus::Active).await?;
        self.user(platform_id).await
    }

    pub async fn user(&self, platform_id: PlatformId) -> Result<User, IntercabError> {
        self.storage
            .find_user_by_platform_id(platform_id)
            .await?
            .ok_or_else(|| IntercabError::not_found("user", platform_id))
    }
}
