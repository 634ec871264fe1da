// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixture for the dispatch unit tests: a temp store seeded with two
//! locations, one fare class and an active rider, plus one mock channel per
//! role behind a real [`PeerRouter`].

use std::sync::Arc;

use intercab_config::model::StorageConfig;
use intercab_core::types::{LocationId, NewOrder, Order, PlatformId, Role, TariffId, User, UserStatus};
use intercab_core::StorageAdapter;
use intercab_storage::SqliteStorage;
use intercab_test_utils::MockChannel;

use crate::approval;
use crate::context::{DispatchContext, DispatchSettings};
use crate::dispatcher;
use crate::router::PeerRouter;

pub(crate) struct Fixture {
    pub ctx: DispatchContext,
    pub rider_channel: Arc<MockChannel>,
    pub driver_channel: Arc<MockChannel>,
    pub operator_channel: Arc<MockChannel>,
    pub rider: User,
    pub origin: LocationId,
    pub destination: LocationId,
    pub tariff: TariffId,
    db_path: String,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("dispatch.db").to_string_lossy().into_owned();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.clone(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);

        let rider_channel = Arc::new(MockChannel::new());
        let driver_channel = Arc::new(MockChannel::new());
        let operator_channel = Arc::new(MockChannel::new());
        let mut router = PeerRouter::new(storage.clone());
        router.register(Role::Rider, rider_channel.clone());
        router.register(Role::Driver, driver_channel.clone());
        router.register(Role::Operator, operator_channel.clone());

        let ctx = DispatchContext::new(storage.clone(), Arc::new(router), DispatchSettings::default());

        let origin = storage.create_location("A").await.unwrap().id;
        let destination = storage.create_location("B").await.unwrap().id;
        let tariff = storage.create_tariff("Economy").await.unwrap().id;

        let rider = storage
            .get_or_create_user(100, Some("rita"), "Rita", Role::Rider)
            .await
            .unwrap();
        storage.set_user_phone(rider.id, "+7999000100").await.unwrap();
        storage.set_user_status(rider.id, UserStatus::Active).await.unwrap();
        let rider = storage.get_user(rider.id).await.unwrap().unwrap();

        Self {
            ctx,
            rider_channel,
            driver_channel,
            operator_channel,
            rider,
            origin,
            destination,
            tariff,
            db_path,
            _dir: dir,
        }
    }

    /// Drops `table` through a side connection so every later read of it fails.
    pub fn drop_table(&self, table: &str) {
        let conn = rusqlite::Connection::open(&self.db_path).unwrap();
        conn.execute_batch(&format!("DROP TABLE {table};")).unwrap();
    }

    pub fn rider_phone(&self) -> String {
        self.rider.phone.clone().unwrap()
    }

    async fn user(&self, platform_id: PlatformId, role: Role, phone: &str) -> User {
        let storage = &self.ctx.storage;
        let user = storage
            .get_or_create_user(platform_id, None, &format!("{role} {platform_id}"), role)
            .await
            .unwrap();
        storage.set_user_phone(user.id, phone).await.unwrap();
        storage.set_user_status(user.id, UserStatus::Active).await.unwrap();
        storage.get_user(user.id).await.unwrap().unwrap()
    }

    /// An approved driver with no route or fare-class restrictions.
    pub async fn active_driver(&self, platform_id: PlatformId) -> User {
        self.user(platform_id, Role::Driver, &format!("+700000{platform_id}"))
            .await
    }

    pub async fn operator(&self, platform_id: PlatformId) -> User {
        self.user(platform_id, Role::Operator, &format!("+711100{platform_id}"))
            .await
    }

    /// Looks a location up by name, creating it if absent.
    pub async fn location(&self, name: &str) -> LocationId {
        let storage = &self.ctx.storage;
        let existing = storage.list_locations().await.unwrap();
        match existing.into_iter().find(|l| l.name == name) {
            Some(l) => l.id,
            None => storage.create_location(name).await.unwrap().id,
        }
    }

    pub async fn pending_order(&self) -> Order {
        let new = NewOrder {
            rider_id: self.rider.id,
            origin_id: self.origin,
            destination_id: self.destination,
            tariff_id: self.tariff,
            price: 1500,
            currency: "RUB".into(),
            passengers: 2,
            pickup_time: Some(chrono::Utc::now() + chrono::Duration::hours(3)),
            rider_username: self.rider.username.clone(),
            rider_phone: self.rider.phone.clone(),
        };
        approval::submit_order(&self.ctx, &new).await.unwrap()
    }

    pub async fn active_order(&self) -> Order {
        let order = self.pending_order().await;
        approval::approve_order(&self.ctx, order.id).await.unwrap()
    }

    pub async fn taken_order(&self, driver: &User) -> Order {
        let order = self.active_order().await;
        dispatcher::claim(&self.ctx, order.id, driver).await.unwrap();
        approval::approve_match(&self.ctx, order.id).await.unwrap()
    }
}
