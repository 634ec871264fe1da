// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use intercab_config::model::StorageConfig;
use intercab_core::lifecycle::OrderTransition;
use intercab_core::types::{
    DriverProfile, Location, LocationId, NewOrder, Order, OrderId, OrderStats, PlatformId,
    RiderStats, Role, RouteAssignment, Tariff, TariffAssignment, TariffId, User, UserCounts,
    UserId, UserStatus,
};
use intercab_core::{AdapterType, HealthStatus, IntercabError, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, IntercabError> {
        self.db.get().ok_or_else(|| IntercabError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), IntercabError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, IntercabError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IntercabError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), IntercabError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| IntercabError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), IntercabError> {
        self.checkpoint().await
    }

    // --- Orders ---

    async fn create_order(&self, order: &NewOrder) -> Result<Order, IntercabError> {
        queries::orders::create_order(self.db()?, order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, IntercabError> {
        queries::orders::get_order(self.db()?, id).await
    }

    async fn transition_order(
        &self,
        id: OrderId,
        transition: OrderTransition,
    ) -> Result<(), IntercabError> {
        transition.validate()?;
        let affected = queries::orders::transition_order(self.db()?, id, transition).await?;
        if affected == 0 {
            debug!(order_id = id, ?transition, "guarded transition lost");
            return Err(IntercabError::Contention {
                order_id: id,
                expected: transition.expected(),
            });
        }
        debug!(order_id = id, to = %transition.target(), "order transitioned");
        Ok(())
    }

    async fn active_orders(&self) -> Result<Vec<Order>, IntercabError> {
        queries::orders::active_orders(self.db()?).await
    }

    async fn pending_orders(&self) -> Result<Vec<Order>, IntercabError> {
        queries::orders::pending_orders(self.db()?).await
    }

    async fn orders_by_rider(&self, rider_id: UserId) -> Result<Vec<Order>, IntercabError> {
        queries::orders::orders_by_rider(self.db()?, rider_id).await
    }

    async fn orders_by_driver(&self, driver_id: UserId) -> Result<Vec<Order>, IntercabError> {
        queries::orders::orders_by_driver(self.db()?, driver_id).await
    }

    async fn active_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, IntercabError> {
        queries::orders::active_orders_between(self.db()?, start, end).await
    }

    async fn order_stats(&self, since: DateTime<Utc>) -> Result<OrderStats, IntercabError> {
        queries::orders::order_stats(self.db()?, since).await
    }

    async fn rider_stats(&self, rider_id: UserId) -> Result<RiderStats, IntercabError> {
        queries::orders::rider_stats(self.db()?, rider_id).await
    }

    // --- Users ---

    async fn get_or_create_user(
        &self,
        platform_id: PlatformId,
        username: Option<&str>,
        full_name: &str,
        role: Role,
    ) -> Result<User, IntercabError> {
        queries::users::get_or_create_user(self.db()?, platform_id, username, full_name, role).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, IntercabError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn find_user_by_platform_id(
        &self,
        platform_id: PlatformId,
    ) -> Result<Option<User>, IntercabError> {
        queries::users::find_user_by_platform_id(self.db()?, platform_id).await
    }

    async fn set_user_phone(&self, id: UserId, phone: &str) -> Result<(), IntercabError> {
        queries::users::set_user_phone(self.db()?, id, phone).await
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<(), IntercabError> {
        queries::users::set_user_role(self.db()?, id, role).await
    }

    async fn set_user_status(&self, id: UserId, status: UserStatus) -> Result<(), IntercabError> {
        queries::users::set_user_status(self.db()?, id, status).await
    }

    async fn users_by_role(
        &self,
        role: Role,
        status: Option<UserStatus>,
    ) -> Result<Vec<User>, IntercabError> {
        queries::users::users_by_role(self.db()?, role, status).await
    }

    async fn user_counts(&self) -> Result<UserCounts, IntercabError> {
        queries::users::user_counts(self.db()?).await
    }

    // --- Locations ---

    async fn list_locations(&self) -> Result<Vec<Location>, IntercabError> {
        queries::locations::list_locations(self.db()?).await
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, IntercabError> {
        queries::locations::get_location(self.db()?, id).await
    }

    async fn create_location(&self, name: &str) -> Result<Location, IntercabError> {
        queries::locations::create_location(self.db()?, name).await
    }

    async fn delete_location(&self, id: LocationId) -> Result<(), IntercabError> {
        queries::locations::delete_location(self.db()?, id).await
    }

    // --- Tariffs ---

    async fn list_tariffs(&self) -> Result<Vec<Tariff>, IntercabError> {
        queries::tariffs::list_tariffs(self.db()?).await
    }

    async fn get_tariff(&self, id: TariffId) -> Result<Option<Tariff>, IntercabError> {
        queries::tariffs::get_tariff(self.db()?, id).await
    }

    async fn create_tariff(&self, name: &str) -> Result<Tariff, IntercabError> {
        queries::tariffs::create_tariff(self.db()?, name).await
    }

    async fn delete_tariff(&self, id: TariffId) -> Result<(), IntercabError> {
        queries::tariffs::delete_tariff(self.db()?, id).await
    }

    async fn driver_tariffs(&self, driver_id: UserId) -> Result<Vec<TariffId>, IntercabError> {
        queries::tariffs::driver_tariffs(self.db()?, driver_id).await
    }

    async fn toggle_driver_tariff(
        &self,
        driver_id: UserId,
        tariff_id: TariffId,
    ) -> Result<bool, IntercabError> {
        queries::tariffs::toggle_driver_tariff(self.db()?, driver_id, tariff_id).await
    }

    async fn tariff_assignments(&self) -> Result<Vec<TariffAssignment>, IntercabError> {
        queries::tariffs::tariff_assignments(self.db()?).await
    }

    // --- Routes ---

    async fn add_route(
        &self,
        driver_id: UserId,
        origin_id: LocationId,
        destination_id: LocationId,
    ) -> Result<(), IntercabError> {
        queries::routes::add_route(self.db()?, driver_id, origin_id, destination_id).await
    }

    async fn remove_route(
        &self,
        driver_id: UserId,
        origin_id: LocationId,
        destination_id: LocationId,
    ) -> Result<(), IntercabError> {
        queries::routes::remove_route(self.db()?, driver_id, origin_id, destination_id).await
    }

    async fn driver_routes(&self, driver_id: UserId) -> Result<Vec<RouteAssignment>, IntercabError> {
        queries::routes::driver_routes(self.db()?, driver_id).await
    }

    async fn clear_routes(&self, driver_id: UserId) -> Result<(), IntercabError> {
        queries::routes::clear_routes(self.db()?, driver_id).await
    }

    async fn route_assignments(&self) -> Result<Vec<RouteAssignment>, IntercabError> {
        queries::routes::route_assignments(self.db()?).await
    }

    // --- Driver profiles ---

    async fn save_driver_profile(&self, profile: &DriverProfile) -> Result<(), IntercabError> {
        queries::profiles::save_driver_profile(self.db()?, profile).await
    }

    async fn get_driver_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<DriverProfile>, IntercabError> {
        queries::profiles::get_driver_profile(self.db()?, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intercab_core::types::OrderStatus;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    async fn open_storage(dir: &tempfile::TempDir, name: &str) -> SqliteStorage {
        let db_path = dir.path().join(name);
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let storage = open_storage(&dir, "double_init.db").await;
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_reflects_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        assert!(storage.health_check().await.is_err());

        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn lost_transition_is_contention() {
        let dir = tempdir().unwrap();
        let storage = open_storage(&dir, "contention.db").await;
        let rider = storage
            .get_or_create_user(1, Some("anna"), "Anna", Role::Rider)
            .await
            .unwrap();
        let a = storage.create_location("A").await.unwrap();
        let b = storage.create_location("B").await.unwrap();
        let economy = storage.create_tariff("Economy").await.unwrap();
        let order = storage
            .create_order(&NewOrder {
                rider_id: rider.id,
                origin_id: a.id,
                destination_id: b.id,
                tariff_id: economy.id,
                price: 900,
                currency: "RUB".into(),
                passengers: 1,
                pickup_time: None,
                rider_username: rider.username.clone(),
                rider_phone: rider.phone.clone(),
            })
            .await
            .unwrap();

        storage
            .transition_order(order.id, OrderTransition::Publish)
            .await
            .unwrap();
        let err = storage
            .transition_order(order.id, OrderTransition::RejectByOperator)
            .await
            .unwrap_err();
        assert!(err.is_contention());
        assert_eq!(
            err.to_string(),
            format!("order #{} is no longer pending", order.id)
        );
        assert_eq!(
            storage.get_order(order.id).await.unwrap().unwrap().status,
            OrderStatus::Active
        );
    }

    #[tokio::test]
    async fn invalid_cancel_never_reaches_the_store() {
        let dir = tempdir().unwrap();
        let storage = open_storage(&dir, "invalid.db").await;
        let err = storage
            .transition_order(
                1,
                OrderTransition::Cancel {
                    from: OrderStatus::InProgress,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntercabError::Validation(_)));
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let storage = open_storage(&dir, "shutdown.db").await;
        storage.create_location("A").await.unwrap();
        storage.shutdown().await.unwrap();
        storage.close().await.unwrap();
    }
}
