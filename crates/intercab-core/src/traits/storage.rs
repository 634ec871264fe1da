// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait: the Order Store and the Route/Tariff Registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IntercabError;
use crate::lifecycle::OrderTransition;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    DriverProfile, Location, LocationId, NewOrder, Order, OrderId, OrderStats, PlatformId,
    RiderStats, Role, RouteAssignment, Tariff, TariffAssignment, TariffId, User, UserCounts,
    UserId, UserStatus,
};

/// Adapter for the shared persistent store.
///
/// The store is the single synchronization point between role processes.
/// Order status only changes through [`StorageAdapter::transition_order`].
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, pragmas).
    async fn initialize(&self) -> Result<(), IntercabError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), IntercabError>;

    // --- Orders ---

    /// Inserts a new `pending` order and returns it.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, IntercabError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, IntercabError>;

    /// Applies a guarded transition. Zero affected rows yields
    /// [`IntercabError::Contention`].
    async fn transition_order(
        &self,
        id: OrderId,
        transition: OrderTransition,
    ) -> Result<(), IntercabError>;

    async fn active_orders(&self) -> Result<Vec<Order>, IntercabError>;

    /// Pending orders, oldest first.
    async fn pending_orders(&self) -> Result<Vec<Order>, IntercabError>;

    async fn orders_by_rider(&self, rider_id: UserId) -> Result<Vec<Order>, IntercabError>;

    async fn orders_by_driver(&self, driver_id: UserId) -> Result<Vec<Order>, IntercabError>;

    /// Active orders whose pickup time falls in `[start, end)`.
    async fn active_orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, IntercabError>;

    /// Service-wide counters; `today` counts orders created at or after `since`.
    async fn order_stats(&self, since: DateTime<Utc>) -> Result<OrderStats, IntercabError>;

    async fn rider_stats(&self, rider_id: UserId) -> Result<RiderStats, IntercabError>;

    // --- Users ---

    /// Returns the user with this platform id, creating it with `role` and
    /// status `pending` if absent.
    async fn get_or_create_user(
        &self,
        platform_id: PlatformId,
        username: Option<&str>,
        full_name: &str,
        role: Role,
    ) -> Result<User, IntercabError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, IntercabError>;

    async fn find_user_by_platform_id(
        &self,
        platform_id: PlatformId,
    ) -> Result<Option<User>, IntercabError>;

    async fn set_user_phone(&self, id: UserId, phone: &str) -> Result<(), IntercabError>;

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<(), IntercabError>;

    async fn set_user_status(&self, id: UserId, status: UserStatus) -> Result<(), IntercabError>;

    /// Users of a role, optionally restricted to one status.
    async fn users_by_role(
        &self,
        role: Role,
        status: Option<UserStatus>,
    ) -> Result<Vec<User>, IntercabError>;

    async fn user_counts(&self) -> Result<UserCounts, IntercabError>;

    // --- Locations ---

    async fn list_locations(&self) -> Result<Vec<Location>, IntercabError>;

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, IntercabError>;

    async fn create_location(&self, name: &str) -> Result<Location, IntercabError>;

    async fn delete_location(&self, id: LocationId) -> Result<(), IntercabError>;

    // --- Tariffs ---

    /// Active fare classes, by name.
    async fn list_tariffs(&self) -> Result<Vec<Tariff>, IntercabError>;

    async fn get_tariff(&self, id: TariffId) -> Result<Option<Tariff>, IntercabError>;

    async fn create_tariff(&self, name: &str) -> Result<Tariff, IntercabError>;

    async fn delete_tariff(&self, id: TariffId) -> Result<(), IntercabError>;

    async fn driver_tariffs(&self, driver_id: UserId) -> Result<Vec<TariffId>, IntercabError>;

    /// Flips one fare class for a driver and returns the new enabled state.
    async fn toggle_driver_tariff(
        &self,
        driver_id: UserId,
        tariff_id: TariffId,
    ) -> Result<bool, IntercabError>;

    async fn tariff_assignments(&self) -> Result<Vec<TariffAssignment>, IntercabError>;

    // --- Routes ---

    /// Adds a corridor for a driver. Adding an existing corridor is a no-op.
    async fn add_route(
        &self,
        driver_id: UserId,
        origin_id: LocationId,
        destination_id: LocationId,
    ) -> Result<(), IntercabError>;

    async fn remove_route(
        &self,
        driver_id: UserId,
        origin_id: LocationId,
        destination_id: LocationId,
    ) -> Result<(), IntercabError>;

    async fn driver_routes(&self, driver_id: UserId) -> Result<Vec<RouteAssignment>, IntercabError>;

    async fn clear_routes(&self, driver_id: UserId) -> Result<(), IntercabError>;

    async fn route_assignments(&self) -> Result<Vec<RouteAssignment>, IntercabError>;

    // --- Driver profiles ---

    async fn save_driver_profile(&self, profile: &DriverProfile) -> Result<(), IntercabError>;

    async fn get_driver_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<DriverProfile>, IntercabError>;
}
