// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver matching policy.
//!
//! A driver accepts an order when both filters pass:
//!
//! - **tariff**: the order's fare class is among the driver's fare classes, or
//!   the driver has none (default-accept);
//! - **route**: the driver has the exact `(origin, destination)` corridor, or
//!   has no corridors at all (default-accept). Some corridors but none
//!   matching excludes the driver.
//!
//! The index is rebuilt from the registry for every broadcast, so a rollback
//! re-broadcast sees assignments changed since the first offer.

use std::collections::{HashMap, HashSet};

use intercab_core::error::IntercabError;
use intercab_core::types::{
    LocationId, Order, Role, RouteAssignment, TariffAssignment, TariffId, User, UserId, UserStatus,
};
use intercab_core::StorageAdapter;

/// One driver's opted-in corridors and fare classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverAssignments {
    pub routes: HashSet<(LocationId, LocationId)>,
    pub tariffs: HashSet<TariffId>,
}

impl DriverAssignments {
    pub fn accepts_tariff(&self, tariff_id: TariffId) -> bool {
        self.tariffs.is_empty() || self.tariffs.contains(&tariff_id)
    }

    pub fn accepts_corridor(&self, corridor: (LocationId, LocationId)) -> bool {
        self.routes.is_empty() || self.routes.contains(&corridor)
    }

    pub fn accepts(&self, order: &Order) -> bool {
        self.accepts_tariff(order.tariff_id) && self.accepts_corridor(order.corridor())
    }
}

/// Assignments of every driver, keyed by driver id.
#[derive(Debug, Clone, Default)]
pub struct AssignmentIndex {
    by_driver: HashMap<UserId, DriverAssignments>,
}

impl AssignmentIndex {
    pub fn from_assignments(routes: &[RouteAssignment], tariffs: &[TariffAssignment]) -> Self {
        let mut by_driver: HashMap<UserId, DriverAssignments> = HashMap::new();
        for r in routes {
            by_driver
                .entry(r.driver_id)
                .or_default()
                .routes
                .insert((r.origin_id, r.destination_id));
        }
        for t in tariffs {
            by_driver
                .entry(t.driver_id)
                .or_default()
                .tariffs
                .insert(t.tariff_id);
        }
        Self { by_driver }
    }

    /// Loads all assignments from the registry.
    pub async fn load(storage: &(dyn StorageAdapter + Send + Sync)) -> Result<Self, IntercabError> {
        let routes = storage.route_assignments().await?;
        let tariffs = storage.tariff_assignments().await?;
        Ok(Self::from_assignments(&routes, &tariffs))
    }

    /// Whether `driver_id` would be offered `order`. Drivers absent from the
    /// index have no assignments and accept everything.
    pub fn accepts(&self, driver_id: UserId, order: &Order) -> bool {
        self.by_driver
            .get(&driver_id)
            .is_none_or(|a| a.accepts(order))
    }
}

/// Loads one driver's assignments.
pub async fn driver_assignments(
    storage: &(dyn StorageAdapter + Send + Sync),
    driver_id: UserId,
) -> Result<DriverAssignments, IntercabError> {
    let routes = storage.driver_routes(driver_id).await?;
    let tariffs = storage.driver_tariffs(driver_id).await?;
    Ok(DriverAssignments {
        routes: routes
            .iter()
            .map(|r| (r.origin_id, r.destination_id))
            .collect(),
        tariffs: tariffs.into_iter().collect(),
    })
}

/// The current candidate set for an order: active drivers that pass both filters.
pub async fn candidate_drivers(
    storage: &(dyn StorageAdapter + Send + Sync),
    order: &Order,
) -> Result<Vec<User>, IntercabError> {
    let drivers = storage
        .users_by_role(Role::Driver, Some(UserStatus::Active))
        .await?;
    let index = AssignmentIndex::load(storage).await?;
    Ok(drivers
        .into_iter()
        .filter(|d| index.accepts(d.id, order))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use intercab_core::types::OrderStatus;

    const A: LocationId = 1;
    const B: LocationId = 2;
    const C: LocationId = 3;
    const D: LocationId = 4;
    const ECONOMY: TariffId = 10;
    const COMFORT: TariffId = 11;

    fn order(origin: LocationId, destination: LocationId, tariff: TariffId) -> Order {
        Order {
            id: 100,
            rider_id: 1,
            driver_id: None,
            origin_id: origin,
            destination_id: destination,
            tariff_id: tariff,
            price: 1000,
            currency: "RUB".into(),
            passengers: 1,
            pickup_time: None,
            status: OrderStatus::Active,
            created_at: Utc::now(),
            on_way_at: None,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            rider_username: "unknown".into(),
            rider_phone: "unknown".into(),
            origin_name: "A".into(),
            destination_name: "B".into(),
            tariff_name: "Economy".into(),
        }
    }

    fn route(driver_id: UserId, origin: LocationId, destination: LocationId) -> RouteAssignment {
        RouteAssignment {
            driver_id,
            origin_id: origin,
            destination_id: destination,
        }
    }

    #[test]
    fn driver_without_assignments_accepts_everything() {
        let index = AssignmentIndex::default();
        assert!(index.accepts(5, &order(A, B, ECONOMY)));
        assert!(index.accepts(5, &order(C, D, COMFORT)));
    }

    #[test]
    fn some_routes_but_none_matching_excludes() {
        let index = AssignmentIndex::from_assignments(&[route(5, C, D)], &[]);
        assert!(!index.accepts(5, &order(A, B, ECONOMY)));
        assert!(index.accepts(5, &order(C, D, ECONOMY)));
    }

    #[test]
    fn corridors_are_directional() {
        let index = AssignmentIndex::from_assignments(&[route(5, A, B)], &[]);
        assert!(!index.accepts(5, &order(B, A, ECONOMY)));
    }

    #[test]
    fn tariff_filter_defaults_open() {
        let tariffs = [TariffAssignment {
            driver_id: 5,
            tariff_id: COMFORT,
        }];
        let index = AssignmentIndex::from_assignments(&[], &tariffs);
        assert!(!index.accepts(5, &order(A, B, ECONOMY)));
        assert!(index.accepts(5, &order(A, B, COMFORT)));
        // Another driver without fare classes still accepts economy.
        assert!(index.accepts(6, &order(A, B, ECONOMY)));
    }

    #[test]
    fn both_filters_must_pass() {
        let tariffs = [TariffAssignment {
            driver_id: 5,
            tariff_id: ECONOMY,
        }];
        let index = AssignmentIndex::from_assignments(&[route(5, A, B)], &tariffs);
        assert!(index.accepts(5, &order(A, B, ECONOMY)));
        assert!(!index.accepts(5, &order(A, B, COMFORT)));
        assert!(!index.accepts(5, &order(C, D, ECONOMY)));
    }
}
