// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping for storage entities.
//!
//! The canonical types live in `intercab-core::types`; this module re-exports
//! them and owns the column lists and `Row -> type` conversions shared by the
//! query modules.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

pub use intercab_core::types::{
    DriverProfile, Location, NewOrder, Order, OrderStats, OrderStatus, RiderStats, Role,
    RouteAssignment, Tariff, TariffAssignment, User, UserCounts, UserStatus,
};

/// Order columns with corridor and tariff names joined in.
pub(crate) const ORDER_SELECT: &str = "SELECT o.id, o.rider_id, o.driver_id, o.origin_id, \
     o.destination_id, o.tariff_id, o.price, o.currency, o.passengers, o.pickup_time, o.status, \
     o.created_at, o.on_way_at, o.arrived_at, o.started_at, o.completed_at, o.cancelled_at, \
     o.rider_username, o.rider_phone, \
     COALESCE(lf.name, 'unknown'), COALESCE(lt.name, 'unknown'), COALESCE(t.name, 'unknown') \
     FROM orders o \
     LEFT JOIN locations lf ON lf.id = o.origin_id \
     LEFT JOIN locations lt ON lt.id = o.destination_id \
     LEFT JOIN tariffs t ON t.id = o.tariff_id";

pub(crate) const USER_SELECT: &str =
    "SELECT id, platform_id, username, full_name, phone, role, status, created_at FROM users";

/// Parses a TEXT column into a strum enum, surfacing bad values as conversion errors.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        rider_id: row.get(1)?,
        driver_id: row.get(2)?,
        origin_id: row.get(3)?,
        destination_id: row.get(4)?,
        tariff_id: row.get(5)?,
        price: row.get(6)?,
        currency: row.get(7)?,
        passengers: row.get(8)?,
        pickup_time: row.get(9)?,
        status: parse_column(row, 10)?,
        created_at: row.get(11)?,
        on_way_at: row.get(12)?,
        arrived_at: row.get(13)?,
        started_at: row.get(14)?,
        completed_at: row.get(15)?,
        cancelled_at: row.get(16)?,
        rider_username: row.get(17)?,
        rider_phone: row.get(18)?,
        origin_name: row.get(19)?,
        destination_name: row.get(20)?,
        tariff_name: row.get(21)?,
    })
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        platform_id: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        role: parse_column(row, 5)?,
        status: parse_column(row, 6)?,
        created_at: row.get(7)?,
    })
}
