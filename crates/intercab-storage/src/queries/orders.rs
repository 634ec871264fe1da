// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order Store queries: creation, guarded transitions, and reads.

use chrono::{DateTime, Utc};
use intercab_core::lifecycle::{DriverEffect, OrderTransition};
use intercab_core::types::{OrderId, UNKNOWN, UserId};
use intercab_core::IntercabError;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::database::Database;
use crate::models::{order_from_row, NewOrder, Order, OrderStats, OrderStatus, RiderStats, ORDER_SELECT};

/// Insert a new `pending` order and return it with joined names.
pub async fn create_order(db: &Database, order: &NewOrder) -> Result<Order, IntercabError> {
    let order = order.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO orders (rider_id, origin_id, destination_id, tariff_id, price, currency,
                     passengers, pickup_time, status, created_at, rider_username, rider_phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    order.rider_id,
                    order.origin_id,
                    order.destination_id,
                    order.tariff_id,
                    order.price,
                    order.currency,
                    order.passengers,
                    order.pickup_time,
                    OrderStatus::Pending.to_string(),
                    Utc::now(),
                    order.rider_username.as_deref().unwrap_or(UNKNOWN),
                    order.rider_phone.as_deref().unwrap_or(UNKNOWN),
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("{ORDER_SELECT} WHERE o.id = ?1"),
                params![id],
                order_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an order by ID.
pub async fn get_order(db: &Database, id: OrderId) -> Result<Option<Order>, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{ORDER_SELECT} WHERE o.id = ?1"),
                params![id],
                order_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a guarded transition as one conditional `UPDATE`.
///
/// Returns the number of affected rows: 1 when the transition won, 0 when the
/// order was not in the expected status (or not held by the guarded driver).
pub async fn transition_order(
    db: &Database,
    id: OrderId,
    transition: OrderTransition,
) -> Result<usize, IntercabError> {
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("UPDATE orders SET status = ?");
            let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(transition.target().to_string())];

            match transition.driver_effect() {
                DriverEffect::Keep => {}
                DriverEffect::Set(driver_id) => {
                    sql.push_str(", driver_id = ?");
                    values.push(Box::new(driver_id));
                }
                DriverEffect::Clear => sql.push_str(", driver_id = NULL"),
            }
            if let Some(stamp) = transition.stamp() {
                sql.push_str(&format!(", {} = ?", stamp.column()));
                values.push(Box::new(Utc::now()));
            }

            sql.push_str(" WHERE id = ? AND status = ?");
            values.push(Box::new(id));
            values.push(Box::new(transition.expected().to_string()));
            if let Some(driver_id) = transition.driver_guard() {
                sql.push_str(" AND driver_id = ?");
                values.push(Box::new(driver_id));
            }

            conn.execute(&sql, params_from_iter(values.iter()))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

async fn select_orders(
    db: &Database,
    clause: &'static str,
    args: Vec<Box<dyn ToSql + Send>>,
) -> Result<Vec<Order>, IntercabError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("{ORDER_SELECT} {clause}"))?;
            let rows = stmt.query_map(params_from_iter(args.iter()), order_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Orders open for claiming, soonest pickup first.
pub async fn active_orders(db: &Database) -> Result<Vec<Order>, IntercabError> {
    select_orders(
        db,
        "WHERE o.status = 'active' ORDER BY o.pickup_time IS NULL DESC, o.pickup_time, o.id",
        Vec::new(),
    )
    .await
}

/// Orders awaiting operator approval, oldest first.
pub async fn pending_orders(db: &Database) -> Result<Vec<Order>, IntercabError> {
    select_orders(db, "WHERE o.status = 'pending' ORDER BY o.created_at, o.id", Vec::new()).await
}

/// A rider's orders, newest first.
pub async fn orders_by_rider(db: &Database, rider_id: UserId) -> Result<Vec<Order>, IntercabError> {
    select_orders(
        db,
        "WHERE o.rider_id = ? ORDER BY o.created_at DESC, o.id DESC",
        vec![Box::new(rider_id)],
    )
    .await
}

/// A driver's orders, newest first.
pub async fn orders_by_driver(
    db: &Database,
    driver_id: UserId,
) -> Result<Vec<Order>, IntercabError> {
    select_orders(
        db,
        "WHERE o.driver_id = ? ORDER BY o.created_at DESC, o.id DESC",
        vec![Box::new(driver_id)],
    )
    .await
}

/// Active orders with a pickup time in `[start, end)`.
pub async fn active_orders_between(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Order>, IntercabError> {
    select_orders(
        db,
        "WHERE o.status = 'active' AND o.pickup_time >= ? AND o.pickup_time < ? \
         ORDER BY o.pickup_time, o.id",
        vec![Box::new(start), Box::new(end)],
    )
    .await
}

/// Service-wide counters. `today` counts orders created at or after `since`.
pub async fn order_stats(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<OrderStats, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status IN ('active', 'taken')), 0),
                        COALESCE(SUM(created_at >= ?1), 0),
                        COALESCE(SUM(status IN ('cancelled', 'cancelled_by_admin')), 0)
                 FROM orders",
                params![since],
                |row| {
                    let total: i64 = row.get(0)?;
                    let cancelled: i64 = row.get(3)?;
                    let cancel_rate = if total == 0 {
                        0.0
                    } else {
                        cancelled as f64 * 100.0 / total as f64
                    };
                    Ok(OrderStats {
                        total,
                        in_flight: row.get(1)?,
                        today: row.get(2)?,
                        cancel_rate,
                    })
                },
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-rider totals shown in the rider's order list header.
pub async fn rider_stats(db: &Database, rider_id: UserId) -> Result<RiderStats, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'completed'), 0),
                        COALESCE(SUM(status IN ('cancelled', 'cancelled_by_admin')), 0)
                 FROM orders WHERE rider_id = ?1",
                params![rider_id],
                |row| {
                    Ok(RiderStats {
                        total: row.get(0)?,
                        completed: row.get(1)?,
                        cancelled: row.get(2)?,
                    })
                },
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
