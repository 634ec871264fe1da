// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver corridor assignments.

use intercab_core::types::{LocationId, UserId};
use intercab_core::IntercabError;
use rusqlite::{params, Row};

use crate::database::Database;
use crate::models::RouteAssignment;

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<RouteAssignment> {
    Ok(RouteAssignment {
        driver_id: row.get(0)?,
        origin_id: row.get(1)?,
        destination_id: row.get(2)?,
    })
}

/// Add a corridor for a driver. Re-adding an existing corridor is a no-op.
pub async fn add_route(
    db: &Database,
    driver_id: UserId,
    origin_id: LocationId,
    destination_id: LocationId,
) -> Result<(), IntercabError> {
    if origin_id == destination_id {
        return Err(IntercabError::Validation(
            "a corridor needs two different endpoints".to_string(),
        ));
    }
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO driver_routes (driver_id, origin_id, destination_id)
                 VALUES (?1, ?2, ?3)",
                params![driver_id, origin_id, destination_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn remove_route(
    db: &Database,
    driver_id: UserId,
    origin_id: LocationId,
    destination_id: LocationId,
) -> Result<(), IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM driver_routes
                 WHERE driver_id = ?1 AND origin_id = ?2 AND destination_id = ?3",
                params![driver_id, origin_id, destination_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn driver_routes(
    db: &Database,
    driver_id: UserId,
) -> Result<Vec<RouteAssignment>, IntercabError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT driver_id, origin_id, destination_id FROM driver_routes
                 WHERE driver_id = ?1 ORDER BY origin_id, destination_id",
            )?;
            let rows = stmt.query_map(params![driver_id], route_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove every corridor of a driver, returning them to the default-open policy.
pub async fn clear_routes(db: &Database, driver_id: UserId) -> Result<(), IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM driver_routes WHERE driver_id = ?1", params![driver_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every driver's corridor assignments.
pub async fn route_assignments(db: &Database) -> Result<Vec<RouteAssignment>, IntercabError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT driver_id, origin_id, destination_id FROM driver_routes")?;
            let rows = stmt.query_map([], route_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
