// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fare class queries and driver tariff assignments.

use intercab_core::types::{TariffId, UserId};
use intercab_core::IntercabError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::Database;
use crate::models::{Tariff, TariffAssignment};

fn tariff_from_row(row: &Row<'_>) -> rusqlite::Result<Tariff> {
    Ok(Tariff {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
    })
}

/// Active fare classes, by name.
pub async fn list_tariffs(db: &Database) -> Result<Vec<Tariff>, IntercabError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, is_active FROM tariffs WHERE is_active = 1 ORDER BY name",
            )?;
            let rows = stmt.query_map([], tariff_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_tariff(db: &Database, id: TariffId) -> Result<Option<Tariff>, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, is_active FROM tariffs WHERE id = ?1",
                params![id],
                tariff_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn create_tariff(db: &Database, name: &str) -> Result<Tariff, IntercabError> {
    let name = name.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("INSERT INTO tariffs (name) VALUES (?1)", params![name])?;
            Ok(Tariff {
                id: conn.last_insert_rowid(),
                name,
                is_active: true,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a fare class together with every driver's opt-in to it.
pub async fn delete_tariff(db: &Database, id: TariffId) -> Result<(), IntercabError> {
    let deleted = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM tariffs WHERE id = ?1", params![id]))
        .await
        .map_err(crate::database::map_tr_err)?;
    if deleted == 0 {
        return Err(IntercabError::not_found("tariff", id));
    }
    Ok(())
}

/// Fare classes a driver has opted into.
pub async fn driver_tariffs(db: &Database, driver_id: UserId) -> Result<Vec<TariffId>, IntercabError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tariff_id FROM driver_tariffs WHERE driver_id = ?1 ORDER BY tariff_id",
            )?;
            let rows = stmt.query_map(params![driver_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip one fare class for a driver. Returns `true` when it is now enabled.
pub async fn toggle_driver_tariff(
    db: &Database,
    driver_id: UserId,
    tariff_id: TariffId,
) -> Result<bool, IntercabError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM driver_tariffs WHERE driver_id = ?1 AND tariff_id = ?2",
                params![driver_id, tariff_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO driver_tariffs (driver_id, tariff_id) VALUES (?1, ?2)",
                    params![driver_id, tariff_id],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every driver's fare class opt-ins.
pub async fn tariff_assignments(db: &Database) -> Result<Vec<TariffAssignment>, IntercabError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT driver_id, tariff_id FROM driver_tariffs")?;
            let rows = stmt.query_map([], |row| {
                Ok(TariffAssignment {
                    driver_id: row.get(0)?,
                    tariff_id: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
