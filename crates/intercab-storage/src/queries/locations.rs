// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Corridor endpoint queries.

use intercab_core::types::LocationId;
use intercab_core::IntercabError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::Location;

/// All locations, by name.
pub async fn list_locations(db: &Database) -> Result<Vec<Location>, IntercabError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM locations ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok(Location {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_location(
    db: &Database,
    id: LocationId,
) -> Result<Option<Location>, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name FROM locations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Location {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Create a location. Names are unique; a duplicate is a storage error.
pub async fn create_location(db: &Database, name: &str) -> Result<Location, IntercabError> {
    let name = name.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("INSERT INTO locations (name) VALUES (?1)", params![name])?;
            Ok(Location {
                id: conn.last_insert_rowid(),
                name,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a location. Driver route assignments through it are removed with it;
/// orders keep their ids and read back with an `unknown` name.
pub async fn delete_location(db: &Database, id: LocationId) -> Result<(), IntercabError> {
    let deleted = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM locations WHERE id = ?1", params![id]))
        .await
        .map_err(crate::database::map_tr_err)?;
    if deleted == 0 {
        return Err(IntercabError::not_found("location", id));
    }
    Ok(())
}
