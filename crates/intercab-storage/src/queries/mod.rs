// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the order store and the route/tariff registry.

pub mod locations;
pub mod orders;
pub mod profiles;
pub mod routes;
pub mod tariffs;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use intercab_core::types::{LocationId, PlatformId, Role, TariffId, UserId};
    use tempfile::TempDir;

    use crate::database::Database;

    pub async fn setup_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub async fn seed_user(db: &Database, platform_id: PlatformId, role: Role) -> UserId {
        super::users::get_or_create_user(db, platform_id, None, &format!("user {platform_id}"), role)
            .await
            .unwrap()
            .id
    }

    /// Locations "A" and "B" and the "Economy" fare class.
    pub async fn seed_corridor(db: &Database) -> (LocationId, LocationId, TariffId) {
        let a = super::locations::create_location(db, "A").await.unwrap();
        let b = super::locations::create_location(db, "B").await.unwrap();
        let economy = super::tariffs::create_tariff(db, "Economy").await.unwrap();
        (a.id, b.id, economy.id)
    }
}
