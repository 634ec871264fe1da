// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver vehicle profiles.

use intercab_core::types::UserId;
use intercab_core::IntercabError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::DriverProfile;

/// Insert or replace a driver's vehicle details.
pub async fn save_driver_profile(
    db: &Database,
    profile: &DriverProfile,
) -> Result<(), IntercabError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO driver_profiles (user_id, car_brand, car_model, license_plate)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE
                 SET car_brand = excluded.car_brand,
                     car_model = excluded.car_model,
                     license_plate = excluded.license_plate",
                params![
                    profile.user_id,
                    profile.car_brand,
                    profile.car_model,
                    profile.license_plate,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_driver_profile(
    db: &Database,
    user_id: UserId,
) -> Result<Option<DriverProfile>, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, car_brand, car_model, license_plate
                 FROM driver_profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(DriverProfile {
                        user_id: row.get(0)?,
                        car_brand: row.get(1)?,
                        car_model: row.get(2)?,
                        license_plate: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{seed_user, setup_db};
    use intercab_core::types::Role;

    #[tokio::test]
    async fn save_overwrites_previous_profile() {
        let (db, _dir) = setup_db().await;
        let driver = seed_user(&db, 1, Role::Driver).await;
        assert!(get_driver_profile(&db, driver).await.unwrap().is_none());

        let mut profile = DriverProfile {
            user_id: driver,
            car_brand: "Kia".into(),
            car_model: "Rio".into(),
            license_plate: "A123BC".into(),
        };
        save_driver_profile(&db, &profile).await.unwrap();
        profile.license_plate = "B456CD".into();
        save_driver_profile(&db, &profile).await.unwrap();

        assert_eq!(get_driver_profile(&db, driver).await.unwrap(), Some(profile));
        db.close().await.unwrap();
    }
}
