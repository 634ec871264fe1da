// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation wizard state.
//!
//! Sessions live only in memory, one table per role loop, keyed by
//! `(role, platform id)`. A restart empties the table; every wizard step reads
//! the values recorded by earlier steps through the `require_*` accessors on
//! [`OrderDraft`], which turn an absent value into
//! [`IntercabError::MissingPrerequisite`] instead of a zero-valued reference.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use intercab_core::error::IntercabError;
use intercab_core::types::{LocationId, NewOrder, PlatformId, Role, TariffId, User, UserId};

use crate::debounce::Debouncer;

/// Wizard states for all three roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardState {
    #[default]
    Idle,

    // Rider order composition.
    AwaitingOrigin,
    AwaitingDestination,
    AwaitingTariff,
    AwaitingDate,
    AwaitingHour,
    AwaitingPassengers,
    AwaitingPrice,
    AwaitingConfirmation,

    // Onboarding, shared by riders and drivers.
    AwaitingContact,

    // Driver vehicle registration and self-service editing.
    AwaitingCarBrand,
    AwaitingCarModel,
    AwaitingLicensePlate,
    EditingRoutes,
    EditingTariffs,

    // Operator credential challenge and registry edits.
    AwaitingLogin,
    AwaitingPassword,
    AwaitingLocationName,
    AwaitingTariffName,
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WizardState::Idle => "idle",
            WizardState::AwaitingOrigin => "awaiting_origin",
            WizardState::AwaitingDestination => "awaiting_destination",
            WizardState::AwaitingTariff => "awaiting_tariff",
            WizardState::AwaitingDate => "awaiting_date",
            WizardState::AwaitingHour => "awaiting_hour",
            WizardState::AwaitingPassengers => "awaiting_passengers",
            WizardState::AwaitingPrice => "awaiting_price",
            WizardState::AwaitingConfirmation => "awaiting_confirmation",
            WizardState::AwaitingContact => "awaiting_contact",
            WizardState::AwaitingCarBrand => "awaiting_car_brand",
            WizardState::AwaitingCarModel => "awaiting_car_model",
            WizardState::AwaitingLicensePlate => "awaiting_license_plate",
            WizardState::EditingRoutes => "editing_routes",
            WizardState::EditingTariffs => "editing_tariffs",
            WizardState::AwaitingLogin => "awaiting_login",
            WizardState::AwaitingPassword => "awaiting_password",
            WizardState::AwaitingLocationName => "awaiting_location_name",
            WizardState::AwaitingTariffName => "awaiting_tariff_name",
        };
        f.write_str(name)
    }
}

/// An order being composed, step by step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderDraft {
    pub origin_id: Option<LocationId>,
    pub destination_id: Option<LocationId>,
    pub tariff_id: Option<TariffId>,
    pub date: Option<NaiveDate>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub passengers: Option<u32>,
    pub price: Option<i64>,
}

fn missing(what: &str) -> IntercabError {
    IntercabError::MissingPrerequisite(what.to_string())
}

impl OrderDraft {
    pub fn require_origin(&self) -> Result<LocationId, IntercabError> {
        self.origin_id.ok_or_else(|| missing("origin"))
    }

    pub fn require_corridor(&self) -> Result<(LocationId, LocationId), IntercabError> {
        let origin = self.require_origin()?;
        let destination = self.destination_id.ok_or_else(|| missing("destination"))?;
        Ok((origin, destination))
    }

    pub fn require_tariff(&self) -> Result<TariffId, IntercabError> {
        self.require_corridor()?;
        self.tariff_id.ok_or_else(|| missing("fare class"))
    }

    pub fn require_date(&self) -> Result<NaiveDate, IntercabError> {
        self.require_tariff()?;
        self.date.ok_or_else(|| missing("pickup date"))
    }

    pub fn require_pickup(&self) -> Result<DateTime<Utc>, IntercabError> {
        self.require_date()?;
        self.pickup_time.ok_or_else(|| missing("pickup time"))
    }

    pub fn require_passengers(&self) -> Result<u32, IntercabError> {
        self.require_pickup()?;
        self.passengers.ok_or_else(|| missing("passenger count"))
    }

    /// Builds the store input once every step has been recorded.
    pub fn to_new_order(&self, rider: &User, currency: &str) -> Result<NewOrder, IntercabError> {
        let (origin_id, destination_id) = self.require_corridor()?;
        let tariff_id = self.require_tariff()?;
        let pickup_time = self.require_pickup()?;
        let passengers = self.require_passengers()?;
        let price = self.price.ok_or_else(|| missing("price"))?;
        Ok(NewOrder {
            rider_id: rider.id,
            origin_id,
            destination_id,
            tariff_id,
            price,
            currency: currency.to_string(),
            passengers,
            pickup_time: Some(pickup_time),
            rider_username: rider.username.clone(),
            rider_phone: rider.phone.clone(),
        })
    }
}

/// One conversation's state.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub state: WizardState,
    pub draft: OrderDraft,
    /// Transient text for multi-field composition (vehicle details, login).
    pub scratch: String,
    /// Origin picked while adding a driver route.
    pub route_origin: Option<LocationId>,
    pub debounce: Debouncer,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: WizardState::Idle,
            draft: OrderDraft::default(),
            scratch: String::new(),
            route_origin: None,
            debounce: Debouncer::default(),
        }
    }

    /// Returns to idle, dropping all wizard data. Debounce timestamps survive.
    pub fn reset(&mut self) {
        self.state = WizardState::Idle;
        self.draft = OrderDraft::default();
        self.scratch.clear();
        self.route_origin = None;
    }
}

/// In-memory session table owned by one role loop.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<(Role, PlatformId), Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: Role, platform_id: PlatformId) -> Option<&Session> {
        self.sessions.get(&(role, platform_id))
    }

    pub fn get_mut(&mut self, role: Role, platform_id: PlatformId) -> Option<&mut Session> {
        self.sessions.get_mut(&(role, platform_id))
    }

    /// Returns the existing session, or opens an empty idle one.
    ///
    /// An empty session is what a user sees after a restart; the draft
    /// accessors report whatever an in-flight wizard step is missing.
    pub fn open(&mut self, role: Role, platform_id: PlatformId, user_id: UserId) -> &mut Session {
        let session = self
            .sessions
            .entry((role, platform_id))
            .or_insert_with(|| {
                tracing::debug!(%role, platform_id, "opening new session");
                Session::new(user_id)
            });
        // A role switch can re-key the same platform id to a new user row.
        if session.user_id != user_id {
            *session = Session::new(user_id);
        }
        session
    }

    pub fn remove(&mut self, role: Role, platform_id: PlatformId) -> Option<Session> {
        self.sessions.remove(&(role, platform_id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions currently inside a wizard.
    pub fn in_flight(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state != WizardState::Idle)
            .count()
    }
}
