// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the dispatch engine, and the channel adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::action::Action;

/// Internal order identifier.
pub type OrderId = i64;
/// Internal user identifier (not the messaging platform id).
pub type UserId = i64;
/// Corridor endpoint identifier.
pub type LocationId = i64;
/// Fare class identifier.
pub type TariffId = i64;
/// Messaging platform user/chat identifier.
pub type PlatformId = i64;

/// Placeholder stored in contact snapshots and joined names when the data is absent.
pub const UNKNOWN: &str = "unknown";

/// Unique identifier for a message sent through a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
}

/// The three actor roles. Each runs its own bot process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
    Operator,
}

/// Account status of a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Registered, contact not yet shared.
    Pending,
    Active,
    Blocked,
    /// Driver finished onboarding and awaits operator review.
    PendingReview,
    Rejected,
}

/// Order lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Active,
    WaitConfirm,
    Taken,
    OnWay,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
    CancelledByAdmin,
}

impl OrderStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::CancelledByAdmin
        )
    }

    /// Statuses in which the order must reference a driver.
    pub fn requires_driver(self) -> bool {
        matches!(
            self,
            OrderStatus::WaitConfirm
                | OrderStatus::Taken
                | OrderStatus::OnWay
                | OrderStatus::Arrived
                | OrderStatus::InProgress
        )
    }

    /// Statuses from which the rider may cancel.
    pub fn is_cancellable_by_rider(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Active | OrderStatus::WaitConfirm | OrderStatus::Taken
        )
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub rider_id: UserId,
    pub driver_id: Option<UserId>,
    pub origin_id: LocationId,
    pub destination_id: LocationId,
    pub tariff_id: TariffId,
    pub price: i64,
    pub currency: String,
    pub passengers: u32,
    /// `None` means "as soon as possible".
    pub pickup_time: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub on_way_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Rider contact captured when the order was created.
    pub rider_username: String,
    pub rider_phone: String,
    pub origin_name: String,
    pub destination_name: String,
    pub tariff_name: String,
}

impl Order {
    /// The (origin, destination) corridor of this order.
    pub fn corridor(&self) -> (LocationId, LocationId) {
        (self.origin_id, self.destination_id)
    }
}

/// Input for creating an order. New orders always start as `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub rider_id: UserId,
    pub origin_id: LocationId,
    pub destination_id: LocationId,
    pub tariff_id: TariffId,
    pub price: i64,
    pub currency: String,
    pub passengers: u32,
    pub pickup_time: Option<DateTime<Utc>>,
    pub rider_username: Option<String>,
    pub rider_phone: Option<String>,
}

/// A registered user of any role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub platform_id: PlatformId,
    pub username: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `@username` when available, otherwise the full name.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(u) if !u.is_empty() => format!("@{u}"),
            _ => self.full_name.clone(),
        }
    }

    pub fn phone_or_unknown(&self) -> &str {
        self.phone.as_deref().unwrap_or(UNKNOWN)
    }
}

/// A named corridor endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

/// A fare class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tariff {
    pub id: TariffId,
    pub name: String,
    pub is_active: bool,
}

/// Vehicle details captured during driver onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub user_id: UserId,
    pub car_brand: String,
    pub car_model: String,
    pub license_plate: String,
}

/// A corridor a driver services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteAssignment {
    pub driver_id: UserId,
    pub origin_id: LocationId,
    pub destination_id: LocationId,
}

/// A fare class a driver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TariffAssignment {
    pub driver_id: UserId,
    pub tariff_id: TariffId,
}

/// Service-wide order counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OrderStats {
    pub total: i64,
    /// Orders currently `active` or `taken`.
    pub in_flight: i64,
    /// Orders created since the supplied cutoff.
    pub today: i64,
    /// Percentage of orders that ended cancelled (either kind). 0 when there are none.
    pub cancel_rate: f64,
}

/// Per-rider order counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RiderStats {
    pub total: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// Registered user counts by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UserCounts {
    pub total: i64,
    pub riders: i64,
    pub drivers: i64,
    pub operators: i64,
}

// --- Channel types ---

/// Who sent an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub platform_id: PlatformId,
    pub username: Option<String>,
    pub full_name: String,
}

/// Content of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Free text, including commands such as `/start` and menu button labels.
    Text(String),
    /// An inline button press carrying an opaque payload.
    Button {
        payload: String,
        /// The message the button was attached to, if still accessible.
        message_id: Option<String>,
        /// Platform handle used to acknowledge the press.
        ack_id: Option<String>,
    },
    /// A shared phone contact. `owner` is the platform id the contact belongs to.
    Contact {
        phone: String,
        owner: Option<PlatformId>,
    },
    /// A structured payload posted by the companion mini app.
    WebApp(String),
}

/// An inbound event received from a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: PlatformId,
    pub sender: Sender,
    pub content: MessageContent,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// An inline button bound to a typed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Keyboard attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached to the message itself.
    Inline(Vec<Vec<Button>>),
    /// Persistent reply-keyboard menu of text labels.
    Menu(Vec<Vec<String>>),
    /// A single button that asks the platform to share the user's phone.
    RequestContact(String),
    /// Remove any persistent menu.
    Remove,
}

/// Message content without a recipient, as handed to the notification router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Notice {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Addresses this notice to a chat.
    pub fn to(self, chat_id: PlatformId) -> OutboundMessage {
        OutboundMessage {
            chat_id,
            text: self.text,
            keyboard: self.keyboard,
        }
    }
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: PlatformId,
    /// HTML-formatted text.
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    pub supports_inline_buttons: bool,
    pub supports_delete: bool,
    pub max_message_length: Option<usize>,
}
