// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the intercab ride dispatch engine.
//!
//! This crate provides the domain types, the order lifecycle table, the tagged
//! button actions, the error taxonomy, and the adapter traits that the store,
//! the channel adapters, and the dispatch engine are written against.

pub mod action;
pub mod error;
pub mod lifecycle;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use action::Action;
pub use error::{ErrorKind, IntercabError};
pub use lifecycle::OrderTransition;
pub use types::{
    AdapterType, HealthStatus, MessageId, Order, OrderId, OrderStatus, PlatformId, Role, User,
    UserId, UserStatus,
};

pub use traits::{ChannelAdapter, Notifier, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn error_kinds_follow_taxonomy() {
        let contention = IntercabError::Contention {
            order_id: 1,
            expected: OrderStatus::Active,
        };
        assert_eq!(contention.kind(), ErrorKind::Contention);
        assert!(contention.is_contention());

        assert_eq!(
            IntercabError::MissingPrerequisite("origin".into()).kind(),
            ErrorKind::MissingPrerequisite
        );
        assert_eq!(
            IntercabError::not_found("order", 5).kind(),
            ErrorKind::MissingPrerequisite
        );
        assert_eq!(
            IntercabError::Delivery {
                role: Role::Driver,
                message: "blocked by user".into(),
            }
            .kind(),
            ErrorKind::Delivery
        );
        assert_eq!(
            IntercabError::Storage {
                source: Box::new(std::io::Error::other("disk")),
            }
            .kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn contention_message_names_the_order() {
        let err = IntercabError::Contention {
            order_id: 100,
            expected: OrderStatus::WaitConfirm,
        };
        assert_eq!(err.to_string(), "order #100 is no longer wait_confirm");
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(OrderStatus::CancelledByAdmin.to_string(), "cancelled_by_admin");
        assert_eq!(OrderStatus::from_str("wait_confirm"), Ok(OrderStatus::WaitConfirm));
        assert_eq!(UserStatus::PendingReview.to_string(), "pending_review");
        assert_eq!(Role::from_str("operator"), Ok(Role::Operator));
    }

    #[test]
    fn status_serialization_matches_display() {
        let json = serde_json::to_string(&OrderStatus::InProgress).expect("should serialize");
        assert_eq!(json, "\"in_progress\"");
        let parsed: OrderStatus = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, OrderStatus::InProgress);
    }

    #[test]
    fn driver_bearing_statuses() {
        assert!(OrderStatus::WaitConfirm.requires_driver());
        assert!(OrderStatus::InProgress.requires_driver());
        assert!(!OrderStatus::Active.requires_driver());
        assert!(!OrderStatus::Completed.requires_driver());
    }

    #[test]
    fn display_name_prefers_username() {
        let mut user = User {
            id: 1,
            platform_id: 10,
            username: Some("anna".into()),
            full_name: "Anna K".into(),
            phone: None,
            role: Role::Rider,
            status: UserStatus::Active,
            created_at: chrono::Utc::now(),
        };
        assert_eq!(user.display_name(), "@anna");
        user.username = None;
        assert_eq!(user.display_name(), "Anna K");
        assert_eq!(user.phone_or_unknown(), types::UNKNOWN);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_notifier<T: Notifier>() {}
    }
}
