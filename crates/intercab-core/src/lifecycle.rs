// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The order lifecycle as a closed set of guarded transitions.
//!
//! Each [`OrderTransition`] names exactly one expected current status. The
//! store turns it into a single `UPDATE ... WHERE id = ? AND status = ?` and
//! reports zero affected rows as [`IntercabError::Contention`]. Nothing else
//! may change an order's status.

use crate::error::IntercabError;
use crate::types::{OrderStatus, UserId};

/// What a transition does to the order's driver reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEffect {
    Keep,
    Set(UserId),
    Clear,
}

/// Trip timestamp column stamped by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    OnWayAt,
    ArrivedAt,
    StartedAt,
    CompletedAt,
    CancelledAt,
}

impl Stamp {
    pub fn column(self) -> &'static str {
        match self {
            Stamp::OnWayAt => "on_way_at",
            Stamp::ArrivedAt => "arrived_at",
            Stamp::StartedAt => "started_at",
            Stamp::CompletedAt => "completed_at",
            Stamp::CancelledAt => "cancelled_at",
        }
    }
}

/// A guarded status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTransition {
    /// Operator approves a new order (also used by the payment webhook).
    Publish,
    /// Operator rejects a new order.
    RejectByOperator,
    /// A driver claims an active order.
    Claim { driver_id: UserId },
    /// Operator finalizes a driver match.
    ConfirmMatch,
    /// Operator rejects a driver match; the order goes back to the pool.
    RejectMatch,
    /// The assigned driver hands the order back to the pool.
    Release { driver_id: UserId },
    /// Rider cancels from the status they last observed.
    Cancel { from: OrderStatus },
    DepartToPickup { driver_id: UserId },
    ArriveAtPickup { driver_id: UserId },
    StartTrip { driver_id: UserId },
    CompleteTrip { driver_id: UserId },
}

impl OrderTransition {
    /// The only status this transition may leave.
    pub fn expected(&self) -> OrderStatus {
        match self {
            OrderTransition::Publish | OrderTransition::RejectByOperator => OrderStatus::Pending,
            OrderTransition::Claim { .. } => OrderStatus::Active,
            OrderTransition::ConfirmMatch | OrderTransition::RejectMatch => {
                OrderStatus::WaitConfirm
            }
            OrderTransition::Release { .. } | OrderTransition::DepartToPickup { .. } => {
                OrderStatus::Taken
            }
            OrderTransition::Cancel { from } => *from,
            OrderTransition::ArriveAtPickup { .. } => OrderStatus::OnWay,
            OrderTransition::StartTrip { .. } => OrderStatus::Arrived,
            OrderTransition::CompleteTrip { .. } => OrderStatus::InProgress,
        }
    }

    /// The status written on success.
    pub fn target(&self) -> OrderStatus {
        match self {
            OrderTransition::Publish
            | OrderTransition::RejectMatch
            | OrderTransition::Release { .. } => OrderStatus::Active,
            OrderTransition::RejectByOperator => OrderStatus::CancelledByAdmin,
            OrderTransition::Claim { .. } => OrderStatus::WaitConfirm,
            OrderTransition::ConfirmMatch => OrderStatus::Taken,
            OrderTransition::Cancel { .. } => OrderStatus::Cancelled,
            OrderTransition::DepartToPickup { .. } => OrderStatus::OnWay,
            OrderTransition::ArriveAtPickup { .. } => OrderStatus::Arrived,
            OrderTransition::StartTrip { .. } => OrderStatus::InProgress,
            OrderTransition::CompleteTrip { .. } => OrderStatus::Completed,
        }
    }

    pub fn driver_effect(&self) -> DriverEffect {
        match self {
            OrderTransition::Claim { driver_id } => DriverEffect::Set(*driver_id),
            OrderTransition::RejectMatch | OrderTransition::Release { .. } => DriverEffect::Clear,
            _ => DriverEffect::Keep,
        }
    }

    /// Driver-initiated transitions additionally require the caller to be the
    /// assigned driver.
    pub fn driver_guard(&self) -> Option<UserId> {
        match self {
            OrderTransition::Release { driver_id }
            | OrderTransition::DepartToPickup { driver_id }
            | OrderTransition::ArriveAtPickup { driver_id }
            | OrderTransition::StartTrip { driver_id }
            | OrderTransition::CompleteTrip { driver_id } => Some(*driver_id),
            _ => None,
        }
    }

    pub fn stamp(&self) -> Option<Stamp> {
        match self {
            OrderTransition::DepartToPickup { .. } => Some(Stamp::OnWayAt),
            OrderTransition::ArriveAtPickup { .. } => Some(Stamp::ArrivedAt),
            OrderTransition::StartTrip { .. } => Some(Stamp::StartedAt),
            OrderTransition::CompleteTrip { .. } => Some(Stamp::CompletedAt),
            OrderTransition::Cancel { .. } => Some(Stamp::CancelledAt),
            _ => None,
        }
    }

    /// Rejects transitions that can never succeed regardless of store state.
    pub fn validate(&self) -> Result<(), IntercabError> {
        if let OrderTransition::Cancel { from } = self
            && !from.is_cancellable_by_rider()
        {
            return Err(IntercabError::Validation(format!(
                "an order that is {from} cannot be cancelled"
            )));
        }
        Ok(())
    }

    /// The next driver-reported trip step from `status`, if any.
    pub fn next_trip_step(status: OrderStatus, driver_id: UserId) -> Option<OrderTransition> {
        match status {
            OrderStatus::Taken => Some(OrderTransition::DepartToPickup { driver_id }),
            OrderStatus::OnWay => Some(OrderTransition::ArriveAtPickup { driver_id }),
            OrderStatus::Arrived => Some(OrderTransition::StartTrip { driver_id }),
            OrderStatus::InProgress => Some(OrderTransition::CompleteTrip { driver_id }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVER: UserId = 42;

    fn all_transitions() -> Vec<OrderTransition> {
        let mut all = vec![
            OrderTransition::Publish,
            OrderTransition::RejectByOperator,
            OrderTransition::Claim { driver_id: DRIVER },
            OrderTransition::ConfirmMatch,
            OrderTransition::RejectMatch,
            OrderTransition::Release { driver_id: DRIVER },
            OrderTransition::DepartToPickup { driver_id: DRIVER },
            OrderTransition::ArriveAtPickup { driver_id: DRIVER },
            OrderTransition::StartTrip { driver_id: DRIVER },
            OrderTransition::CompleteTrip { driver_id: DRIVER },
        ];
        for from in [
            OrderStatus::Pending,
            OrderStatus::Active,
            OrderStatus::WaitConfirm,
            OrderStatus::Taken,
        ] {
            all.push(OrderTransition::Cancel { from });
        }
        all
    }

    #[test]
    fn driver_reference_matches_target_status() {
        // A transition into a driver-bearing status must set or keep a driver,
        // and a transition back to the pool must clear it.
        for t in all_transitions() {
            let target = t.target();
            match t.driver_effect() {
                DriverEffect::Set(_) => assert!(target.requires_driver(), "{t:?}"),
                DriverEffect::Clear => assert_eq!(target, OrderStatus::Active, "{t:?}"),
                DriverEffect::Keep => {
                    if target.requires_driver() {
                        assert!(t.expected().requires_driver(), "{t:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn trip_progress_never_skips_a_step() {
        let mut status = OrderStatus::Taken;
        let mut visited = vec![status];
        while let Some(step) = OrderTransition::next_trip_step(status, DRIVER) {
            assert_eq!(step.expected(), status);
            status = step.target();
            visited.push(status);
        }
        assert_eq!(
            visited,
            vec![
                OrderStatus::Taken,
                OrderStatus::OnWay,
                OrderStatus::Arrived,
                OrderStatus::InProgress,
                OrderStatus::Completed,
            ]
        );
    }

    #[test]
    fn no_transition_leaves_a_terminal_status() {
        for t in all_transitions() {
            assert!(!t.expected().is_terminal(), "{t:?}");
        }
    }

    #[test]
    fn rollbacks_return_to_pool() {
        assert_eq!(OrderTransition::RejectMatch.target(), OrderStatus::Active);
        assert_eq!(
            OrderTransition::Release { driver_id: DRIVER }.target(),
            OrderStatus::Active
        );
    }

    #[test]
    fn cancel_from_trip_in_progress_is_invalid() {
        assert!(OrderTransition::Cancel {
            from: OrderStatus::OnWay
        }
        .validate()
        .is_err());
        assert!(OrderTransition::Cancel {
            from: OrderStatus::Taken
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn only_driver_actions_carry_a_driver_guard() {
        assert_eq!(OrderTransition::ConfirmMatch.driver_guard(), None);
        assert_eq!(
            OrderTransition::Claim { driver_id: DRIVER }.driver_guard(),
            None
        );
        assert_eq!(
            OrderTransition::StartTrip { driver_id: DRIVER }.driver_guard(),
            Some(DRIVER)
        );
    }
}
