// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tagged button actions.
//!
//! Inline buttons carry a short opaque payload. The payload is produced by
//! [`Action`]'s `Display` impl and parsed back exactly once, at the transport
//! boundary, via [`FromStr`]. Handlers only ever match on the enum.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{LocationId, OrderId, TariffId, UserId};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Every action an inline button can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Rider order wizard.
    PickOrigin(LocationId),
    PickDestination(LocationId),
    PickTariff(TariffId),
    PickDate(NaiveDate),
    PickHour(u32),
    PickPassengers(u32),
    ConfirmOrder,
    AbortOrder,
    CancelOrder(OrderId),

    // Driver.
    Claim(OrderId),
    Release(OrderId),
    DepartToPickup(OrderId),
    ArriveAtPickup(OrderId),
    StartTrip(OrderId),
    CompleteTrip(OrderId),
    AddRoute,
    RouteFrom(LocationId),
    RouteTo(LocationId),
    ClearRoutes,
    RoutesDone,
    ToggleTariff(TariffId),
    TariffsDone,
    SearchDate(NaiveDate),

    // Operator.
    ApproveOrder(OrderId),
    RejectOrder(OrderId),
    ApproveMatch(OrderId),
    RejectMatch(OrderId),
    ApproveDriver(UserId),
    RejectDriver(UserId),

    /// Dismiss the message the button is attached to.
    CloseMessage,
}

/// A button payload that does not correspond to any [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized action payload `{0}`")]
pub struct ActionParseError(pub String);

impl Action {
    /// Whether this action belongs to the rider order wizard and therefore
    /// depends on state recorded by earlier wizard steps.
    pub fn is_order_wizard_step(&self) -> bool {
        matches!(
            self,
            Action::PickDestination(_)
                | Action::PickTariff(_)
                | Action::PickDate(_)
                | Action::PickHour(_)
                | Action::PickPassengers(_)
                | Action::ConfirmOrder
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PickOrigin(id) => write!(f, "cl_f_{id}"),
            Action::PickDestination(id) => write!(f, "cl_t_{id}"),
            Action::PickTariff(id) => write!(f, "tf_{id}"),
            Action::PickDate(d) => write!(f, "cal_{}", d.format(DATE_FORMAT)),
            Action::PickHour(h) => write!(f, "time_{h:02}"),
            Action::PickPassengers(n) => write!(f, "pass_{n}"),
            Action::ConfirmOrder => f.write_str("confirm_yes"),
            Action::AbortOrder => f.write_str("confirm_no"),
            Action::CancelOrder(id) => write!(f, "cancel_{id}"),
            Action::Claim(id) => write!(f, "take_{id}"),
            Action::Release(id) => write!(f, "return_order_{id}"),
            Action::DepartToPickup(id) => write!(f, "on_way_{id}"),
            Action::ArriveAtPickup(id) => write!(f, "arrived_{id}"),
            Action::StartTrip(id) => write!(f, "start_trip_{id}"),
            Action::CompleteTrip(id) => write!(f, "complete_{id}"),
            Action::AddRoute => f.write_str("add_route"),
            Action::RouteFrom(id) => write!(f, "dr_f_{id}"),
            Action::RouteTo(id) => write!(f, "dr_t_{id}"),
            Action::ClearRoutes => f.write_str("clear_routes"),
            Action::RoutesDone => f.write_str("routes_done"),
            Action::ToggleTariff(id) => write!(f, "tgl_{id}"),
            Action::TariffsDone => f.write_str("tf_done"),
            Action::SearchDate(d) => write!(f, "sc_cal_{}", d.format(DATE_FORMAT)),
            Action::ApproveOrder(id) => write!(f, "adm_approve_{id}"),
            Action::RejectOrder(id) => write!(f, "adm_reject_{id}"),
            Action::ApproveMatch(id) => write!(f, "approve_match_{id}"),
            Action::RejectMatch(id) => write!(f, "reject_match_{id}"),
            Action::ApproveDriver(id) => write!(f, "approve_driver_{id}"),
            Action::RejectDriver(id) => write!(f, "reject_driver_{id}"),
            Action::CloseMessage => f.write_str("close_msg"),
        }
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ActionParseError(s.to_string());

        let fixed = match s {
            "confirm_yes" => Some(Action::ConfirmOrder),
            "confirm_no" | "cl_cancel" => Some(Action::AbortOrder),
            "add_route" => Some(Action::AddRoute),
            "clear_routes" => Some(Action::ClearRoutes),
            "routes_done" => Some(Action::RoutesDone),
            "tf_done" => Some(Action::TariffsDone),
            "close_msg" => Some(Action::CloseMessage),
            _ => None,
        };
        if let Some(action) = fixed {
            return Ok(action);
        }

        let (tag, arg) = s.rsplit_once('_').ok_or_else(err)?;
        let id = || arg.parse::<i64>().map_err(|_| err());
        let small = || arg.parse::<u32>().map_err(|_| err());
        let date = || NaiveDate::parse_from_str(arg, DATE_FORMAT).map_err(|_| err());

        let action = match tag {
            "cl_f" => Action::PickOrigin(id()?),
            "cl_t" => Action::PickDestination(id()?),
            "tf" => Action::PickTariff(id()?),
            "cal" => Action::PickDate(date()?),
            "time" => Action::PickHour(small()?),
            "pass" => Action::PickPassengers(small()?),
            "cancel" => Action::CancelOrder(id()?),
            "take" => Action::Claim(id()?),
            "return_order" => Action::Release(id()?),
            "on_way" => Action::DepartToPickup(id()?),
            "arrived" => Action::ArriveAtPickup(id()?),
            "start_trip" => Action::StartTrip(id()?),
            "complete" => Action::CompleteTrip(id()?),
            "dr_f" => Action::RouteFrom(id()?),
            "dr_t" => Action::RouteTo(id()?),
            "tgl" => Action::ToggleTariff(id()?),
            "sc_cal" => Action::SearchDate(date()?),
            "adm_approve" => Action::ApproveOrder(id()?),
            "adm_reject" => Action::RejectOrder(id()?),
            "approve_match" => Action::ApproveMatch(id()?),
            "reject_match" => Action::RejectMatch(id()?),
            "approve_driver" => Action::ApproveDriver(id()?),
            "reject_driver" => Action::RejectDriver(id()?),
            _ => return Err(err()),
        };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_claim_payload() {
        assert_eq!("take_100".parse::<Action>(), Ok(Action::Claim(100)));
    }

    #[test]
    fn multi_word_tags_keep_their_prefix() {
        assert_eq!(
            "adm_approve_7".parse::<Action>(),
            Ok(Action::ApproveOrder(7))
        );
        assert_eq!(
            "return_order_9".parse::<Action>(),
            Ok(Action::Release(9))
        );
        assert_eq!(
            "sc_cal_2026-03-01".parse::<Action>(),
            Ok(Action::SearchDate(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()))
        );
    }

    #[test]
    fn literal_payloads_win_over_prefixes() {
        assert_eq!("tf_done".parse::<Action>(), Ok(Action::TariffsDone));
        assert_eq!("tf_3".parse::<Action>(), Ok(Action::PickTariff(3)));
        assert_eq!("cl_cancel".parse::<Action>(), Ok(Action::AbortOrder));
    }

    #[test]
    fn hour_payload_is_zero_padded() {
        assert_eq!(Action::PickHour(7).to_string(), "time_07");
        assert_eq!("time_07".parse::<Action>(), Ok(Action::PickHour(7)));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Action>().is_err());
        assert!("take_abc".parse::<Action>().is_err());
        assert!("teleport_5".parse::<Action>().is_err());
        assert!("cal_2026-13-40".parse::<Action>().is_err());
    }

    #[test]
    fn payloads_fit_platform_limit() {
        let longest = Action::ApproveDriver(i64::MAX).to_string();
        assert!(longest.len() <= 64, "payload too long: {longest}");
    }

    #[test]
    fn display_and_parse_agree() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let actions = [
            Action::PickOrigin(1),
            Action::PickDestination(2),
            Action::PickDate(date),
            Action::PickPassengers(3),
            Action::CancelOrder(4),
            Action::DepartToPickup(5),
            Action::StartTrip(6),
            Action::RouteTo(7),
            Action::ToggleTariff(8),
            Action::RejectMatch(9),
            Action::CloseMessage,
        ];
        for action in actions {
            assert_eq!(action.to_string().parse::<Action>(), Ok(action));
        }
    }

    #[test]
    fn wizard_steps_are_flagged() {
        assert!(Action::PickTariff(1).is_order_wizard_step());
        assert!(Action::ConfirmOrder.is_order_wizard_step());
        assert!(!Action::PickOrigin(1).is_order_wizard_step());
        assert!(!Action::Claim(1).is_order_wizard_step());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_payloads_never_panic(s in "\\PC{0,40}") {
                let _ = s.parse::<Action>();
            }

            #[test]
            fn order_ids_survive_the_wire(id in 0i64..i64::MAX) {
                prop_assert_eq!(Action::Claim(id).to_string().parse::<Action>(), Ok(Action::Claim(id)));
            }
        }
    }
}
