// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing texts and keyboards.
//!
//! All texts are HTML (the transports send with HTML parse mode), so every
//! user-supplied string goes through [`escape`]. Every notice that concerns an
//! order carries its `#id` and corridor.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use intercab_core::action::Action;
use intercab_core::types::{
    Button, DriverProfile, Keyboard, Location, LocationId, Notice, Order, OrderStats, OrderStatus,
    RiderStats, Tariff, TariffId, User, UserCounts,
};

/// Reply-keyboard menu labels. Inbound text equal to a label is a menu event.
pub mod labels {
    pub const NEW_ORDER: &str = "New order";
    pub const MY_ORDERS: &str = "My orders";
    pub const ACTIVE_ORDERS: &str = "Active orders";
    pub const MY_ROUTES: &str = "My routes";
    pub const MY_TARIFFS: &str = "My tariffs";
    pub const SEARCH_BY_DATE: &str = "Search by date";
    pub const PENDING_ORDERS: &str = "Pending orders";
    pub const PENDING_DRIVERS: &str = "Pending drivers";
    pub const STATISTICS: &str = "Statistics";
    pub const LOCATIONS: &str = "Locations";
    pub const TARIFFS: &str = "Tariffs";
    pub const SHARE_CONTACT: &str = "Share phone number";
}

/// Escapes text for HTML parse mode.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn grid(buttons: Vec<Button>, columns: usize) -> Vec<Vec<Button>> {
    buttons
        .chunks(columns.max(1))
        .map(|row| row.to_vec())
        .collect()
}

fn menu(rows: &[&[&str]]) -> Keyboard {
    Keyboard::Menu(
        rows.iter()
            .map(|row| row.iter().map(|l| (*l).to_string()).collect())
            .collect(),
    )
}

// --- Menus ---

pub fn rider_menu() -> Keyboard {
    menu(&[&[labels::NEW_ORDER], &[labels::MY_ORDERS]])
}

pub fn driver_menu() -> Keyboard {
    menu(&[
        &[labels::ACTIVE_ORDERS, labels::MY_ORDERS],
        &[labels::MY_ROUTES, labels::MY_TARIFFS],
        &[labels::SEARCH_BY_DATE],
    ])
}

pub fn operator_menu() -> Keyboard {
    menu(&[
        &[labels::PENDING_ORDERS, labels::PENDING_DRIVERS],
        &[labels::STATISTICS],
        &[labels::LOCATIONS, labels::TARIFFS],
    ])
}

/// Whether `text` is one of the menu labels.
pub fn is_menu_label(text: &str) -> bool {
    [
        labels::NEW_ORDER,
        labels::MY_ORDERS,
        labels::ACTIVE_ORDERS,
        labels::MY_ROUTES,
        labels::MY_TARIFFS,
        labels::SEARCH_BY_DATE,
        labels::PENDING_ORDERS,
        labels::PENDING_DRIVERS,
        labels::STATISTICS,
        labels::LOCATIONS,
        labels::TARIFFS,
    ]
    .contains(&text)
}

pub fn request_contact(text: &str) -> Notice {
    Notice::text(text).with_keyboard(Keyboard::RequestContact(labels::SHARE_CONTACT.to_string()))
}

// --- Pickers ---

pub fn location_picker(
    locations: &[Location],
    exclude: Option<LocationId>,
    action: fn(LocationId) -> Action,
) -> Keyboard {
    let buttons = locations
        .iter()
        .filter(|l| Some(l.id) != exclude)
        .map(|l| Button::new(&l.name, action(l.id)))
        .collect();
    Keyboard::Inline(grid(buttons, 3))
}

pub fn tariff_picker(tariffs: &[Tariff]) -> Keyboard {
    let buttons = tariffs
        .iter()
        .map(|t| Button::new(&t.name, Action::PickTariff(t.id)))
        .collect();
    Keyboard::Inline(grid(buttons, 2))
}

pub fn date_picker(dates: &[NaiveDate], action: fn(NaiveDate) -> Action) -> Keyboard {
    let buttons = dates
        .iter()
        .map(|d| Button::new(d.format("%a %d.%m").to_string(), action(*d)))
        .collect();
    Keyboard::Inline(grid(buttons, 4))
}

pub fn hour_picker(hours: impl IntoIterator<Item = u32>) -> Keyboard {
    let buttons = hours
        .into_iter()
        .map(|h| Button::new(format!("{h:02}:00"), Action::PickHour(h)))
        .collect();
    Keyboard::Inline(grid(buttons, 4))
}

pub fn passenger_picker() -> Keyboard {
    let buttons = (1..=4)
        .map(|n| Button::new(n.to_string(), Action::PickPassengers(n)))
        .collect();
    Keyboard::Inline(vec![buttons])
}

pub fn confirm_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![
        Button::new("Confirm", Action::ConfirmOrder),
        Button::new("Cancel", Action::AbortOrder),
    ]])
}

pub fn route_editor(has_routes: bool) -> Keyboard {
    let mut rows = vec![vec![Button::new("Add route", Action::AddRoute)]];
    if has_routes {
        rows.push(vec![Button::new("Clear all", Action::ClearRoutes)]);
    }
    rows.push(vec![Button::new("Done", Action::RoutesDone)]);
    Keyboard::Inline(rows)
}

pub fn tariff_toggles(tariffs: &[Tariff], enabled: &[TariffId]) -> Keyboard {
    let buttons = tariffs
        .iter()
        .map(|t| {
            let mark = if enabled.contains(&t.id) { "[x]" } else { "[ ]" };
            Button::new(format!("{mark} {}", t.name), Action::ToggleTariff(t.id))
        })
        .collect();
    let mut rows = grid(buttons, 2);
    rows.push(vec![Button::new("Done", Action::TariffsDone)]);
    Keyboard::Inline(rows)
}

// --- Order views ---

pub fn corridor(order: &Order) -> String {
    format!(
        "{} → {}",
        escape(&order.origin_name),
        escape(&order.destination_name)
    )
}

pub fn pickup(time: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match time {
        Some(t) => t.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string(),
        None => "as soon as possible".to_string(),
    }
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "awaiting approval",
        OrderStatus::Active => "looking for a driver",
        OrderStatus::WaitConfirm => "driver found, awaiting confirmation",
        OrderStatus::Taken => "driver assigned",
        OrderStatus::OnWay => "driver on the way",
        OrderStatus::Arrived => "driver arrived",
        OrderStatus::InProgress => "trip in progress",
        OrderStatus::Completed => "completed",
        OrderStatus::Cancelled => "cancelled",
        OrderStatus::CancelledByAdmin => "rejected by operator",
    }
}

/// Multi-line order summary with an `Order #id` header.
pub fn order_card(order: &Order, offset: FixedOffset) -> String {
    format!(
        "<b>Order #{}</b>\nRoute: {}\nFare class: {}\nPickup: {}\nPassengers: {}\nPrice: {} {}",
        order.id,
        corridor(order),
        escape(&order.tariff_name),
        pickup(order.pickup_time, offset),
        order.passengers,
        order.price,
        escape(&order.currency),
    )
}

pub fn order_with_status(order: &Order, offset: FixedOffset) -> String {
    format!(
        "{}\nStatus: {}",
        order_card(order, offset),
        status_label(order.status)
    )
}

fn rider_contact(order: &Order) -> String {
    format!(
        "Rider: {}\nPhone: {}",
        escape(&order.rider_username),
        escape(&order.rider_phone)
    )
}

fn driver_contact(driver: &User, profile: Option<&DriverProfile>) -> String {
    let mut text = format!(
        "Driver: {}\nPhone: {}",
        escape(&driver.display_name()),
        escape(driver.phone_or_unknown())
    );
    if let Some(p) = profile {
        text.push_str(&format!(
            "\nVehicle: {} {}, {}",
            escape(&p.car_brand),
            escape(&p.car_model),
            escape(&p.license_plate)
        ));
    }
    text
}

/// Summary shown before the rider confirms a new order.
#[allow(clippy::too_many_arguments)]
pub fn draft_summary(
    origin: &str,
    destination: &str,
    tariff: &str,
    pickup_time: DateTime<Utc>,
    passengers: u32,
    price: i64,
    currency: &str,
    offset: FixedOffset,
) -> Notice {
    Notice::text(format!(
        "<b>Check your order</b>\nRoute: {} → {}\nFare class: {}\nPickup: {}\nPassengers: {}\nPrice: {} {}",
        escape(origin),
        escape(destination),
        escape(tariff),
        pickup(Some(pickup_time), offset),
        passengers,
        price,
        escape(currency),
    ))
    .with_keyboard(confirm_keyboard())
}

/// The claim offer broadcast to candidate drivers.
pub fn claim_offer(order: &Order, offset: FixedOffset) -> Notice {
    Notice::text(format!("<b>New order available</b>\n{}", order_card(order, offset)))
        .with_keyboard(Keyboard::Inline(vec![vec![Button::new(
            "Take order",
            Action::Claim(order.id),
        )]]))
}

pub fn order_approval_prompt(order: &Order, offset: FixedOffset) -> Notice {
    Notice::text(format!(
        "<b>New order awaiting approval</b>\n{}\n{}",
        order_card(order, offset),
        rider_contact(order)
    ))
    .with_keyboard(Keyboard::Inline(vec![vec![
        Button::new("Approve", Action::ApproveOrder(order.id)),
        Button::new("Reject", Action::RejectOrder(order.id)),
    ]]))
}

pub fn match_approval_prompt(
    order: &Order,
    driver: &User,
    profile: Option<&DriverProfile>,
    offset: FixedOffset,
) -> Notice {
    Notice::text(format!(
        "<b>Driver wants order #{}</b>\n{}\n{}\n{}",
        order.id,
        order_card(order, offset),
        rider_contact(order),
        driver_contact(driver, profile)
    ))
    .with_keyboard(Keyboard::Inline(vec![vec![
        Button::new("Confirm match", Action::ApproveMatch(order.id)),
        Button::new("Reject match", Action::RejectMatch(order.id)),
    ]]))
}

pub fn driver_review_prompt(driver: &User, profile: Option<&DriverProfile>) -> Notice {
    Notice::text(format!(
        "<b>New driver application</b>\n{}",
        driver_contact(driver, profile)
    ))
    .with_keyboard(Keyboard::Inline(vec![vec![
        Button::new("Approve", Action::ApproveDriver(driver.id)),
        Button::new("Reject", Action::RejectDriver(driver.id)),
    ]]))
}

/// Controls a rider sees under one of their orders.
pub fn rider_order_controls(order: &Order) -> Option<Keyboard> {
    order.status.is_cancellable_by_rider().then(|| {
        Keyboard::Inline(vec![vec![Button::new(
            "Cancel order",
            Action::CancelOrder(order.id),
        )]])
    })
}

/// The next trip-progress button (and the release button while still `taken`).
pub fn driver_order_controls(order: &Order) -> Option<Keyboard> {
    let row = match order.status {
        OrderStatus::Taken => vec![
            Button::new("On my way", Action::DepartToPickup(order.id)),
            Button::new("Release order", Action::Release(order.id)),
        ],
        OrderStatus::OnWay => vec![Button::new("Arrived", Action::ArriveAtPickup(order.id))],
        OrderStatus::Arrived => vec![Button::new("Start trip", Action::StartTrip(order.id))],
        OrderStatus::InProgress => {
            vec![Button::new("Complete trip", Action::CompleteTrip(order.id))]
        }
        _ => return None,
    };
    Some(Keyboard::Inline(vec![row]))
}

pub fn rider_stats_header(stats: &RiderStats) -> String {
    format!(
        "<b>My orders</b>\nTotal: {} · Completed: {} · Cancelled: {}",
        stats.total, stats.completed, stats.cancelled
    )
}

pub fn statistics(users: &UserCounts, orders: &OrderStats) -> String {
    format!(
        "<b>Statistics</b>\nUsers: {} (riders {}, drivers {}, operators {})\n\
         Orders: {} total, {} in flight, {} today\nCancellation rate: {:.1}%",
        users.total,
        users.riders,
        users.drivers,
        users.operators,
        orders.total,
        orders.in_flight,
        orders.today,
        orders.cancel_rate
    )
}

pub fn name_list(title: &str, names: impl IntoIterator<Item = String>) -> String {
    let mut text = format!("<b>{}</b>\n", escape(title));
    let mut empty = true;
    for (i, name) in names.into_iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, escape(&name)));
        empty = false;
    }
    if empty {
        text.push_str("(none)\n");
    }
    text
}

// --- Notifications ---

pub fn order_submitted(order: &Order) -> Notice {
    Notice::text(format!(
        "Order #{} ({}) was sent to the operator for approval.",
        order.id,
        corridor(order)
    ))
    .with_keyboard(rider_menu())
}

pub fn order_published(order: &Order) -> Notice {
    Notice::text(format!(
        "Order #{} ({}) was approved. Looking for a driver.",
        order.id,
        corridor(order)
    ))
}

pub fn order_rejected(order: &Order) -> Notice {
    Notice::text(format!(
        "Order #{} ({}) was rejected by the operator.",
        order.id,
        corridor(order)
    ))
}

pub fn match_confirmed_for_rider(
    order: &Order,
    driver: &User,
    profile: Option<&DriverProfile>,
) -> Notice {
    Notice::text(format!(
        "<b>A driver is assigned to order #{}</b> ({})\n{}",
        order.id,
        corridor(order),
        driver_contact(driver, profile)
    ))
}

pub fn match_confirmed_for_driver(order: &Order, offset: FixedOffset) -> Notice {
    let notice = Notice::text(format!(
        "<b>Order #{} is yours</b>\n{}\n{}",
        order.id,
        order_card(order, offset),
        rider_contact(order)
    ));
    match driver_order_controls(order) {
        Some(kb) => notice.with_keyboard(kb),
        None => notice,
    }
}

pub fn match_rejected_for_driver(order: &Order) -> Notice {
    Notice::text(format!(
        "The operator did not confirm you for order #{} ({}).",
        order.id,
        corridor(order)
    ))
}

pub fn claim_sent(order: &Order) -> Notice {
    Notice::text(format!(
        "Request for order #{} ({}) sent. Waiting for the operator.",
        order.id,
        corridor(order)
    ))
}

pub fn order_released_for_rider(order: &Order) -> Notice {
    Notice::text(format!(
        "The driver released order #{} ({}). Looking for another driver.",
        order.id,
        corridor(order)
    ))
}

pub fn order_cancelled_for_driver(order: &Order) -> Notice {
    Notice::text(format!(
        "The rider cancelled order #{} ({}).",
        order.id,
        corridor(order)
    ))
}

pub fn order_cancelled_for_rider(order: &Order) -> Notice {
    Notice::text(format!(
        "Order #{} ({}) is cancelled.",
        order.id,
        corridor(order)
    ))
}

/// What the rider is told when the driver reports a trip step.
pub fn trip_step_for_rider(order: &Order) -> Notice {
    let what = match order.status {
        OrderStatus::OnWay => "The driver is on the way",
        OrderStatus::Arrived => "The driver has arrived",
        OrderStatus::InProgress => "The trip has started",
        OrderStatus::Completed => "The trip is complete. Thank you",
        _ => "Order updated",
    };
    Notice::text(format!("{what}. Order #{} ({}).", order.id, corridor(order)))
}

pub fn driver_approved() -> Notice {
    Notice::text("Your application was approved. Welcome aboard!").with_keyboard(driver_menu())
}

pub fn driver_rejected() -> Notice {
    Notice::text("Your application was rejected.")
}

pub fn restart_prompt() -> Notice {
    Notice::text("This step is no longer available. Please start again with /start.")
}

pub fn no_longer_available(order_id: i64) -> String {
    format!("Order #{order_id} is no longer available.")
}

pub fn already_handled(order_id: i64) -> String {
    format!("Order #{order_id} was already handled.")
}

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[cfg(test)]
mod tests {
    use super::*;
    use intercab_core::types::UNKNOWN;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 100,
            rider_id: 1,
            driver_id: Some(2),
            origin_id: 1,
            destination_id: 2,
            tariff_id: 3,
            price: 1500,
            currency: "RUB".into(),
            passengers: 2,
            pickup_time: None,
            status,
            created_at: Utc::now(),
            on_way_at: None,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            rider_username: UNKNOWN.into(),
            rider_phone: UNKNOWN.into(),
            origin_name: "A<1>".into(),
            destination_name: "B".into(),
            tariff_name: "Economy".into(),
        }
    }

    #[test]
    fn escapes_html() {
        assert_eq!(escape("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }

    #[test]
    fn order_notices_carry_id_and_corridor() {
        let o = order(OrderStatus::Active);
        for notice in [
            claim_offer(&o, FixedOffset::east_opt(0).unwrap()),
            order_published(&o),
            order_rejected(&o),
            match_rejected_for_driver(&o),
            order_cancelled_for_driver(&o),
        ] {
            assert!(notice.text.contains("#100"), "{}", notice.text);
            assert!(notice.text.contains("A&lt;1&gt; → B"), "{}", notice.text);
        }
    }

    #[test]
    fn claim_offer_button_encodes_order() {
        let notice = claim_offer(&order(OrderStatus::Active), FixedOffset::east_opt(0).unwrap());
        let Some(Keyboard::Inline(rows)) = notice.keyboard else {
            panic!("expected inline keyboard");
        };
        assert_eq!(rows[0][0].action, Action::Claim(100));
        assert_eq!(rows[0][0].action.to_string(), "take_100");
    }

    #[test]
    fn driver_controls_follow_status() {
        let controls = |s| match driver_order_controls(&order(s)) {
            Some(Keyboard::Inline(rows)) => rows[0].iter().map(|b| b.action).collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        assert_eq!(
            controls(OrderStatus::Taken),
            vec![Action::DepartToPickup(100), Action::Release(100)]
        );
        assert_eq!(controls(OrderStatus::Arrived), vec![Action::StartTrip(100)]);
        assert!(controls(OrderStatus::Completed).is_empty());
        assert!(controls(OrderStatus::WaitConfirm).is_empty());
    }

    #[test]
    fn only_cancellable_orders_get_cancel_button() {
        assert!(rider_order_controls(&order(OrderStatus::Taken)).is_some());
        assert!(rider_order_controls(&order(OrderStatus::OnWay)).is_none());
    }

    #[test]
    fn location_picker_excludes_origin() {
        let locations = vec![
            Location { id: 1, name: "A".into() },
            Location { id: 2, name: "B".into() },
        ];
        let Keyboard::Inline(rows) = location_picker(&locations, Some(1), Action::PickDestination)
        else {
            panic!("expected inline keyboard");
        };
        let actions: Vec<_> = rows.concat().into_iter().map(|b| b.action).collect();
        assert_eq!(actions, vec![Action::PickDestination(2)]);
    }

    #[test]
    fn asap_pickup_is_spelled_out() {
        assert_eq!(pickup(None, FixedOffset::east_opt(0).unwrap()), "as soon as possible");
    }

    #[test]
    fn menu_labels_are_recognized() {
        assert!(is_menu_label(labels::NEW_ORDER));
        assert!(is_menu_label(labels::PENDING_DRIVERS));
        assert!(!is_menu_label("hello"));
    }
}
