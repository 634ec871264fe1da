// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver bot: onboarding, route and fare-class self-service, order search,
//! claims and trip progress.
//!
//! Onboarding is driven by the user's status rather than by the session, so a
//! restart in the middle of registration resumes at the right screen:
//! `pending` drivers walk contact → vehicle → routes → fare classes and end up
//! `pending_review`; only `active` drivers see orders.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use intercab_core::action::Action;
use intercab_core::error::IntercabError;
use intercab_core::lifecycle::OrderTransition;
use intercab_core::types::{
    DriverProfile, Keyboard, LocationId, Notice, Order, OrderId, PlatformId, Role, TariffId, User,
    UserStatus,
};

use super::{Event, START_FIRST, Turn, status_refusal, store_contact, wrong_bot};
use crate::approval;
use crate::dispatcher;
use crate::matching;
use crate::render::{self, labels};
use crate::session::WizardState;
use crate::trips;

/// Offers shown per list request.
const LIST_LIMIT: usize = 20;

const UNDER_REVIEW: &str = "Your application is under review. We will let you know.";

/// Payload posted by the companion mini app.
#[derive(Debug, Deserialize)]
struct WebAppRequest {
    action: String,
    order_id: OrderId,
}

pub async fn handle(turn: &mut Turn<'_>, event: Event) -> Result<(), IntercabError> {
    if event == Event::Start {
        return start(turn).await;
    }

    let Some(user) = turn.current_user().await? else {
        return turn.say(START_FIRST).await;
    };
    if user.role != Role::Driver {
        return turn.say(wrong_bot(user.role)).await;
    }
    if let Some(refusal) = status_refusal(user.status) {
        return turn.say(refusal).await;
    }
    if user.status == UserStatus::PendingReview {
        return turn.say(UNDER_REVIEW).await;
    }

    match event {
        Event::Start => start(turn).await,
        Event::Contact { phone, owner } => contact(turn, &user, &phone, owner).await,
        Event::Text(text) => text_input(turn, &user, &text).await,
        Event::Action { action, message_id } => {
            on_action(turn, &user, action, message_id.as_deref()).await
        }
        Event::WebApp(data) => web_app(turn, &user, &data).await,
    }
}

async fn start(turn: &mut Turn<'_>) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let user = match turn.current_user().await? {
        Some(existing) if existing.role == Role::Operator => {
            return turn.say(wrong_bot(existing.role)).await;
        }
        Some(existing) if existing.role == Role::Rider => {
            ctx.storage.set_user_role(existing.id, Role::Driver).await?;
            ctx.storage
                .set_user_status(existing.id, UserStatus::Pending)
                .await?;
            info!(user_id = existing.id, "rider registering as driver");
            User {
                role: Role::Driver,
                status: UserStatus::Pending,
                ..existing
            }
        }
        _ => {
            ctx.storage
                .get_or_create_user(
                    turn.sender.platform_id,
                    turn.sender.username.as_deref(),
                    &turn.sender.full_name,
                    Role::Driver,
                )
                .await?
        }
    };

    turn.session(&user).reset();
    match user.status {
        UserStatus::Active => {
            turn.reply(Notice::text("Welcome back! Ready for orders.").with_keyboard(render::driver_menu()))
                .await
        }
        UserStatus::PendingReview => turn.say(UNDER_REVIEW).await,
        UserStatus::Pending => resume_onboarding(turn, &user).await,
        status => match status_refusal(status) {
            Some(refusal) => turn.say(refusal).await,
            None => Ok(()),
        },
    }
}

/// Shows the first onboarding step that still lacks data.
async fn resume_onboarding(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    if user.phone.is_none() {
        turn.session(user).state = WizardState::AwaitingContact;
        return turn
            .reply(render::request_contact(
                "Welcome! To drive with us, first share your phone number.",
            ))
            .await;
    }
    turn.session(user).state = WizardState::AwaitingCarBrand;
    turn.reply(Notice::text("What is your car brand?").with_keyboard(Keyboard::Remove))
        .await
}

async fn contact(
    turn: &mut Turn<'_>,
    user: &User,
    phone: &str,
    owner: Option<PlatformId>,
) -> Result<(), IntercabError> {
    if !store_contact(turn, user, phone, owner).await? {
        return Ok(());
    }
    if user.status == UserStatus::Pending {
        turn.session(user).state = WizardState::AwaitingCarBrand;
        return turn
            .reply(Notice::text("Thanks! What is your car brand?").with_keyboard(Keyboard::Remove))
            .await;
    }
    turn.reply(Notice::text("Phone number updated.").with_keyboard(render::driver_menu()))
        .await
}

async fn text_input(turn: &mut Turn<'_>, user: &User, text: &str) -> Result<(), IntercabError> {
    if render::is_menu_label(text) {
        if user.status != UserStatus::Active {
            return turn.say("Please finish registration first.").await;
        }
        if turn.repeated_menu(user, text) {
            return Ok(());
        }
        turn.session(user).reset();
        return match text {
            labels::ACTIVE_ORDERS => active_orders(turn, user).await,
            labels::MY_ORDERS => my_orders(turn, user).await,
            labels::MY_ROUTES => show_routes(turn, user, None).await,
            labels::MY_TARIFFS => show_tariffs(turn, user, None).await,
            labels::SEARCH_BY_DATE => {
                let dates = turn.ctx.upcoming_dates(7);
                turn.reply(
                    Notice::text("<b>Pick a date</b>")
                        .with_keyboard(render::date_picker(&dates, Action::SearchDate)),
                )
                .await
            }
            _ => show_menu(turn).await,
        };
    }

    let state = turn.session(user).state;
    match state {
        WizardState::AwaitingContact => {
            turn.reply(render::request_contact(
                "Please use the button below to share your phone number.",
            ))
            .await
        }
        WizardState::AwaitingCarBrand => {
            let Some(brand) = non_empty(text) else {
                return turn.say("Please send the car brand.").await;
            };
            let session = turn.session(user);
            session.scratch = brand.to_string();
            session.state = WizardState::AwaitingCarModel;
            turn.say("What is the model?").await
        }
        WizardState::AwaitingCarModel => {
            let Some(model) = non_empty(text) else {
                return turn.say("Please send the car model.").await;
            };
            let session = turn.session(user);
            if session.scratch.is_empty() {
                return Err(IntercabError::MissingPrerequisite("car brand".into()));
            }
            session.scratch = format!("{}\n{model}", session.scratch);
            session.state = WizardState::AwaitingLicensePlate;
            turn.say("What is the license plate number?").await
        }
        WizardState::AwaitingLicensePlate => {
            let Some(plate) = non_empty(text) else {
                return turn.say("Please send the license plate number.").await;
            };
            register_vehicle(turn, user, plate).await
        }
        _ if user.status == UserStatus::Pending => resume_onboarding(turn, user).await,
        _ => show_menu(turn).await,
    }
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

async fn register_vehicle(turn: &mut Turn<'_>, user: &User, plate: &str) -> Result<(), IntercabError> {
    let (brand, model) = turn
        .session(user)
        .scratch
        .split_once('\n')
        .map(|(b, m)| (b.to_string(), m.to_string()))
        .ok_or_else(|| IntercabError::MissingPrerequisite("car brand and model".into()))?;

    turn.ctx
        .storage
        .save_driver_profile(&DriverProfile {
            user_id: user.id,
            car_brand: brand,
            car_model: model,
            license_plate: plate.to_uppercase(),
        })
        .await?;
    info!(driver_id = user.id, "vehicle registered");

    {
        let session = turn.session(user);
        session.scratch.clear();
        session.state = WizardState::EditingRoutes;
    }
    turn.say("Vehicle saved. Now choose the routes you drive. With no routes you receive orders on every route.")
        .await?;
    show_routes(turn, user, None).await
}

async fn show_menu(turn: &Turn<'_>) -> Result<(), IntercabError> {
    turn.reply(Notice::text("Choose an option from the menu.").with_keyboard(render::driver_menu()))
        .await
}

async fn on_action(
    turn: &mut Turn<'_>,
    user: &User,
    action: Action,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    // Route and fare-class editing is part of onboarding; everything else
    // needs an approved driver.
    match action {
        Action::AddRoute => return add_route_start(turn, user, message_id).await,
        Action::RouteFrom(id) => return route_from(turn, user, id, message_id).await,
        Action::RouteTo(id) => return route_to(turn, user, id, message_id).await,
        Action::ClearRoutes => {
            turn.ctx.storage.clear_routes(user.id).await?;
            info!(driver_id = user.id, "routes cleared");
            return show_routes(turn, user, message_id).await;
        }
        Action::RoutesDone => return routes_done(turn, user, message_id).await,
        Action::ToggleTariff(id) => return toggle_tariff(turn, user, id, message_id).await,
        Action::TariffsDone => return tariffs_done(turn, user, message_id).await,
        Action::CloseMessage => {
            turn.delete(message_id).await;
            return Ok(());
        }
        _ => {}
    }

    if user.status != UserStatus::Active {
        return turn.say("Please finish registration first.").await;
    }

    match action {
        Action::Claim(id) => claim(turn, user, id, message_id).await,
        Action::Release(id) => {
            let order = trips::release(turn.ctx, id, user.id).await?;
            turn.delete(message_id).await;
            turn.say(format!(
                "Order #{} ({}) was returned to the pool.",
                order.id,
                render::corridor(&order)
            ))
            .await
        }
        Action::DepartToPickup(id) => {
            step(turn, id, OrderTransition::DepartToPickup { driver_id: user.id }, message_id).await
        }
        Action::ArriveAtPickup(id) => {
            step(turn, id, OrderTransition::ArriveAtPickup { driver_id: user.id }, message_id).await
        }
        Action::StartTrip(id) => {
            step(turn, id, OrderTransition::StartTrip { driver_id: user.id }, message_id).await
        }
        Action::CompleteTrip(id) => {
            step(turn, id, OrderTransition::CompleteTrip { driver_id: user.id }, message_id).await
        }
        Action::SearchDate(date) => search_by_date(turn, user, date).await,
        other => {
            debug!(action = %other, "action not handled by driver bot");
            Ok(())
        }
    }
}

// --- Routes ---

async fn show_routes(
    turn: &mut Turn<'_>,
    user: &User,
    replace: Option<&str>,
) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let routes = ctx.storage.driver_routes(user.id).await?;
    let names: HashMap<LocationId, String> = ctx
        .storage
        .list_locations()
        .await?
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect();
    let name = |id: LocationId| {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| intercab_core::types::UNKNOWN.to_string())
    };

    let mut text = render::name_list(
        "My routes",
        routes
            .iter()
            .map(|r| format!("{} → {}", name(r.origin_id), name(r.destination_id))),
    );
    if routes.is_empty() {
        text.push_str("You receive orders on every route.");
    }

    turn.session(user).state = WizardState::EditingRoutes;
    turn.delete(replace).await;
    turn.reply(Notice::text(text).with_keyboard(render::route_editor(!routes.is_empty())))
        .await
}

async fn add_route_start(
    turn: &mut Turn<'_>,
    user: &User,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let locations = turn.ctx.storage.list_locations().await?;
    if locations.len() < 2 {
        return turn.say("No locations are configured yet.").await;
    }
    {
        let session = turn.session(user);
        session.state = WizardState::EditingRoutes;
        session.route_origin = None;
    }
    turn.delete(message_id).await;
    turn.reply(
        Notice::text("<b>Where do you leave from?</b>").with_keyboard(render::location_picker(
            &locations,
            None,
            Action::RouteFrom,
        )),
    )
    .await
}

async fn route_from(
    turn: &mut Turn<'_>,
    user: &User,
    origin: LocationId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    ctx.storage
        .get_location(origin)
        .await?
        .ok_or_else(|| IntercabError::not_found("location", origin))?;
    let locations = ctx.storage.list_locations().await?;

    turn.session(user).route_origin = Some(origin);
    turn.delete(message_id).await;
    turn.reply(
        Notice::text("<b>Where do you go?</b>").with_keyboard(render::location_picker(
            &locations,
            Some(origin),
            Action::RouteTo,
        )),
    )
    .await
}

async fn route_to(
    turn: &mut Turn<'_>,
    user: &User,
    destination: LocationId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let origin = turn
        .session(user)
        .route_origin
        .ok_or_else(|| IntercabError::MissingPrerequisite("route origin".into()))?;
    turn.ctx
        .storage
        .add_route(user.id, origin, destination)
        .await?;
    info!(driver_id = user.id, origin, destination, "route added");

    turn.session(user).route_origin = None;
    show_routes(turn, user, message_id).await
}

async fn routes_done(
    turn: &mut Turn<'_>,
    user: &User,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    if user.status == UserStatus::Pending {
        return show_tariffs(turn, user, message_id).await;
    }
    turn.session(user).reset();
    turn.delete(message_id).await;
    turn.reply(Notice::text("Routes saved.").with_keyboard(render::driver_menu()))
        .await
}

// --- Fare classes ---

async fn show_tariffs(
    turn: &mut Turn<'_>,
    user: &User,
    replace: Option<&str>,
) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let tariffs = ctx.storage.list_tariffs().await?;
    let enabled = ctx.storage.driver_tariffs(user.id).await?;

    let text = if enabled.is_empty() {
        "<b>My fare classes</b>\nNone selected: you receive orders of every fare class."
    } else {
        "<b>My fare classes</b>\nYou receive orders of the checked fare classes."
    };
    turn.session(user).state = WizardState::EditingTariffs;
    turn.delete(replace).await;
    turn.reply(Notice::text(text).with_keyboard(render::tariff_toggles(&tariffs, &enabled)))
        .await
}

async fn toggle_tariff(
    turn: &mut Turn<'_>,
    user: &User,
    tariff: TariffId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    ctx.storage
        .get_tariff(tariff)
        .await?
        .ok_or_else(|| IntercabError::not_found("tariff", tariff))?;
    let enabled = ctx.storage.toggle_driver_tariff(user.id, tariff).await?;
    debug!(driver_id = user.id, tariff, enabled, "fare class toggled");
    show_tariffs(turn, user, message_id).await
}

async fn tariffs_done(
    turn: &mut Turn<'_>,
    user: &User,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    if user.status != UserStatus::Pending {
        turn.session(user).reset();
        turn.delete(message_id).await;
        return turn
            .reply(Notice::text("Fare classes saved.").with_keyboard(render::driver_menu()))
            .await;
    }

    let ctx = turn.ctx;
    let profile = ctx
        .storage
        .get_driver_profile(user.id)
        .await?
        .ok_or_else(|| IntercabError::MissingPrerequisite("vehicle details".into()))?;
    if user.phone.is_none() {
        return Err(IntercabError::MissingPrerequisite("phone number".into()));
    }
    ctx.storage
        .set_user_status(user.id, UserStatus::PendingReview)
        .await?;
    info!(driver_id = user.id, "driver application submitted");

    let applicant = User {
        status: UserStatus::PendingReview,
        ..user.clone()
    };
    let reached =
        approval::prompt_operators(ctx, render::driver_review_prompt(&applicant, Some(&profile)))
            .await?;
    if reached == 0 {
        warn!(driver_id = user.id, "driver application submitted with no operator online");
    }

    turn.session(user).reset();
    turn.delete(message_id).await;
    turn.reply(
        Notice::text("Application submitted. An operator will review it shortly.")
            .with_keyboard(Keyboard::Remove),
    )
    .await
}

// --- Orders ---

async fn offer_list(turn: &Turn<'_>, orders: &[Order], empty: &str) -> Result<(), IntercabError> {
    if orders.is_empty() {
        return turn.say(empty).await;
    }
    let offset = turn.ctx.offset();
    for order in orders.iter().take(LIST_LIMIT) {
        turn.reply(render::claim_offer(order, offset)).await?;
    }
    Ok(())
}

async fn matching_for(
    turn: &Turn<'_>,
    user: &User,
    orders: Vec<Order>,
) -> Result<Vec<Order>, IntercabError> {
    let assignments = matching::driver_assignments(turn.ctx.storage.as_ref(), user.id).await?;
    Ok(orders.into_iter().filter(|o| assignments.accepts(o)).collect())
}

async fn active_orders(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    let orders = turn.ctx.storage.active_orders().await?;
    let orders = matching_for(turn, user, orders).await?;
    offer_list(turn, &orders, "No active orders on your routes right now.").await
}

async fn search_by_date(turn: &mut Turn<'_>, user: &User, date: NaiveDate) -> Result<(), IntercabError> {
    let (start, end) = turn
        .ctx
        .local_day_bounds(date)
        .ok_or_else(|| IntercabError::Validation(format!("invalid search date {date}")))?;
    let orders = turn.ctx.storage.active_orders_between(start, end).await?;
    let orders = matching_for(turn, user, orders).await?;
    offer_list(
        turn,
        &orders,
        &format!("No orders on your routes for {}.", date.format("%d.%m.%Y")),
    )
    .await
}

async fn my_orders(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    let orders = turn.ctx.storage.orders_by_driver(user.id).await?;
    let current: Vec<&Order> = orders.iter().filter(|o| !o.status.is_terminal()).collect();
    if current.is_empty() {
        return turn.say("You have no current orders.").await;
    }
    let offset = turn.ctx.offset();
    for order in current.into_iter().take(LIST_LIMIT) {
        turn.reply(order_view(order, offset)).await?;
    }
    Ok(())
}

fn order_view(order: &Order, offset: chrono::FixedOffset) -> Notice {
    let notice = Notice::text(render::order_with_status(order, offset));
    match render::driver_order_controls(order) {
        Some(kb) => notice.with_keyboard(kb),
        None => notice,
    }
}

async fn claim(
    turn: &mut Turn<'_>,
    user: &User,
    order_id: OrderId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let order = dispatcher::claim(turn.ctx, order_id, user).await?;
    turn.delete(message_id).await;
    turn.reply(render::claim_sent(&order)).await
}

async fn step(
    turn: &mut Turn<'_>,
    order_id: OrderId,
    transition: OrderTransition,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let order = trips::advance(turn.ctx, order_id, transition).await?;
    turn.delete(message_id).await;
    turn.reply(order_view(&order, turn.ctx.offset())).await
}

async fn web_app(turn: &mut Turn<'_>, user: &User, data: &str) -> Result<(), IntercabError> {
    let request: WebAppRequest = match serde_json::from_str(data) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "malformed web app payload");
            return Ok(());
        }
    };
    if request.action != "take_order" {
        debug!(action = %request.action, "unsupported web app action");
        return Ok(());
    }
    if user.status != UserStatus::Active {
        return turn.say("Please finish registration first.").await;
    }
    claim(turn, user, request.order_id, None).await
}
