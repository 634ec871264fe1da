// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rider bot: contact onboarding, the order wizard and "My orders".

use chrono::{Timelike, Utc};
use tracing::{debug, info};

use intercab_core::action::Action;
use intercab_core::error::IntercabError;
use intercab_core::types::{
    Keyboard, LocationId, Notice, OrderId, PlatformId, Role, TariffId, User, UserStatus,
};

use super::{Event, START_FIRST, Turn, status_refusal, store_contact, wrong_bot};
use crate::approval;
use crate::render::{self, labels};
use crate::session::WizardState;
use crate::trips;

/// Orders shown under "My orders".
const ORDER_HISTORY: usize = 10;

pub async fn handle(turn: &mut Turn<'_>, event: Event) -> Result<(), IntercabError> {
    if event == Event::Start {
        return start(turn).await;
    }

    let Some(user) = turn.current_user().await? else {
        return turn.say(START_FIRST).await;
    };
    if user.role != Role::Rider {
        return turn.say(wrong_bot(user.role)).await;
    }
    if let Some(refusal) = status_refusal(user.status) {
        return turn.say(refusal).await;
    }

    match event {
        Event::Start => start(turn).await,
        Event::Contact { phone, owner } => contact(turn, &user, &phone, owner).await,
        Event::Text(text) => text_input(turn, &user, &text).await,
        Event::Action { action, message_id } => {
            on_action(turn, &user, action, message_id.as_deref()).await
        }
        Event::WebApp(_) => {
            debug!("rider bot ignores web app payloads");
            Ok(())
        }
    }
}

async fn start(turn: &mut Turn<'_>) -> Result<(), IntercabError> {
    let storage = &turn.ctx.storage;
    if let Some(existing) = turn.current_user().await?
        && existing.role != Role::Rider
    {
        return turn.say(wrong_bot(existing.role)).await;
    }

    let user = storage
        .get_or_create_user(
            turn.sender.platform_id,
            turn.sender.username.as_deref(),
            &turn.sender.full_name,
            Role::Rider,
        )
        .await?;
    if let Some(refusal) = status_refusal(user.status) {
        return turn.say(refusal).await;
    }

    let needs_contact = user.phone.is_none();
    {
        let session = turn.session(&user);
        session.reset();
        if needs_contact {
            session.state = WizardState::AwaitingContact;
        }
    }

    if needs_contact {
        turn.reply(render::request_contact(
            "Welcome! Please share your phone number so drivers can reach you.",
        ))
        .await
    } else {
        turn.reply(Notice::text("Welcome back! Where are we going today?").with_keyboard(render::rider_menu()))
            .await
    }
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
        turn.ctx
            .storage
            .set_user_status(user.id, UserStatus::Active)
            .await?;
        info!(rider_id = user.id, "rider activated");
    }
    turn.session(user).reset();
    turn.reply(Notice::text("Thank you! You can order a ride now.").with_keyboard(render::rider_menu()))
        .await
}

async fn text_input(turn: &mut Turn<'_>, user: &User, text: &str) -> Result<(), IntercabError> {
    if render::is_menu_label(text) {
        if turn.repeated_menu(user, text) {
            return Ok(());
        }
        turn.session(user).reset();
        return match text {
            labels::NEW_ORDER => new_order(turn, user).await,
            labels::MY_ORDERS => my_orders(turn, user).await,
            _ => show_menu(turn).await,
        };
    }

    match turn.session(user).state {
        WizardState::AwaitingPassengers => match text.parse::<u32>() {
            Ok(n) => pick_passengers(turn, user, n, None).await,
            Err(_) => turn.say("Please send the number of passengers.").await,
        },
        WizardState::AwaitingPrice => enter_price(turn, user, text).await,
        WizardState::AwaitingContact => {
            turn.reply(render::request_contact(
                "Please use the button below to share your phone number.",
            ))
            .await
        }
        _ => show_menu(turn).await,
    }
}

async fn show_menu(turn: &Turn<'_>) -> Result<(), IntercabError> {
    turn.reply(Notice::text("Choose an option from the menu.").with_keyboard(render::rider_menu()))
        .await
}

async fn on_action(
    turn: &mut Turn<'_>,
    user: &User,
    action: Action,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    match action {
        Action::PickOrigin(id) => pick_origin(turn, user, id, message_id).await,
        Action::PickDestination(id) => pick_destination(turn, user, id, message_id).await,
        Action::PickTariff(id) => pick_tariff(turn, user, id, message_id).await,
        Action::PickDate(date) => pick_date(turn, user, date, message_id).await,
        Action::PickHour(hour) => pick_hour(turn, user, hour, message_id).await,
        Action::PickPassengers(n) => pick_passengers(turn, user, n, message_id).await,
        Action::ConfirmOrder => confirm(turn, user, message_id).await,
        Action::AbortOrder => {
            turn.session(user).reset();
            turn.delete(message_id).await;
            turn.reply(Notice::text("Order cancelled.").with_keyboard(render::rider_menu()))
                .await
        }
        Action::CancelOrder(id) => cancel(turn, user, id, message_id).await,
        Action::CloseMessage => {
            turn.delete(message_id).await;
            Ok(())
        }
        other => {
            debug!(action = %other, "action not handled by rider bot");
            Ok(())
        }
    }
}

/// Whether a wizard button belongs to an earlier or later step than the one
/// the session is on. Prerequisites are checked first, so a lost session
/// still gets the restart prompt instead.
fn out_of_step(turn: &mut Turn<'_>, user: &User, expected: WizardState) -> bool {
    let state = turn.session(user).state;
    if state == expected {
        return false;
    }
    debug!(?state, ?expected, "ignoring out-of-step wizard button");
    true
}

/// Riders must have shared a phone number before ordering.
async fn ensure_ready(turn: &mut Turn<'_>, user: &User) -> Result<bool, IntercabError> {
    if user.phone.is_some() && user.status == UserStatus::Active {
        return Ok(true);
    }
    turn.session(user).state = WizardState::AwaitingContact;
    turn.reply(render::request_contact(
        "Please share your phone number before ordering.",
    ))
    .await?;
    Ok(false)
}

async fn new_order(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    if !ensure_ready(turn, user).await? {
        return Ok(());
    }

    let locations = turn.ctx.storage.list_locations().await?;
    if locations.len() < 2 {
        return turn.say("No routes are available yet. Please try later.").await;
    }
    turn.session(user).state = WizardState::AwaitingOrigin;
    turn.reply(
        Notice::text("<b>Where are you leaving from?</b>").with_keyboard(render::location_picker(
            &locations,
            None,
            Action::PickOrigin,
        )),
    )
    .await
}

async fn pick_origin(
    turn: &mut Turn<'_>,
    user: &User,
    origin: LocationId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    if !ensure_ready(turn, user).await? {
        return Ok(());
    }
    match turn.session(user).state {
        WizardState::AwaitingOrigin => {}
        WizardState::Idle => return Err(IntercabError::MissingPrerequisite("order wizard".into())),
        _ => {
            debug!("ignoring out-of-step origin button");
            return Ok(());
        }
    }
    let storage = &turn.ctx.storage;
    storage
        .get_location(origin)
        .await?
        .ok_or_else(|| IntercabError::not_found("location", origin))?;
    let locations = storage.list_locations().await?;

    {
        let session = turn.session(user);
        session.reset();
        session.draft.origin_id = Some(origin);
        session.state = WizardState::AwaitingDestination;
    }
    turn.delete(message_id).await;
    turn.reply(
        Notice::text("<b>Where are you going?</b>").with_keyboard(render::location_picker(
            &locations,
            Some(origin),
            Action::PickDestination,
        )),
    )
    .await
}

async fn pick_destination(
    turn: &mut Turn<'_>,
    user: &User,
    destination: LocationId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let origin = turn.session(user).draft.require_origin()?;
    if out_of_step(turn, user, WizardState::AwaitingDestination) {
        return Ok(());
    }
    if origin == destination {
        return turn.say("Destination must differ from the origin.").await;
    }
    let storage = &turn.ctx.storage;
    storage
        .get_location(destination)
        .await?
        .ok_or_else(|| IntercabError::not_found("location", destination))?;
    let tariffs = storage.list_tariffs().await?;
    if tariffs.is_empty() {
        return turn.say("No fare classes are available yet. Please try later.").await;
    }

    {
        let session = turn.session(user);
        session.draft.destination_id = Some(destination);
        session.state = WizardState::AwaitingTariff;
    }
    turn.delete(message_id).await;
    turn.reply(Notice::text("<b>Choose a fare class</b>").with_keyboard(render::tariff_picker(&tariffs)))
        .await
}

async fn pick_tariff(
    turn: &mut Turn<'_>,
    user: &User,
    tariff: TariffId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    turn.session(user).draft.require_corridor()?;
    if out_of_step(turn, user, WizardState::AwaitingTariff) {
        return Ok(());
    }
    turn.ctx
        .storage
        .get_tariff(tariff)
        .await?
        .ok_or_else(|| IntercabError::not_found("tariff", tariff))?;

    {
        let session = turn.session(user);
        session.draft.tariff_id = Some(tariff);
        session.state = WizardState::AwaitingDate;
    }
    let dates = turn.ctx.upcoming_dates(7);
    turn.delete(message_id).await;
    turn.reply(
        Notice::text("<b>When do you need the ride?</b>")
            .with_keyboard(render::date_picker(&dates, Action::PickDate)),
    )
    .await
}

/// Hours still bookable on `date`, in local time.
fn bookable_hours(turn: &Turn<'_>, date: chrono::NaiveDate) -> Vec<u32> {
    let config = turn.ctx.dispatch();
    let now_local = Utc::now().with_timezone(&turn.ctx.offset());
    (config.earliest_hour..=config.latest_hour.min(23))
        .filter(|h| date > now_local.date_naive() || *h > now_local.hour())
        .collect()
}

async fn pick_date(
    turn: &mut Turn<'_>,
    user: &User,
    date: chrono::NaiveDate,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    turn.session(user).draft.require_tariff()?;
    if out_of_step(turn, user, WizardState::AwaitingDate) {
        return Ok(());
    }
    if !turn.ctx.upcoming_dates(7).contains(&date) {
        return turn.say("Please pick one of the offered dates.").await;
    }
    let hours = bookable_hours(turn, date);
    if hours.is_empty() {
        return turn.say("No more departures on that day. Please pick another date.").await;
    }

    {
        let session = turn.session(user);
        session.draft.date = Some(date);
        session.state = WizardState::AwaitingHour;
    }
    turn.delete(message_id).await;
    turn.reply(
        Notice::text(format!("<b>Pickup time on {}</b>", date.format("%d.%m.%Y")))
            .with_keyboard(render::hour_picker(hours)),
    )
    .await
}

async fn pick_hour(
    turn: &mut Turn<'_>,
    user: &User,
    hour: u32,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let date = turn.session(user).draft.require_date()?;
    if out_of_step(turn, user, WizardState::AwaitingHour) {
        return Ok(());
    }
    if !bookable_hours(turn, date).contains(&hour) {
        return turn.say("That time is not available. Please pick another hour.").await;
    }
    let pickup = turn
        .ctx
        .pickup_at(date, hour)
        .ok_or_else(|| IntercabError::Validation(format!("invalid pickup hour {hour}")))?;

    {
        let session = turn.session(user);
        session.draft.pickup_time = Some(pickup);
        session.state = WizardState::AwaitingPassengers;
    }
    turn.delete(message_id).await;
    turn.reply(
        Notice::text(format!(
            "<b>How many passengers?</b>\nTap a button or send a number up to {}.",
            turn.ctx.dispatch().max_passengers
        ))
        .with_keyboard(render::passenger_picker()),
    )
    .await
}

async fn pick_passengers(
    turn: &mut Turn<'_>,
    user: &User,
    passengers: u32,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    turn.session(user).draft.require_pickup()?;
    if out_of_step(turn, user, WizardState::AwaitingPassengers) {
        return Ok(());
    }
    let max = turn.ctx.dispatch().max_passengers;
    if passengers == 0 || passengers > max {
        return turn
            .say(format!("Please send a number from 1 to {max}."))
            .await;
    }

    {
        let session = turn.session(user);
        session.draft.passengers = Some(passengers);
        session.state = WizardState::AwaitingPrice;
    }
    turn.delete(message_id).await;
    turn.reply(
        Notice::text(format!(
            "<b>What price do you offer?</b>\nSend a whole number in {}.",
            render::escape(&turn.ctx.dispatch().currency)
        ))
        .with_keyboard(Keyboard::Remove),
    )
    .await
}

async fn enter_price(turn: &mut Turn<'_>, user: &User, text: &str) -> Result<(), IntercabError> {
    let draft = turn.session(user).draft.clone();
    let passengers = draft.require_passengers()?;
    let price = match text.replace(' ', "").parse::<i64>() {
        Ok(p) if p > 0 => p,
        _ => return turn.say("Please send the price as a positive whole number.").await,
    };
    let (origin_id, destination_id) = draft.require_corridor()?;
    let tariff_id = draft.require_tariff()?;
    let pickup = draft.require_pickup()?;

    let storage = &turn.ctx.storage;
    let origin = storage
        .get_location(origin_id)
        .await?
        .ok_or_else(|| IntercabError::not_found("location", origin_id))?;
    let destination = storage
        .get_location(destination_id)
        .await?
        .ok_or_else(|| IntercabError::not_found("location", destination_id))?;
    let tariff = storage
        .get_tariff(tariff_id)
        .await?
        .ok_or_else(|| IntercabError::not_found("tariff", tariff_id))?;

    {
        let session = turn.session(user);
        session.draft.price = Some(price);
        session.state = WizardState::AwaitingConfirmation;
    }
    let config = turn.ctx.dispatch();
    turn.reply(render::draft_summary(
        &origin.name,
        &destination.name,
        &tariff.name,
        pickup,
        passengers,
        price,
        &config.currency,
        turn.ctx.offset(),
    ))
    .await
}

async fn confirm(turn: &mut Turn<'_>, user: &User, message_id: Option<&str>) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let new_order = turn
        .session(user)
        .draft
        .to_new_order(user, &ctx.dispatch().currency)?;
    let order = approval::submit_order(ctx, &new_order).await?;

    turn.session(user).reset();
    turn.delete(message_id).await;
    turn.reply(render::order_submitted(&order)).await
}

async fn cancel(
    turn: &mut Turn<'_>,
    user: &User,
    order_id: OrderId,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let order = trips::cancel_by_rider(turn.ctx, order_id, user.id).await?;
    turn.delete(message_id).await;
    turn.reply(render::order_cancelled_for_rider(&order)).await
}

async fn my_orders(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    let storage = &turn.ctx.storage;
    let stats = storage.rider_stats(user.id).await?;
    let orders = storage.orders_by_rider(user.id).await?;

    if orders.is_empty() {
        return turn
            .reply(
                Notice::text(format!(
                    "{}\nYou have no orders yet.",
                    render::rider_stats_header(&stats)
                ))
                .with_keyboard(render::rider_menu()),
            )
            .await;
    }

    turn.say(render::rider_stats_header(&stats)).await?;
    let offset = turn.ctx.offset();
    for order in orders.iter().take(ORDER_HISTORY) {
        let notice = Notice::text(render::order_with_status(order, offset));
        let notice = match render::rider_order_controls(order) {
            Some(kb) => notice.with_keyboard(kb),
            None => notice,
        };
        turn.reply(notice).await?;
    }
    Ok(())
}
