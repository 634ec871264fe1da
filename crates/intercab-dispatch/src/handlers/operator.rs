// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator bot: login challenge, approval queues, statistics and catalog
//! management.

use tracing::{debug, info, warn};

use intercab_core::action::Action;
use intercab_core::error::IntercabError;
use intercab_core::types::{Keyboard, Notice, Role, User, UserStatus};

use super::{Event, START_FIRST, Turn, status_refusal};
use crate::approval::{self, Review};
use crate::render::{self, labels};
use crate::session::WizardState;

const NOT_AUTHORIZED: &str = "You are not authorized. Send /start to log in.";

pub async fn handle(turn: &mut Turn<'_>, event: Event) -> Result<(), IntercabError> {
    if event == Event::Start {
        return start(turn).await;
    }

    let Some(user) = turn.current_user().await? else {
        return turn.say(START_FIRST).await;
    };
    if let Some(refusal) = status_refusal(user.status) {
        return turn.say(refusal).await;
    }

    // The challenge runs before the operator gate.
    let state = turn
        .sessions
        .get(Role::Operator, turn.sender.platform_id)
        .filter(|s| s.user_id == user.id)
        .map(|s| s.state)
        .unwrap_or_default();
    if let Event::Text(text) = &event {
        match state {
            WizardState::AwaitingLogin => return enter_login(turn, &user, text).await,
            WizardState::AwaitingPassword => return enter_password(turn, &user, text).await,
            _ => {}
        }
    }

    if user.role != Role::Operator || user.status != UserStatus::Active {
        return turn.say(NOT_AUTHORIZED).await;
    }

    match event {
        Event::Start => start(turn).await,
        Event::Text(text) => text_input(turn, &user, &text).await,
        Event::Action { action, message_id } => {
            on_action(turn, action, message_id.as_deref()).await
        }
        Event::Contact { .. } | Event::WebApp(_) => Ok(()),
    }
}

async fn start(turn: &mut Turn<'_>) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let existing = turn.current_user().await?;

    if let Some(user) = &existing {
        if let Some(refusal) = status_refusal(user.status) {
            return turn.say(refusal).await;
        }
        if user.role == Role::Operator && user.status == UserStatus::Active {
            turn.session(user).reset();
            return show_menu(turn, "Welcome back.").await;
        }
    }

    let user = match existing {
        Some(user) => user,
        None => {
            ctx.storage
                .get_or_create_user(
                    turn.sender.platform_id,
                    turn.sender.username.as_deref(),
                    &turn.sender.full_name,
                    Role::Operator,
                )
                .await?
        }
    };

    if ctx
        .operator()
        .bootstrap_ids
        .contains(&turn.sender.platform_id)
    {
        let user = promote(turn, user).await?;
        turn.session(&user).reset();
        return show_menu(turn, "Operator access granted.").await;
    }

    let operator = ctx.operator();
    if operator.login.is_none() || operator.password.is_none() {
        warn!(
            platform_id = turn.sender.platform_id,
            "operator login attempted but no credentials are configured"
        );
        return turn.say("Operator login is not configured.").await;
    }

    let session = turn.session(&user);
    session.reset();
    session.state = WizardState::AwaitingLogin;
    turn.reply(Notice::text("Enter login:").with_keyboard(Keyboard::Remove))
        .await
}

async fn enter_login(turn: &mut Turn<'_>, user: &User, text: &str) -> Result<(), IntercabError> {
    let session = turn.session(user);
    session.scratch = text.to_string();
    session.state = WizardState::AwaitingPassword;
    turn.say("Enter password:").await
}

async fn enter_password(turn: &mut Turn<'_>, user: &User, text: &str) -> Result<(), IntercabError> {
    // The password should not linger in the chat history.
    let message_id = turn.message_id.to_string();
    turn.delete(Some(&message_id)).await;

    let login = std::mem::take(&mut turn.session(user).scratch);
    let operator = turn.ctx.operator();
    let valid = operator.login.as_deref() == Some(login.as_str())
        && operator.password.as_deref() == Some(text);

    if !valid {
        warn!(platform_id = turn.sender.platform_id, "operator login failed");
        turn.session(user).reset();
        return turn.say("Invalid login or password. Send /start to try again.").await;
    }

    let user = promote(turn, user.clone()).await?;
    turn.session(&user).reset();
    show_menu(turn, "Login successful.").await
}

async fn promote(turn: &Turn<'_>, user: User) -> Result<User, IntercabError> {
    let storage = &turn.ctx.storage;
    if user.role != Role::Operator {
        storage.set_user_role(user.id, Role::Operator).await?;
    }
    if user.status != UserStatus::Active {
        storage.set_user_status(user.id, UserStatus::Active).await?;
    }
    info!(user_id = user.id, "operator access granted");
    Ok(User {
        role: Role::Operator,
        status: UserStatus::Active,
        ..user
    })
}

async fn show_menu(turn: &Turn<'_>, greeting: &str) -> Result<(), IntercabError> {
    turn.reply(Notice::text(greeting).with_keyboard(render::operator_menu()))
        .await
}

async fn text_input(turn: &mut Turn<'_>, user: &User, text: &str) -> Result<(), IntercabError> {
    if render::is_menu_label(text) {
        if turn.repeated_menu(user, text) {
            return Ok(());
        }
        turn.session(user).reset();
        return match text {
            labels::PENDING_ORDERS => pending_orders(turn).await,
            labels::PENDING_DRIVERS => pending_drivers(turn).await,
            labels::STATISTICS => statistics(turn).await,
            labels::LOCATIONS => locations(turn, user).await,
            labels::TARIFFS => tariffs(turn, user).await,
            _ => show_menu(turn, "Choose an option from the menu.").await,
        };
    }

    let state = turn.session(user).state;
    let name = text.trim();
    match state {
        WizardState::AwaitingLocationName if !name.is_empty() => {
            let location = turn.ctx.storage.create_location(name).await?;
            info!(location_id = location.id, name = %location.name, "location added");
            turn.session(user).reset();
            turn.say(format!("Location <b>{}</b> added.", render::escape(&location.name)))
                .await
        }
        WizardState::AwaitingTariffName if !name.is_empty() => {
            let tariff = turn.ctx.storage.create_tariff(name).await?;
            info!(tariff_id = tariff.id, name = %tariff.name, "tariff added");
            turn.session(user).reset();
            turn.say(format!("Tariff <b>{}</b> added.", render::escape(&tariff.name)))
                .await
        }
        _ => show_menu(turn, "Choose an option from the menu.").await,
    }
}

async fn pending_orders(turn: &mut Turn<'_>) -> Result<(), IntercabError> {
    let orders = turn.ctx.storage.pending_orders().await?;
    if orders.is_empty() {
        return turn.say("No orders awaiting approval.").await;
    }
    let offset = turn.ctx.offset();
    for order in &orders {
        turn.reply(render::order_approval_prompt(order, offset)).await?;
    }
    Ok(())
}

async fn pending_drivers(turn: &mut Turn<'_>) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let drivers = ctx
        .storage
        .users_by_role(Role::Driver, Some(UserStatus::PendingReview))
        .await?;
    if drivers.is_empty() {
        return turn.say("No driver applications awaiting review.").await;
    }
    for driver in &drivers {
        let profile = ctx.storage.get_driver_profile(driver.id).await?;
        turn.reply(render::driver_review_prompt(driver, profile.as_ref()))
            .await?;
    }
    Ok(())
}

async fn statistics(turn: &Turn<'_>) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let (day_start, _) = ctx
        .local_day_bounds(ctx.local_today())
        .ok_or_else(|| IntercabError::Internal("local day start out of range".into()))?;
    let users = ctx.storage.user_counts().await?;
    let orders = ctx.storage.order_stats(day_start).await?;
    turn.say(render::statistics(&users, &orders)).await
}

async fn locations(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    let list = turn.ctx.storage.list_locations().await?;
    let mut text = render::name_list("Locations", list.into_iter().map(|l| l.name));
    text.push_str("Send a name to add a location.");
    turn.session(user).state = WizardState::AwaitingLocationName;
    turn.say(text).await
}

async fn tariffs(turn: &mut Turn<'_>, user: &User) -> Result<(), IntercabError> {
    let list = turn.ctx.storage.list_tariffs().await?;
    let mut text = render::name_list("Tariffs", list.into_iter().map(|t| t.name));
    text.push_str("Send a name to add a tariff.");
    turn.session(user).state = WizardState::AwaitingTariffName;
    turn.say(text).await
}

async fn on_action(
    turn: &mut Turn<'_>,
    action: Action,
    message_id: Option<&str>,
) -> Result<(), IntercabError> {
    let ctx = turn.ctx;
    let reply = match action {
        Action::ApproveOrder(id) => {
            approval::approve_order(ctx, id).await?;
            format!("Order #{id} approved and published.")
        }
        Action::RejectOrder(id) => {
            approval::reject_order(ctx, id).await?;
            format!("Order #{id} rejected.")
        }
        Action::ApproveMatch(id) => {
            approval::approve_match(ctx, id).await?;
            format!("Driver confirmed for order #{id}.")
        }
        Action::RejectMatch(id) => {
            approval::reject_match(ctx, id).await?;
            format!("Driver rejected for order #{id}. The order is back in the pool.")
        }
        Action::ApproveDriver(id) => match approval::approve_driver(ctx, id).await? {
            Review::Applied(driver) => format!("Driver {} approved.", render::escape(&driver.display_name())),
            Review::AlreadyHandled => "This application was already handled.".to_string(),
        },
        Action::RejectDriver(id) => match approval::reject_driver(ctx, id).await? {
            Review::Applied(driver) => format!("Driver {} rejected.", render::escape(&driver.display_name())),
            Review::AlreadyHandled => "This application was already handled.".to_string(),
        },
        Action::CloseMessage => {
            turn.delete(message_id).await;
            return Ok(());
        }
        other => {
            debug!(action = %other, "action not handled by operator bot");
            return Ok(());
        }
    };

    turn.delete(message_id).await;
    turn.say(reply).await
}
