// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator approval workflow.
//!
//! Every prompt goes to all active operators. The first operator to act wins
//! through the guarded transition; a later action on the same order returns
//! [`IntercabError::Contention`], which the operator sees as "already handled".

use tracing::{info, warn};

use intercab_core::error::IntercabError;
use intercab_core::lifecycle::OrderTransition;
use intercab_core::types::{NewOrder, Notice, Order, OrderId, Role, User, UserId, UserStatus};

use crate::context::DispatchContext;
use crate::dispatcher::{self, load};
use crate::render;

/// Sends `notice` to every active operator. Returns the number reached.
pub async fn prompt_operators(ctx: &DispatchContext, notice: Notice) -> Result<usize, IntercabError> {
    let operators = ctx
        .storage
        .users_by_role(Role::Operator, Some(UserStatus::Active))
        .await?;
    if operators.is_empty() {
        warn!("no active operators to prompt");
        return Ok(0);
    }
    Ok(ctx.notifier.broadcast(Role::Operator, &operators, notice).await)
}

/// Persists a new `pending` order and asks the operators to approve it.
pub async fn submit_order(ctx: &DispatchContext, new: &NewOrder) -> Result<Order, IntercabError> {
    let order = ctx.storage.create_order(new).await?;
    info!(
        order_id = order.id,
        rider_id = order.rider_id,
        "order submitted for approval"
    );
    if let Err(e) = prompt_operators(ctx, render::order_approval_prompt(&order, ctx.offset())).await {
        warn!(order_id = order.id, error = %e, "failed to prompt operators for approval");
    }
    Ok(order)
}

/// `pending → active`, then broadcast to candidate drivers and tell the rider.
pub async fn approve_order(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    publish(ctx, order_id).await
}

/// Shared by operator approval and the payment webhook. Once the order is
/// `active` it stays published even if the driver offer fails.
pub(crate) async fn publish(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    ctx.storage
        .transition_order(order_id, OrderTransition::Publish)
        .await?;
    info!(order_id, "order published");

    let order = load(ctx, order_id).await?;
    dispatcher::offer(ctx, &order).await;
    ctx.notifier
        .notify_user(Role::Rider, order.rider_id, render::order_published(&order))
        .await;
    Ok(order)
}

/// `pending → cancelled_by_admin`, then tell the rider.
pub async fn reject_order(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    ctx.storage
        .transition_order(order_id, OrderTransition::RejectByOperator)
        .await?;
    info!(order_id, "order rejected by operator");

    let order = load(ctx, order_id).await?;
    ctx.notifier
        .notify_user(Role::Rider, order.rider_id, render::order_rejected(&order))
        .await;
    Ok(order)
}

/// `wait_confirm → taken`, then exchange contacts between rider and driver.
pub async fn approve_match(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    ctx.storage
        .transition_order(order_id, OrderTransition::ConfirmMatch)
        .await?;

    let order = load(ctx, order_id).await?;
    info!(order_id, driver_id = ?order.driver_id, "match confirmed");
    if let Err(e) = exchange_contacts(ctx, &order).await {
        warn!(order_id, error = %e, "failed to exchange contacts after match");
    }
    Ok(order)
}

async fn exchange_contacts(ctx: &DispatchContext, order: &Order) -> Result<(), IntercabError> {
    let driver_id = order
        .driver_id
        .ok_or_else(|| IntercabError::Internal(format!("taken order #{} has no driver", order.id)))?;
    let driver = ctx
        .storage
        .get_user(driver_id)
        .await?
        .ok_or_else(|| IntercabError::not_found("driver", driver_id))?;
    let profile = ctx.storage.get_driver_profile(driver_id).await?;

    ctx.notifier
        .notify_user(
            Role::Rider,
            order.rider_id,
            render::match_confirmed_for_rider(order, &driver, profile.as_ref()),
        )
        .await;
    ctx.notifier
        .notify_chat(
            Role::Driver,
            driver.platform_id,
            render::match_confirmed_for_driver(order, ctx.offset()),
        )
        .await;
    Ok(())
}

/// `wait_confirm → active` with the driver cleared, then tell the rejected
/// driver and re-broadcast to the recomputed candidate set.
pub async fn reject_match(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    // The driver reference is cleared by the transition, so read it first.
    let before = load(ctx, order_id).await?;

    ctx.storage
        .transition_order(order_id, OrderTransition::RejectMatch)
        .await?;
    info!(order_id, driver_id = ?before.driver_id, "match rejected");

    if let Some(driver_id) = before.driver_id {
        ctx.notifier
            .notify_user(
                Role::Driver,
                driver_id,
                render::match_rejected_for_driver(&before),
            )
            .await;
    }
    dispatcher::rebroadcast(ctx, order_id).await
}

/// Outcome of a driver application review.
#[derive(Debug, Clone, PartialEq)]
pub enum Review {
    Applied(User),
    /// The application is not awaiting review any more.
    AlreadyHandled,
}

/// Activates a driver awaiting review.
pub async fn approve_driver(ctx: &DispatchContext, user_id: UserId) -> Result<Review, IntercabError> {
    review_driver(ctx, user_id, UserStatus::Active).await
}

/// Rejects a driver awaiting review.
pub async fn reject_driver(ctx: &DispatchContext, user_id: UserId) -> Result<Review, IntercabError> {
    review_driver(ctx, user_id, UserStatus::Rejected).await
}

async fn review_driver(
    ctx: &DispatchContext,
    user_id: UserId,
    decision: UserStatus,
) -> Result<Review, IntercabError> {
    let user = ctx
        .storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| IntercabError::not_found("driver", user_id))?;
    if user.role != Role::Driver || user.status != UserStatus::PendingReview {
        return Ok(Review::AlreadyHandled);
    }

    ctx.storage.set_user_status(user_id, decision).await?;
    info!(driver_id = user_id, status = %decision, "driver application reviewed");

    let notice = if decision == UserStatus::Active {
        render::driver_approved()
    } else {
        render::driver_rejected()
    };
    ctx.notifier
        .notify_chat(Role::Driver, user.platform_id, notice)
        .await;
    Ok(Review::Applied(User {
        status: decision,
        ..user
    }))
}
