// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver trip progress, driver release and rider cancellation.

use tracing::info;

use intercab_core::error::IntercabError;
use intercab_core::lifecycle::OrderTransition;
use intercab_core::types::{Order, OrderId, Role, UserId};

use crate::context::DispatchContext;
use crate::dispatcher::{self, load};
use crate::render;

/// Applies one driver-reported trip step and tells the rider.
///
/// `step` must be one of the trip-progress transitions; each is guarded on
/// its own predecessor status and on the assigned driver, so steps can be
/// neither skipped nor reported by another driver.
pub async fn advance(
    ctx: &DispatchContext,
    order_id: OrderId,
    step: OrderTransition,
) -> Result<Order, IntercabError> {
    if step.stamp().is_none() || step.driver_guard().is_none() {
        return Err(IntercabError::Validation(format!(
            "{step:?} is not a trip step"
        )));
    }
    ctx.storage.transition_order(order_id, step).await?;

    let order = load(ctx, order_id).await?;
    info!(order_id, status = %order.status, "trip progressed");
    ctx.notifier
        .notify_user(Role::Rider, order.rider_id, render::trip_step_for_rider(&order))
        .await;
    Ok(order)
}

/// `taken → active`: the assigned driver hands the order back to the pool.
pub async fn release(
    ctx: &DispatchContext,
    order_id: OrderId,
    driver_id: UserId,
) -> Result<Order, IntercabError> {
    ctx.storage
        .transition_order(order_id, OrderTransition::Release { driver_id })
        .await?;
    info!(order_id, driver_id, "order released by driver");

    let order = dispatcher::rebroadcast(ctx, order_id).await?;
    ctx.notifier
        .notify_user(Role::Rider, order.rider_id, render::order_released_for_rider(&order))
        .await;
    Ok(order)
}

/// Rider cancellation from the status the rider last observed.
///
/// The assigned driver, if any, is notified. Operators are not: an order that
/// was awaiting match confirmation simply fails their later action.
pub async fn cancel_by_rider(
    ctx: &DispatchContext,
    order_id: OrderId,
    rider_id: UserId,
) -> Result<Order, IntercabError> {
    let observed = load(ctx, order_id).await?;
    if observed.rider_id != rider_id {
        return Err(IntercabError::not_found("order", order_id));
    }
    // The order moved past the cancellable window while the button was shown.
    if !observed.status.is_cancellable_by_rider() {
        return Err(IntercabError::Contention {
            order_id,
            expected: observed.status,
        });
    }

    ctx.storage
        .transition_order(
            order_id,
            OrderTransition::Cancel {
                from: observed.status,
            },
        )
        .await?;
    info!(order_id, from = %observed.status, "order cancelled by rider");

    let order = load(ctx, order_id).await?;
    if let Some(driver_id) = order.driver_id {
        ctx.notifier
            .notify_user(Role::Driver, driver_id, render::order_cancelled_for_driver(&order))
            .await;
    }
    Ok(order)
}
