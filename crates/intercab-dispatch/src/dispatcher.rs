// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch engine: claim offers and first-writer-wins claims.

use tracing::{debug, info, warn};

use intercab_core::error::IntercabError;
use intercab_core::lifecycle::OrderTransition;
use intercab_core::types::{Order, OrderId, OrderStatus, Role, User, UserStatus};

use crate::approval;
use crate::context::DispatchContext;
use crate::matching;
use crate::render;

/// Offers an `active` order to its current candidate set.
///
/// The candidate set is computed from scratch on every call. Returns the
/// number of drivers the offer was delivered to.
pub async fn broadcast_order(ctx: &DispatchContext, order: &Order) -> Result<usize, IntercabError> {
    let candidates = matching::candidate_drivers(ctx.storage.as_ref(), order).await?;
    if candidates.is_empty() {
        info!(order_id = order.id, "no candidate drivers for order");
        return Ok(0);
    }
    let notice = render::claim_offer(order, ctx.offset());
    let delivered = ctx.notifier.broadcast(Role::Driver, &candidates, notice).await;
    info!(
        order_id = order.id,
        candidates = candidates.len(),
        delivered,
        "order broadcast"
    );
    Ok(delivered)
}

/// Claims an `active` order for `driver`.
///
/// Exactly one concurrent claim succeeds; the others get
/// [`IntercabError::Contention`]. On success every operator is asked to
/// confirm the match. The claim stands even when that prompt fails.
pub async fn claim(
    ctx: &DispatchContext,
    order_id: OrderId,
    driver: &User,
) -> Result<Order, IntercabError> {
    if driver.role != Role::Driver || driver.status != UserStatus::Active {
        return Err(IntercabError::Validation(format!(
            "user {} may not claim orders",
            driver.id
        )));
    }

    if let Err(e) = ctx
        .storage
        .transition_order(
            order_id,
            OrderTransition::Claim {
                driver_id: driver.id,
            },
        )
        .await
    {
        if e.is_contention() {
            debug!(order_id, driver_id = driver.id, "claim lost the race");
        }
        return Err(e);
    }
    info!(order_id, driver_id = driver.id, "order claimed");

    let order = load(ctx, order_id).await?;
    let profile = match ctx.storage.get_driver_profile(driver.id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(
                order_id,
                driver_id = driver.id,
                error = %e,
                "driver profile unavailable for match prompt"
            );
            None
        }
    };
    let prompt = render::match_approval_prompt(&order, driver, profile.as_ref(), ctx.offset());
    if let Err(e) = approval::prompt_operators(ctx, prompt).await {
        warn!(order_id, error = %e, "failed to prompt operators for match");
    }
    Ok(order)
}

/// Offers an order after its transition has committed. A failed offer is
/// logged and leaves the order in the pool.
pub(crate) async fn offer(ctx: &DispatchContext, order: &Order) {
    if let Err(e) = broadcast_order(ctx, order).await {
        warn!(order_id = order.id, error = %e, "broadcast failed");
    }
}

/// Re-offers an order that just returned to the pool.
pub(crate) async fn rebroadcast(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    let order = load(ctx, order_id).await?;
    if order.status == OrderStatus::Active {
        offer(ctx, &order).await;
    }
    Ok(order)
}

pub(crate) async fn load(ctx: &DispatchContext, order_id: OrderId) -> Result<Order, IntercabError> {
    ctx.storage
        .get_order(order_id)
        .await?
        .ok_or_else(|| IntercabError::not_found("order", order_id))
}
