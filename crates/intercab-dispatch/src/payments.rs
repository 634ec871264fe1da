// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment status callbacks.
//!
//! A settled payment publishes the order exactly like an operator approval;
//! it reuses the same guarded transition and fan-out.

use tracing::{debug, info};

use intercab_core::error::IntercabError;
use intercab_core::types::{Order, OrderId};

use crate::approval;
use crate::context::DispatchContext;

/// Provider statuses that mean the payment went through.
pub const SETTLED_STATUSES: [&str; 2] = ["Completed", "Authorized"];

/// What a payment callback did.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The order moved `pending → active` and was broadcast.
    Published(Order),
    /// The order was no longer pending (approved by an operator, repeated callback).
    AlreadyHandled,
    /// The status does not settle the payment.
    Ignored,
}

/// Applies a payment status reported for order `order_id`.
pub async fn apply_payment_status(
    ctx: &DispatchContext,
    order_id: OrderId,
    status: &str,
) -> Result<PaymentOutcome, IntercabError> {
    if !SETTLED_STATUSES.contains(&status) {
        debug!(order_id, status, "payment status ignored");
        return Ok(PaymentOutcome::Ignored);
    }

    match approval::publish(ctx, order_id).await {
        Ok(order) => {
            info!(order_id, status, "order published by payment");
            Ok(PaymentOutcome::Published(order))
        }
        Err(e) if e.is_contention() => {
            info!(order_id, status, "payment for an order that is no longer pending");
            Ok(PaymentOutcome::AlreadyHandled)
        }
        Err(e) => Err(e),
    }
}
