// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch engine and role conversations for intercab.
//!
//! The engine is organised around three concerns:
//! - Order flow: submission and operator approval ([`approval`]), broadcast
//!   and claims ([`dispatcher`]), trip progress and cancellation ([`trips`]),
//!   and payment callbacks ([`payments`]). Every status change goes through
//!   a guarded store transition, so concurrent actors resolve by first writer.
//! - Notification: the [`PeerRouter`] lets any role reach another role's bot
//!   without holding a reference to it.
//! - Conversation: one [`RoleLoop`] per bot feeds inbound events to the
//!   rider, driver and operator [`handlers`] against an in-memory
//!   [`SessionStore`].

pub mod approval;
pub mod context;
pub mod debounce;
pub mod dispatcher;
pub mod handlers;
pub mod matching;
pub mod payments;
pub mod render;
pub mod role_loop;
pub mod router;
pub mod session;
pub mod shutdown;
pub mod trips;

#[cfg(test)]
mod testing;

pub use context::{DispatchContext, DispatchSettings};
pub use payments::{PaymentOutcome, apply_payment_status};
pub use role_loop::RoleLoop;
pub use router::{DeliveryFailure, PeerRouter};
pub use session::SessionStore;
pub use shutdown::install_signal_handler;
