// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for intercab.
//!
//! Serves a read-only view of the dispatch state (active orders, locations)
//! and receives payment provider callbacks. A settled payment publishes its
//! order through the same guarded transition the operator approval uses, so
//! the gateway and the bots never race each other into a double broadcast.

pub mod handlers;
pub mod server;
pub mod signature;

pub use handlers::OrderView;
pub use server::{GatewayState, router, start_server};
