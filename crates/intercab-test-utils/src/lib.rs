// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for intercab integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a messaging platform.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock role bot with message injection and capture
//! - [`TestHarness`] - Temp store, three mock bots and the role loops wired together

pub mod harness;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_channel::{MockChannel, button_from, contact_from, text_from};
