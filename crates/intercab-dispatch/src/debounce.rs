// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppression of repeated taps on the same entry point.
//!
//! Platforms redeliver updates and users double-click. Entry points that start
//! a flow or render a long list record when they last ran and ignore an
//! identical trigger that arrives inside a short window.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Entry points that are debounced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    NewOrder,
    Contact,
    OrderList,
    DriverList,
}

/// Last-seen timestamps per entry point for one conversation.
#[derive(Debug, Default, Clone)]
pub struct Debouncer {
    last: HashMap<DebounceKey, Instant>,
}

impl Debouncer {
    /// Records the trigger and returns `true` if it should be ignored because
    /// the same trigger fired less than `window` ago.
    pub fn hit(&mut self, key: DebounceKey, window: Duration) -> bool {
        let now = Instant::now();
        match self.last.get(&key) {
            Some(previous) if now.duration_since(*previous) < window => true,
            _ => {
                self.last.insert(key, now);
                false
            }
        }
    }
}
