// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared handles every dispatch operation runs against.
//!
//! A [`DispatchContext`] is cheap to clone and is handed to each role loop and
//! to the HTTP gateway. It carries the store, the notification capability and
//! the tuning knobs, plus the conversion between the service's local clock and
//! the UTC timestamps kept in the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use intercab_config::model::{DispatchConfig, OperatorConfig};
use intercab_core::{Notifier, StorageAdapter};

/// Store, notifier and settings shared by all roles.
#[derive(Clone)]
pub struct DispatchContext {
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<DispatchSettings>,
}

/// The configuration slices the dispatch engine reads.
#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    pub dispatch: DispatchConfig,
    pub operator: OperatorConfig,
}

impl DispatchContext {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        notifier: Arc<dyn Notifier>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            storage,
            notifier,
            settings: Arc::new(settings),
        }
    }

    pub fn dispatch(&self) -> &DispatchConfig {
        &self.settings.dispatch
    }

    pub fn operator(&self) -> &OperatorConfig {
        &self.settings.operator
    }

    pub fn order_debounce(&self) -> Duration {
        Duration::from_millis(self.settings.dispatch.order_debounce_ms)
    }

    pub fn contact_debounce(&self) -> Duration {
        Duration::from_millis(self.settings.dispatch.contact_debounce_ms)
    }

    pub fn list_debounce(&self) -> Duration {
        Duration::from_millis(self.settings.dispatch.list_debounce_ms)
    }

    /// The service's local time zone. Falls back to UTC for an out-of-range offset.
    pub fn offset(&self) -> FixedOffset {
        local_offset(self.settings.dispatch.utc_offset_hours)
    }

    /// Today's date on the service's local clock.
    pub fn local_today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset()).date_naive()
    }

    /// Converts a local date and hour into the UTC instant stored on an order.
    pub fn pickup_at(&self, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        self.offset()
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
    }

    /// The UTC half-open interval covering one local calendar day.
    pub fn local_day_bounds(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.pickup_at(date, 0)?;
        let next = date.checked_add_days(Days::new(1))?;
        let end = self.pickup_at(next, 0)?;
        Some((start, end))
    }

    /// The next `count` local dates starting today.
    pub fn upcoming_dates(&self, count: u64) -> Vec<NaiveDate> {
        let today = self.local_today();
        (0..count)
            .filter_map(|n| today.checked_add_days(Days::new(n)))
            .collect()
    }
}

pub(crate) fn local_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| {
        tracing::warn!(hours, "utc offset out of range, using UTC");
        Utc.fix()
    })
}
