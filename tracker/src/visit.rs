//! First-visit-of-the-day detection.
//!
//! [`VisitRecorder`] remembers when the tracker last counted a unique visit.
//! The first event of each device-local calendar day is flagged as unique and
//! the current instant is persisted; later events on the same day are not.
//!
//! The stored instant is read once when the recorder is created and cached in
//! memory. The cache check and the write happen under one lock, so concurrent
//! calls in this process flag at most one event per day. Processes sharing a
//! storage scope can still both flag an event near the same moment; the
//! result is at-least-once-per-day counting.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, Utc};
use tracing::{debug, warn};

use crate::storage::{self, Storage, StorageScope};

/// Storage key holding the last-visit instant.
pub const VISIT_DATE_KEY: &str = "simpleanalytics.visitdate";

/// Tracks the last-visit instant and answers whether a visit is the first today.
pub struct VisitRecorder {
    storage: Arc<dyn Storage>,
    scope: StorageScope,
    last_visit: Mutex<Option<DateTime<Utc>>>,
}

impl VisitRecorder {
    /// Creates a recorder, reading the persisted last-visit instant from `scope`.
    ///
    /// An unreadable stored value is logged and treated as "never visited".
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>, scope: StorageScope) -> Self {
        let stored = storage::read::<DateTime<Utc>>(storage.as_ref(), &scope, VISIT_DATE_KEY);
        let last_visit = match stored {
            Ok(last_visit) => last_visit,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable last visit date");
                None
            }
        };

        debug!(?scope, ?last_visit, "Loaded visit state");

        Self {
            storage,
            scope,
            last_visit: Mutex::new(last_visit),
        }
    }

    /// Returns the cached last-visit instant.
    #[must_use]
    pub fn last_visit(&self) -> Option<DateTime<Utc>> {
        *self.last_visit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if this is the first visit of the current local day.
    ///
    /// When it returns true the current instant is persisted, so the next call
    /// on the same day returns false.
    pub fn is_unique(&self) -> bool {
        self.is_unique_at(Utc::now())
    }

    /// Same as [`is_unique`](Self::is_unique), evaluated at `now`.
    pub fn is_unique_at(&self, now: DateTime<Utc>) -> bool {
        let mut last_visit = self.last_visit.lock().unwrap_or_else(PoisonError::into_inner);

        if last_visit.is_some_and(|last| same_local_day(last, now)) {
            return false;
        }

        *last_visit = Some(now);

        // A failed write still counts the visit; it may be counted again after a restart.
        if let Err(e) = storage::write(self.storage.as_ref(), &self.scope, VISIT_DATE_KEY, &now) {
            warn!(error = %e, "Failed to persist last visit date");
        }

        true
    }
}

/// Compares calendar days in the device's current timezone.
fn same_local_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.with_timezone(&Local).date_naive() == b.with_timezone(&Local).date_naive()
}
