mod error;
mod guard;
mod lectures;
mod lifecycle;
mod mutations;
mod queries;

pub use error::{EngineError, StatusCode};
pub use guard::Stage;
pub use lifecycle::Transition;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::capacity::RoomCapacityTable;
use crate::clock::{Clock, SystemClock};
use crate::lecture::LectureSchedule;
use crate::notify::{Notification, NotificationSink};
use crate::store::ReservationStore;

/// Booking engine: admission pipeline, lifecycle, and queries over one store, plus the
/// lecture timetable.
///
/// Every operation that reads then writes holds the store lock for its whole duration,
/// so concurrent requests are serialized against the same snapshot.
pub struct Engine {
    store: Arc<ReservationStore>,
    capacity: Arc<RoomCapacityTable>,
    notify: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    lectures: Arc<LectureSchedule>,
}

impl Engine {
    pub fn new(
        store: Arc<ReservationStore>,
        capacity: Arc<RoomCapacityTable>,
        notify: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_clock(store, capacity, notify, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<ReservationStore>,
        capacity: Arc<RoomCapacityTable>,
        notify: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            capacity,
            notify,
            clock,
            lectures: Arc::new(LectureSchedule::in_memory()),
        }
    }

    /// Replace the default in-memory timetable.
    pub fn with_lectures(mut self, lectures: Arc<LectureSchedule>) -> Self {
        self.lectures = lectures;
        self
    }

    pub fn store(&self) -> &ReservationStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fire-and-forget. Blank requesters are skipped.
    fn notify_requester(&self, requester: &str, notification: Notification) {
        if requester.trim().is_empty() {
            debug!("skipping notification '{}': no requester", notification.title);
            return;
        }
        self.notify.notify(requester, notification);
    }
}
