use chrono::{Local, NaiveDate, Utc};

/// Unix milliseconds.
pub type Ms = i64;

/// Source of "today" for lead-time and rolling-window rules.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the server's local timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Pinned date, for tests and replays.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn now_ms() -> Ms {
    Utc::now().timestamp_millis()
}
