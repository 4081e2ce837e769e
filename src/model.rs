use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unit for every duration rule.
pub type Minutes = i64;

/// Half-open wall-clock interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeSlot {
    /// `None` unless `end` is strictly after `start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_minutes(&self) -> Minutes {
        (self.end - self.start).num_minutes().max(0)
    }

    /// Back-to-back slots (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// `HH:MM` wall-clock encoding. Also accepts `HH:MM:SS` on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
    }
}

/// Physical room: building, floor, room number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub building: String,
    pub floor: String,
    pub room: String,
}

impl Location {
    pub fn new(building: impl Into<String>, floor: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            building: building.into(),
            floor: floor.into(),
            room: room.into(),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}F {}", self.building, self.floor, self.room)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    /// Withdrawn by the requester. Terminal.
    Cancelled,
    /// Soft-deleted by an administrator. Terminal.
    Deleted,
}

impl Status {
    /// Pending or approved: counts toward quotas and shows in active views.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Pending | Status::Approved)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Cancelled => "cancelled",
            Status::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccompanyingStudent {
    pub student_id: String,
    pub name: String,
}

/// Everything about a reservation that an administrator may rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub purpose: String,
    /// Informational; not required to match `accompanying_students.len()`.
    #[serde(default)]
    pub accompanying_count: u32,
    #[serde(default)]
    pub accompanying_students: Vec<AccompanyingStudent>,
}

impl ReservationDetails {
    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::new(self.start_time, self.end_time)
    }

    pub fn duration_minutes(&self) -> Minutes {
        (self.end_time - self.start_time).num_minutes().max(0)
    }
}

/// A booking request as it arrives from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub requester: String,
    #[serde(flatten)]
    pub details: ReservationDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub requester: String,
    #[serde(flatten)]
    pub details: ReservationDetails,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl Reservation {
    pub fn new(id: Ulid, requester: String, details: ReservationDetails) -> Self {
        Self {
            id,
            requester,
            details,
            status: Status::Pending,
            cancellation_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn duration_minutes(&self) -> Minutes {
        self.details.duration_minutes()
    }

    /// Same room, same date, same start time.
    pub fn occupies(&self, location: &Location, date: NaiveDate, start: NaiveTime) -> bool {
        self.details.date == date && self.details.start_time == start && self.details.location == *location
    }

    pub fn belongs_to(&self, requester: &str) -> bool {
        same_requester(&self.requester, requester)
    }

    /// `[room, date] start~end`, used in notification text.
    pub fn summary(&self) -> String {
        let d = &self.details;
        format!(
            "[{}, {}] {}~{}",
            d.location.room,
            d.date,
            d.start_time.format("%H:%M"),
            d.end_time.format("%H:%M")
        )
    }
}

/// Requester ids compare trimmed and case-insensitively.
pub fn requester_key(requester: &str) -> String {
    requester.trim().to_lowercase()
}

pub fn same_requester(a: &str, b: &str) -> bool {
    requester_key(a) == requester_key(b)
}

// ── Query result types ───────────────────────────────────────────

pub const GRID_DAYS: usize = 7;
pub const GRID_SLOTS: usize = 13;
pub const GRID_FIRST_HOUR: u32 = 9;

/// Seven days × thirteen hourly slots (09:00 through 21:00).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekGrid {
    pub start: NaiveDate,
    /// `cells[day][slot]`: day 0 is `start`, slot 0 starts at 09:00.
    pub cells: Vec<Vec<Vec<Reservation>>>,
}

impl WeekGrid {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            cells: vec![vec![Vec::new(); GRID_SLOTS]; GRID_DAYS],
        }
    }

    /// Places a reservation by date and start hour. Returns false if it falls outside the grid.
    pub fn place(&mut self, reservation: Reservation) -> bool {
        let day = reservation.details.date.signed_duration_since(self.start).num_days();
        let slot = i64::from(reservation.details.start_time.hour()) - i64::from(GRID_FIRST_HOUR);
        if !(0..GRID_DAYS as i64).contains(&day) || !(0..GRID_SLOTS as i64).contains(&slot) {
            return false;
        }
        self.cells[day as usize][slot as usize].push(reservation);
        true
    }

    pub fn cell(&self, day: usize, slot: usize) -> &[Reservation] {
        self.cells
            .get(day)
            .and_then(|d| d.get(slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.cells.iter().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
