use chrono::NaiveDate;

use crate::model::{Minutes, ReservationDetails};

/// Rolling quota window: today plus the next six days.
pub const QUOTA_WINDOW_DAYS: i64 = 7;

/// Max active reservations per requester inside the quota window.
pub const MAX_ACTIVE_IN_WINDOW: usize = 5;

/// Keywords in `purpose` that make a request yield to professor bookings.
pub const PRIORITY_PURPOSES: [&str; 2] = ["seminar", "makeup-class"];

/// Who is asking, derived from the first character of the requester id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Professor,
}

impl Role {
    /// `s…` → student, `p…` → professor, case-insensitive after trimming.
    pub fn from_requester(requester: &str) -> Option<Role> {
        match requester.trim().chars().next()?.to_ascii_lowercase() {
            's' => Some(Role::Student),
            'p' => Some(Role::Professor),
            _ => None,
        }
    }

    pub fn max_booking_minutes(self) -> Minutes {
        match self {
            Role::Student => 120,
            Role::Professor => 180,
        }
    }

    /// Same numeric limit as a single booking, summed over one date.
    pub fn daily_budget_minutes(self) -> Minutes {
        self.max_booking_minutes()
    }

    pub fn requires_lead_day(self) -> bool {
        matches!(self, Role::Student)
    }

    /// Per-role admission rules. Checks run in order: lead time, time order, duration.
    pub fn validate(self, details: &ReservationDetails, today: NaiveDate) -> Result<(), PolicyViolation> {
        if self.requires_lead_day() && details.date <= today {
            return Err(PolicyViolation::LeadTime);
        }
        if details.end_time <= details.start_time {
            return Err(PolicyViolation::EndNotAfterStart);
        }
        if details.duration_minutes() > self.max_booking_minutes() {
            return Err(PolicyViolation::TooLong(self));
        }
        Ok(())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Professor => f.write_str("professor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    LeadTime,
    EndNotAfterStart,
    TooLong(Role),
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyViolation::LeadTime => f.write_str("students must book at least one day ahead"),
            PolicyViolation::EndNotAfterStart => f.write_str("end time must be after start time"),
            PolicyViolation::TooLong(Role::Student) => f.write_str("students may book at most 2 hours"),
            PolicyViolation::TooLong(Role::Professor) => f.write_str("professors may book at most 3 hours"),
        }
    }
}

/// `ceil(capacity * 0.5)`; `None` when the room has no declared capacity.
pub fn admission_limit(capacity: u32) -> Option<u32> {
    (capacity > 0).then(|| capacity.div_ceil(2))
}

pub fn is_priority_purpose(purpose: &str) -> bool {
    let lower = purpose.to_lowercase();
    PRIORITY_PURPOSES.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;

    #[test]
    fn role_from_prefix() {
        assert_eq!(Role::from_requester("s2021001"), Some(Role::Student));
        assert_eq!(Role::from_requester("S2021001"), Some(Role::Student));
        assert_eq!(Role::from_requester("  p77 "), Some(Role::Professor));
        assert_eq!(Role::from_requester("a123"), None);
        assert_eq!(Role::from_requester(""), None);
        assert_eq!(Role::from_requester("   "), None);
    }

    #[test]
    fn student_must_book_a_day_ahead() {
        let today = date("2025-01-10");
        let same_day = details(room("911"), "2025-01-10", "10:00", "11:00");
        let err = Role::Student.validate(&same_day, today).unwrap_err();
        assert_eq!(err, PolicyViolation::LeadTime);
        assert!(err.to_string().contains("at least one day ahead"));

        let tomorrow = details(room("911"), "2025-01-11", "10:00", "11:00");
        assert!(Role::Student.validate(&tomorrow, today).is_ok());
    }

    #[test]
    fn professor_may_book_same_day() {
        let today = date("2025-01-10");
        let same_day = details(room("911"), "2025-01-10", "10:00", "13:00");
        assert!(Role::Professor.validate(&same_day, today).is_ok());
    }

    #[test]
    fn duration_caps_per_role() {
        let today = date("2025-01-01");
        let long = details(room("911"), "2025-01-10", "10:00", "12:01");
        assert_eq!(
            Role::Student.validate(&long, today),
            Err(PolicyViolation::TooLong(Role::Student))
        );
        assert!(Role::Professor.validate(&long, today).is_ok());

        let longer = details(room("911"), "2025-01-10", "10:00", "13:01");
        let err = Role::Professor.validate(&longer, today).unwrap_err();
        assert!(err.to_string().contains("at most 3 hours"));

        let exact = details(room("911"), "2025-01-10", "10:00", "12:00");
        assert!(Role::Student.validate(&exact, today).is_ok());
    }

    #[test]
    fn end_must_follow_start() {
        let today = date("2025-01-01");
        let inverted = details(room("911"), "2025-01-10", "11:00", "10:00");
        assert_eq!(
            Role::Professor.validate(&inverted, today),
            Err(PolicyViolation::EndNotAfterStart)
        );
        let empty = details(room("911"), "2025-01-10", "11:00", "11:00");
        assert_eq!(
            Role::Student.validate(&empty, today),
            Err(PolicyViolation::EndNotAfterStart)
        );
    }

    #[test]
    fn lead_time_checked_before_time_order() {
        let today = date("2025-01-10");
        let both_bad = details(room("911"), "2025-01-09", "11:00", "10:00");
        assert_eq!(Role::Student.validate(&both_bad, today), Err(PolicyViolation::LeadTime));
    }

    #[test]
    fn admission_limit_rounds_up() {
        assert_eq!(admission_limit(0), None);
        assert_eq!(admission_limit(1), Some(1));
        assert_eq!(admission_limit(3), Some(2));
        assert_eq!(admission_limit(4), Some(2));
        assert_eq!(admission_limit(41), Some(21));
    }

    #[test]
    fn priority_purpose_detection() {
        assert!(is_priority_purpose("Seminar on graphs"));
        assert!(is_priority_purpose("network MAKEUP-CLASS"));
        assert!(!is_priority_purpose("makeup class"));
        assert!(!is_priority_purpose(""));
        assert!(!is_priority_purpose("team project"));
    }
}
