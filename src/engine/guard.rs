use chrono::{Days, NaiveDate};

use crate::limits::*;
use crate::model::*;
use crate::policy::{self, MAX_ACTIVE_IN_WINDOW, QUOTA_WINDOW_DAYS, Role};

use super::EngineError;

/// Admission stages, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Role,
    Policy,
    Capacity,
    DailyBudget,
    WeeklyQuota,
    Clash,
    Priority,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Role => "role",
            Stage::Policy => "policy",
            Stage::Capacity => "capacity",
            Stage::DailyBudget => "daily_budget",
            Stage::WeeklyQuota => "weekly_quota",
            Stage::Clash => "clash",
            Stage::Priority => "priority",
        }
    }
}

/// Run every stage against `records`. The first failure wins.
pub(crate) fn admit(
    records: &[Reservation],
    request: &BookingRequest,
    capacity: u32,
    today: NaiveDate,
) -> Result<Role, (Stage, EngineError)> {
    let details = &request.details;
    let requester = request.requester.as_str();

    validate_requester(requester)
        .and_then(|()| validate_details(details))
        .map_err(|e| (Stage::Input, e))?;
    let role = Role::from_requester(requester)
        .ok_or_else(|| (Stage::Role, EngineError::UnknownRole(requester.trim().to_string())))?;
    role.validate(details, today)
        .map_err(|v| (Stage::Policy, EngineError::Policy(v)))?;
    check_capacity(records, details, capacity).map_err(|e| (Stage::Capacity, e))?;
    check_daily_budget(records, requester, role, details).map_err(|e| (Stage::DailyBudget, e))?;
    check_weekly_quota(records, requester, today).map_err(|e| (Stage::WeeklyQuota, e))?;
    check_no_clash(records, requester, details).map_err(|e| (Stage::Clash, e))?;
    check_professor_priority(records, details).map_err(|e| (Stage::Priority, e))?;
    Ok(role)
}

pub(crate) fn validate_requester(requester: &str) -> Result<(), EngineError> {
    if requester.trim().is_empty() {
        return Err(EngineError::InvalidInput("requester is required".into()));
    }
    if requester.len() > MAX_REQUESTER_LEN {
        return Err(EngineError::LimitExceeded("requester id too long"));
    }
    Ok(())
}

pub(crate) fn validate_location(loc: &Location) -> Result<(), EngineError> {
    for (field, value) in [("building", &loc.building), ("floor", &loc.floor), ("room", &loc.room)] {
        if value.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!("location {field} is required")));
        }
        if value.len() > MAX_LOCATION_FIELD_LEN {
            return Err(EngineError::LimitExceeded("location field too long"));
        }
    }
    Ok(())
}

/// Shape checks shared by create and modify.
pub(crate) fn validate_details(details: &ReservationDetails) -> Result<(), EngineError> {
    validate_location(&details.location)?;
    let optional = [&details.title, &details.description, &details.day_of_week];
    if optional.iter().filter_map(|t| t.as_deref()).any(|t| t.len() > MAX_TEXT_LEN)
        || details.purpose.len() > MAX_TEXT_LEN
    {
        return Err(EngineError::LimitExceeded("text field too long"));
    }
    if details.accompanying_students.len() > MAX_ACCOMPANYING {
        return Err(EngineError::LimitExceeded("too many accompanying students"));
    }
    let oversized = details
        .accompanying_students
        .iter()
        .any(|s| s.student_id.len() > MAX_REQUESTER_LEN || s.name.len() > MAX_TEXT_LEN);
    if oversized {
        return Err(EngineError::LimitExceeded("accompanying student entry too long"));
    }
    Ok(())
}

/// Non-deleted reservations sharing room, date and start time may fill at most half the seats.
pub(crate) fn check_capacity(
    records: &[Reservation],
    details: &ReservationDetails,
    capacity: u32,
) -> Result<(), EngineError> {
    let Some(limit) = policy::admission_limit(capacity) else {
        return Ok(());
    };
    let taken = records
        .iter()
        .filter(|r| r.status != Status::Deleted)
        .filter(|r| r.occupies(&details.location, details.date, details.start_time))
        .count();
    if taken >= limit as usize {
        return Err(EngineError::CapacityExceeded { capacity, limit });
    }
    Ok(())
}

pub(crate) fn check_daily_budget(
    records: &[Reservation],
    requester: &str,
    role: Role,
    details: &ReservationDetails,
) -> Result<(), EngineError> {
    let booked: Minutes = records
        .iter()
        .filter(|r| r.is_active() && r.belongs_to(requester) && r.details.date == details.date)
        .map(Reservation::duration_minutes)
        .sum();
    if booked + details.duration_minutes() > role.daily_budget_minutes() {
        return Err(EngineError::DailyBudgetExceeded(role));
    }
    Ok(())
}

/// Inclusive `[today, today + 6]`.
pub(crate) fn quota_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let last = today
        .checked_add_days(Days::new(QUOTA_WINDOW_DAYS as u64 - 1))
        .unwrap_or(NaiveDate::MAX);
    (today, last)
}

pub(crate) fn check_weekly_quota(
    records: &[Reservation],
    requester: &str,
    today: NaiveDate,
) -> Result<(), EngineError> {
    let (first, last) = quota_window(today);
    let held = records
        .iter()
        .filter(|r| r.is_active() && r.belongs_to(requester))
        .filter(|r| (first..=last).contains(&r.details.date))
        .count();
    if held >= MAX_ACTIVE_IN_WINDOW {
        return Err(EngineError::WeeklyQuotaExceeded(held));
    }
    Ok(())
}

pub(crate) fn check_no_clash(
    records: &[Reservation],
    requester: &str,
    details: &ReservationDetails,
) -> Result<(), EngineError> {
    let clash = records.iter().find(|r| {
        r.is_active()
            && r.belongs_to(requester)
            && r.details.date == details.date
            && r.details.start_time == details.start_time
    });
    match clash {
        Some(r) => Err(EngineError::SlotTaken(r.id)),
        None => Ok(()),
    }
}

/// Seminars and makeup classes may not land on a slot a professor already holds.
pub(crate) fn check_professor_priority(
    records: &[Reservation],
    details: &ReservationDetails,
) -> Result<(), EngineError> {
    if !policy::is_priority_purpose(&details.purpose) {
        return Ok(());
    }
    let held = records.iter().find(|r| {
        r.is_active()
            && r.occupies(&details.location, details.date, details.start_time)
            && Role::from_requester(&r.requester) == Some(Role::Professor)
    });
    match held {
        Some(r) => Err(EngineError::ProfessorPriority(r.id)),
        None => Ok(()),
    }
}
