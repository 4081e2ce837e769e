use ulid::Ulid;

use crate::model::Status;
use crate::policy::{PolicyViolation, Role};
use crate::store::StoreError;

/// Outcome class of a request. Numeric values follow HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    Conflict = 409,
    Internal = 500,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

#[derive(Debug)]
pub enum EngineError {
    InvalidInput(String),
    LimitExceeded(&'static str),
    UnknownRole(String),
    Policy(PolicyViolation),
    CapacityExceeded { capacity: u32, limit: u32 },
    DailyBudgetExceeded(Role),
    WeeklyQuotaExceeded(usize),
    ProfessorPriority(Ulid),
    NotOwner(Ulid),
    NotFound(Ulid),
    SlotTaken(Ulid),
    AlreadyApproved(Ulid),
    AlreadyCancelled(Ulid),
    InvalidTransition { id: Ulid, from: Status, to: Status },
    Terminal { id: Ulid, status: Status },
    LectureNotFound(String),
    LectureOverlap { id: String, existing: String },
    Storage(String),
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::InvalidInput(_) | EngineError::LimitExceeded(_) | EngineError::UnknownRole(_) => {
                StatusCode::BadRequest
            }
            EngineError::Policy(_)
            | EngineError::CapacityExceeded { .. }
            | EngineError::DailyBudgetExceeded(_)
            | EngineError::WeeklyQuotaExceeded(_)
            | EngineError::ProfessorPriority(_)
            | EngineError::NotOwner(_) => StatusCode::Forbidden,
            EngineError::NotFound(_) | EngineError::LectureNotFound(_) => StatusCode::NotFound,
            EngineError::SlotTaken(_)
            | EngineError::AlreadyApproved(_)
            | EngineError::AlreadyCancelled(_)
            | EngineError::InvalidTransition { .. }
            | EngineError::Terminal { .. }
            | EngineError::LectureOverlap { .. } => StatusCode::Conflict,
            EngineError::Storage(_) => StatusCode::Internal,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::UnknownRole(requester) => {
                write!(f, "unrecognized requester id {requester:?}: must start with 's' or 'p'")
            }
            EngineError::Policy(v) => write!(f, "{v}"),
            EngineError::CapacityExceeded { capacity, limit } => {
                write!(f, "capacity 50% exceeded: room seats {capacity}, at most {limit} reservations per slot")
            }
            EngineError::DailyBudgetExceeded(role) => write!(
                f,
                "daily limit exceeded: {role}s may book at most {} minutes per day",
                role.daily_budget_minutes()
            ),
            EngineError::WeeklyQuotaExceeded(n) => {
                write!(f, "weekly quota exceeded: already {n} active reservations in the next 7 days")
            }
            EngineError::ProfessorPriority(id) => {
                write!(f, "slot reserved by a professor ({id}); seminars and makeup classes yield")
            }
            EngineError::NotOwner(id) => write!(f, "reservation {id} belongs to another requester"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::SlotTaken(id) => {
                write!(f, "you already hold reservation {id} at this date and start time")
            }
            EngineError::AlreadyApproved(id) => write!(f, "reservation {id} is already approved"),
            EngineError::AlreadyCancelled(id) => write!(f, "reservation {id} is already cancelled"),
            EngineError::InvalidTransition { id, from, to } => {
                write!(f, "reservation {id} cannot move from {from} to {to}")
            }
            EngineError::Terminal { id, status } => {
                write!(f, "reservation {id} is {status} and can no longer be changed")
            }
            EngineError::LectureNotFound(id) => write!(f, "lecture not found: {id}"),
            EngineError::LectureOverlap { id, existing } => {
                write!(f, "lecture {id} overlaps lecture {existing} in the same room, day and term")
            }
            EngineError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Storage(e.to_string())
    }
}
