use ulid::Ulid;

use crate::model::{Reservation, Status};
use crate::notify::Notification;

use super::EngineError;

/// Status edges a caller may request after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Cancel,
    Delete,
}

impl Transition {
    pub fn target(self) -> Status {
        match self {
            Transition::Approve => Status::Approved,
            Transition::Cancel => Status::Cancelled,
            Transition::Delete => Status::Deleted,
        }
    }
}

/// Resolve the status after `t`, or the error for an undefined edge.
pub(crate) fn apply(id: Ulid, current: Status, t: Transition) -> Result<Status, EngineError> {
    match (current, t) {
        (Status::Pending, Transition::Approve) => Ok(Status::Approved),
        (Status::Approved, Transition::Approve) => Err(EngineError::AlreadyApproved(id)),
        (Status::Pending | Status::Approved, Transition::Cancel) => Ok(Status::Cancelled),
        (Status::Cancelled, Transition::Cancel) => Err(EngineError::AlreadyCancelled(id)),
        (Status::Pending | Status::Approved, Transition::Delete) => Ok(Status::Deleted),
        (from @ (Status::Cancelled | Status::Deleted), t) => Err(EngineError::InvalidTransition {
            id,
            from,
            to: t.target(),
        }),
    }
}

pub(crate) fn created_notice(r: &Reservation) -> Notification {
    Notification::new(
        "Reservation requested",
        format!("{} has been requested and is awaiting approval.", r.summary()),
    )
}

pub(crate) fn transition_notice(r: &Reservation, t: Transition) -> Notification {
    match t {
        Transition::Approve => Notification::new(
            "Reservation approved",
            format!("{} has been approved.", r.summary()),
        ),
        Transition::Cancel => {
            let reason = r
                .cancellation_reason
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| format!(" Reason: {s}"))
                .unwrap_or_default();
            Notification::new(
                "Reservation cancelled",
                format!("{} has been cancelled.{reason}", r.summary()),
            )
        }
        Transition::Delete => Notification::new(
            "Reservation deleted",
            format!("{} has been removed by an administrator.", r.summary()),
        ),
    }
}

pub(crate) fn modified_notice(r: &Reservation) -> Notification {
    Notification::new(
        "Reservation modified",
        format!("Your reservation has been changed to {}.", r.summary()),
    )
}
