use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::MAX_TEXT_LEN;
use crate::model::*;

use super::guard::{admit, validate_details};
use super::lifecycle::{self, Transition};
use super::{Engine, EngineError};

impl Engine {
    /// Run the admission pipeline and, if every stage passes, store a new pending reservation.
    pub async fn create_reservation(&self, request: BookingRequest) -> Result<Reservation, EngineError> {
        let today = self.today();
        let capacity = self.capacity.capacity(&request.details.location);

        let mut guard = self.store.lock().await;
        if let Err((stage, e)) = admit(guard.records(), &request, capacity, today) {
            metrics::counter!(crate::observability::ADMISSION_REJECTIONS_TOTAL, "stage" => stage.label())
                .increment(1);
            debug!("rejected booking by {} at {} ({}): {e}", request.requester, stage.label(), request.details.location);
            return Err(e);
        }

        let BookingRequest { requester, details } = request;
        let reservation = Reservation::new(Ulid::new(), requester.trim().to_string(), details);
        guard.save(reservation.clone())?;
        drop(guard);

        info!("reservation {} created by {}: {}", reservation.id, reservation.requester, reservation.summary());
        self.notify_requester(&reservation.requester, lifecycle::created_notice(&reservation));
        Ok(reservation)
    }

    /// Requester-initiated cancellation. Only the owner may cancel.
    pub async fn cancel_reservation(
        &self,
        requester: &str,
        id: Ulid,
        reason: Option<String>,
    ) -> Result<Reservation, EngineError> {
        if reason.as_ref().is_some_and(|r| r.len() > MAX_TEXT_LEN) {
            return Err(EngineError::LimitExceeded("cancellation reason too long"));
        }
        let mut guard = self.store.lock().await;
        let current = guard.find_by_id(&id).ok_or(EngineError::NotFound(id))?;
        if !current.belongs_to(requester) {
            warn!("{requester} tried to cancel reservation {id} owned by {}", current.requester);
            return Err(EngineError::NotOwner(id));
        }
        let status = lifecycle::apply(id, current.status, Transition::Cancel)?;

        let mut updated = current.clone();
        updated.status = status;
        updated.cancellation_reason = reason.filter(|r| !r.trim().is_empty());
        guard.save(updated.clone())?;
        drop(guard);

        info!("reservation {id} cancelled by {requester}");
        self.notify_requester(&updated.requester, lifecycle::transition_notice(&updated, Transition::Cancel));
        Ok(updated)
    }

    pub async fn approve_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.transition(id, Transition::Approve).await
    }

    /// Administrative soft delete. The record stays retrievable by id.
    pub async fn delete_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.transition(id, Transition::Delete).await
    }

    async fn transition(&self, id: Ulid, t: Transition) -> Result<Reservation, EngineError> {
        let mut guard = self.store.lock().await;
        let current = guard.find_by_id(&id).ok_or(EngineError::NotFound(id))?;
        let from = current.status;
        let status = lifecycle::apply(id, from, t)?;

        let mut updated = current.clone();
        updated.status = status;
        guard.save(updated.clone())?;
        drop(guard);

        info!("reservation {id}: {from} -> {status}");
        self.notify_requester(&updated.requester, lifecycle::transition_notice(&updated, t));
        Ok(updated)
    }

    /// Administrative rewrite of location, date, times and descriptive fields.
    ///
    /// Keeps id, requester, status and cancellation reason. Does not run the admission pipeline.
    pub async fn modify_reservation(&self, id: Ulid, details: ReservationDetails) -> Result<Reservation, EngineError> {
        validate_details(&details)?;
        if details.slot().is_none() {
            return Err(EngineError::InvalidInput("end time must be after start time".into()));
        }

        let mut guard = self.store.lock().await;
        let current = guard.find_by_id(&id).ok_or(EngineError::NotFound(id))?;
        if current.status.is_terminal() {
            return Err(EngineError::Terminal { id, status: current.status });
        }

        let updated = Reservation {
            details,
            ..current.clone()
        };
        guard.save(updated.clone())?;
        drop(guard);

        info!("reservation {id} modified: {}", updated.summary());
        self.notify_requester(&updated.requester, lifecycle::modified_notice(&updated));
        Ok(updated)
    }
}
