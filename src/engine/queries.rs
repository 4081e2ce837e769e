use std::path::Path;

use tracing::error;
use ulid::Ulid;

use crate::model::*;

use super::guard::quota_window;
use super::{Engine, EngineError};

impl Engine {
    /// Any status, including cancelled and deleted.
    pub async fn get_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.store.find_by_id(&id).await.ok_or(EngineError::NotFound(id))
    }

    /// Pending reservations in insertion order.
    pub async fn pending_reservations(&self) -> Vec<Reservation> {
        let guard = self.store.lock().await;
        guard
            .records()
            .iter()
            .filter(|r| r.status == Status::Pending)
            .cloned()
            .collect()
    }

    /// The requester's active reservations dated today through today + 6, by date then start.
    pub async fn reservations_by_requester(&self, requester: &str) -> Vec<Reservation> {
        let (first, last) = quota_window(self.today());
        let guard = self.store.lock().await;
        let mut list: Vec<Reservation> = guard
            .find_by_requester(requester)
            .filter(|r| r.is_active() && (first..=last).contains(&r.details.date))
            .cloned()
            .collect();
        drop(guard);
        list.sort_by_key(|r| (r.details.date, r.details.start_time));
        list
    }

    pub async fn week_by_requester(&self, requester: &str) -> WeekGrid {
        let mut grid = WeekGrid::new(self.today());
        let guard = self.store.lock().await;
        for r in guard.find_by_requester(requester).filter(|r| r.is_active()) {
            grid.place(r.clone());
        }
        grid
    }

    pub async fn week_by_room(&self, location: &Location) -> WeekGrid {
        let mut grid = WeekGrid::new(self.today());
        let guard = self.store.lock().await;
        for r in guard
            .records()
            .iter()
            .filter(|r| r.is_active() && r.details.location == *location)
        {
            grid.place(r.clone());
        }
        grid
    }

    /// Export the store. Returns false on failure, which is logged.
    pub async fn backup(&self, path: &Path) -> bool {
        match self.store.export_snapshot(path).await {
            Ok(()) => true,
            Err(e) => {
                error!("backup to {} failed: {e}", path.display());
                false
            }
        }
    }

    /// Replace the store with a prior export. Returns false on failure, which is logged.
    pub async fn restore(&self, path: &Path) -> bool {
        match self.store.import_snapshot(path).await {
            Ok(()) => true,
            Err(e) => {
                error!("restore from {} failed: {e}", path.display());
                false
            }
        }
    }
}
