use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info};
use ulid::Ulid;

use crate::model::Reservation;
use crate::snapshot;

pub use crate::snapshot::StoreError;

/// In-memory collection: insertion-ordered records plus an id index.
#[derive(Debug, Default)]
pub struct Records {
    list: Vec<Reservation>,
    index: HashMap<Ulid, usize>,
}

impl Records {
    fn from_vec(list: Vec<Reservation>) -> Self {
        let mut records = Self::default();
        for r in list {
            records.upsert(r);
        }
        records
    }

    pub fn as_slice(&self) -> &[Reservation] {
        &self.list
    }

    pub fn get(&self, id: &Ulid) -> Option<&Reservation> {
        self.index.get(id).map(|&pos| &self.list[pos])
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Insert, or replace in place if the id exists. Returns the replaced record.
    fn upsert(&mut self, record: Reservation) -> Option<Reservation> {
        match self.index.get(&record.id) {
            Some(&pos) => Some(std::mem::replace(&mut self.list[pos], record)),
            None => {
                self.index.insert(record.id, self.list.len());
                self.list.push(record);
                None
            }
        }
    }

    fn remove(&mut self, id: &Ulid) -> Option<(usize, Reservation)> {
        let pos = self.index.remove(id)?;
        let removed = self.list.remove(pos);
        for p in self.index.values_mut() {
            if *p > pos {
                *p -= 1;
            }
        }
        Some((pos, removed))
    }

    fn insert_at(&mut self, pos: usize, record: Reservation) {
        for p in self.index.values_mut() {
            if *p >= pos {
                *p += 1;
            }
        }
        self.index.insert(record.id, pos);
        self.list.insert(pos, record);
    }
}

/// Durable, lock-guarded reservation collection.
///
/// Every mutation rewrites the backing file before it returns. If that write fails the
/// in-memory change is rolled back, so memory and file never diverge. Queries are served
/// from memory only.
pub struct ReservationStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl ReservationStore {
    /// Load the store from `path`. A missing file starts empty; an unreadable one is
    /// quarantined and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let list = match snapshot::read(&path) {
            Ok(Some(list)) => list,
            Ok(None) => Vec::new(),
            Err(StoreError::Format(e)) => {
                let moved = snapshot::quarantine(&path)?;
                error!(
                    "reservation file {} unreadable ({e}); moved to {} and starting empty",
                    path.display(),
                    moved.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let records = Records::from_vec(list);
        info!("loaded {} reservations from {}", records.len(), path.display());
        metrics::gauge!(crate::observability::STORE_RECORDS).set(records.len() as f64);
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the store lock. Everything done through the guard is one critical section.
    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            records: self.records.lock().await,
            path: &self.path,
        }
    }

    pub async fn save(&self, record: Reservation) -> Result<(), StoreError> {
        self.lock().await.save(record)
    }

    pub async fn delete_by_id(&self, id: &Ulid) -> Result<bool, StoreError> {
        self.lock().await.delete_by_id(id)
    }

    pub async fn find_by_id(&self, id: &Ulid) -> Option<Reservation> {
        self.lock().await.find_by_id(id).cloned()
    }

    pub async fn find_by_requester(&self, requester: &str) -> Vec<Reservation> {
        self.lock().await.find_by_requester(requester).cloned().collect()
    }

    /// Copy of every record, in insertion order.
    pub async fn find_all(&self) -> Vec<Reservation> {
        self.lock().await.records().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.lock().await.clear()
    }

    /// Write the current collection to `target` in the backing-file format.
    pub async fn export_snapshot(&self, target: &Path) -> Result<(), StoreError> {
        let guard = self.lock().await;
        snapshot::write(target, guard.records())?;
        info!("exported {} reservations to {}", guard.records().len(), target.display());
        Ok(())
    }

    /// Replace the backing file with a prior export, then swap memory to the same records.
    pub async fn import_snapshot(&self, source: &Path) -> Result<(), StoreError> {
        let list = snapshot::read(source)?.ok_or_else(|| StoreError::MissingSnapshot(source.to_path_buf()))?;
        let mut guard = self.lock().await;
        snapshot::write(&self.path, &list)?;
        *guard.records = Records::from_vec(list);
        metrics::gauge!(crate::observability::STORE_RECORDS).set(guard.records.len() as f64);
        info!("imported {} reservations from {}", guard.records.len(), source.display());
        Ok(())
    }
}

/// Exclusive access to the collection. Mutations persist before returning.
pub struct StoreGuard<'a> {
    records: MutexGuard<'a, Records>,
    path: &'a Path,
}

impl StoreGuard<'_> {
    pub fn records(&self) -> &[Reservation] {
        self.records.as_slice()
    }

    pub fn find_by_id(&self, id: &Ulid) -> Option<&Reservation> {
        self.records.get(id)
    }

    pub fn find_by_requester<'s>(&'s self, requester: &'s str) -> impl Iterator<Item = &'s Reservation> + 's {
        self.records.as_slice().iter().filter(move |r| r.belongs_to(requester))
    }

    /// Insert, or replace by id.
    pub fn save(&mut self, record: Reservation) -> Result<(), StoreError> {
        let id = record.id;
        let previous = self.records.upsert(record);
        if let Err(e) = self.flush() {
            match previous {
                Some(prev) => {
                    self.records.upsert(prev);
                }
                None => {
                    self.records.remove(&id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Physically remove a record. Returns false if no such id.
    pub fn delete_by_id(&mut self, id: &Ulid) -> Result<bool, StoreError> {
        let Some((pos, removed)) = self.records.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.flush() {
            self.records.insert_at(pos, removed);
            return Err(e);
        }
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        let previous = std::mem::take(&mut *self.records);
        if let Err(e) = self.flush() {
            *self.records = previous;
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = snapshot::write(self.path, self.records.as_slice());
        metrics::histogram!(crate::observability::STORE_FLUSH_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        match &result {
            Ok(()) => {
                metrics::gauge!(crate::observability::STORE_RECORDS).set(self.records.len() as f64);
            }
            Err(e) => error!("failed to persist reservations to {}: {e}", self.path.display()),
        }
        result
    }
}
