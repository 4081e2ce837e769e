use tracing::{debug, info};

use crate::lecture::{self, Lecture, Semester};
use crate::limits::{MAX_LECTURE_ID_LEN, MAX_TEXT_LEN};
use crate::model::{Location, TimeSlot};

use super::guard::validate_location;
use super::{Engine, EngineError};

/// Required fields present, sizes in bounds, times in order.
fn validate_lecture(lecture: &Lecture) -> Result<TimeSlot, EngineError> {
    if lecture.id.trim().is_empty() {
        return Err(EngineError::InvalidInput("lecture id is required".into()));
    }
    if lecture.title.trim().is_empty() {
        return Err(EngineError::InvalidInput("lecture title is required".into()));
    }
    if lecture.id.len() > MAX_LECTURE_ID_LEN {
        return Err(EngineError::LimitExceeded("lecture id too long"));
    }
    if lecture.title.len() > MAX_TEXT_LEN || lecture.professor.as_ref().is_some_and(|p| p.len() > MAX_TEXT_LEN) {
        return Err(EngineError::LimitExceeded("text field too long"));
    }
    validate_location(&lecture.location)?;
    if lecture.year <= 0 {
        return Err(EngineError::InvalidInput(format!("invalid year {}", lecture.year)));
    }
    lecture
        .slot()
        .ok_or_else(|| EngineError::InvalidInput("lecture end time must be after start time".into()))
}

impl Engine {
    /// Add a lecture, or replace the one with the same id.
    ///
    /// Refused with a conflict if it overlaps another lecture in the same room on the same
    /// weekday of the same term.
    pub async fn upsert_lecture(&self, mut lecture: Lecture) -> Result<Lecture, EngineError> {
        let slot = validate_lecture(&lecture)?;
        lecture.id = lecture.id.trim().to_string();

        let mut guard = self.lectures.lock().await;
        if let Some(existing) = lecture::find_overlap(guard.lectures(), &lecture, &slot) {
            debug!("lecture {} at {} overlaps {}", lecture.id, lecture.location, existing.id);
            return Err(EngineError::LectureOverlap {
                id: lecture.id.clone(),
                existing: existing.id.clone(),
            });
        }
        guard.save(lecture.clone())?;
        drop(guard);

        info!(
            "lecture {} saved: {} {} {}-{} ({} {})",
            lecture.id,
            lecture.location,
            lecture.day,
            lecture.start_time.format("%H:%M"),
            lecture.end_time.format("%H:%M"),
            lecture.year,
            lecture.semester
        );
        Ok(lecture)
    }

    pub async fn delete_lecture(&self, id: &str) -> Result<(), EngineError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(EngineError::InvalidInput("lecture id is required".into()));
        }
        if !self.lectures.lock().await.delete_by_id(id)? {
            return Err(EngineError::LectureNotFound(id.to_string()));
        }
        info!("lecture {id} deleted");
        Ok(())
    }

    /// One room's timetable for a term, by weekday then start time.
    pub async fn lectures_by_room(&self, year: i32, semester: Semester, location: &Location) -> Vec<Lecture> {
        self.lectures_where(|l| l.year == year && l.semester == semester && l.location == *location)
            .await
    }

    /// Every lecture in a term, by weekday then start time.
    pub async fn lectures_by_term(&self, year: i32, semester: Semester) -> Vec<Lecture> {
        self.lectures_where(|l| l.year == year && l.semester == semester).await
    }

    async fn lectures_where(&self, keep: impl Fn(&Lecture) -> bool) -> Vec<Lecture> {
        let guard = self.lectures.lock().await;
        let mut list: Vec<Lecture> = guard.lectures().iter().filter(|l| keep(l)).cloned().collect();
        drop(guard);
        list.sort_by_key(|l| (l.day.num_days_from_monday(), l.start_time));
        list
    }
}
