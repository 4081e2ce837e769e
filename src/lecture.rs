use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info};

use crate::model::{Location, TimeSlot, hhmm};
use crate::snapshot::{self, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    /// `1` or `2`; anything else is not a semester.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Semester::First),
            2 => Some(Semester::Second),
            _ => None,
        }
    }
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Semester::First => write!(f, "first"),
            Semester::Second => write!(f, "second"),
        }
    }
}

/// A recurring weekly lecture held in one room for one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professor: Option<String>,
    pub location: Location,
    pub day: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub year: i32,
    pub semester: Semester,
}

impl Lecture {
    /// `None` if the times are not in order.
    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::new(self.start_time, self.end_time)
    }

    /// Same term, same room, same weekday.
    pub fn shares_room_with(&self, other: &Lecture) -> bool {
        self.year == other.year
            && self.semester == other.semester
            && self.day == other.day
            && self.location == other.location
    }
}

/// First lecture whose time overlaps `candidate` in the same term, room and weekday.
///
/// An entry with the candidate's id is its previous version and never conflicts.
pub fn find_overlap<'a>(lectures: &'a [Lecture], candidate: &Lecture, slot: &TimeSlot) -> Option<&'a Lecture> {
    lectures.iter().find(|l| {
        l.id != candidate.id && l.shares_room_with(candidate) && l.slot().is_some_and(|s| s.overlaps(slot))
    })
}

/// On-disk layout: `{"lectures": [...]}`.
#[derive(Debug, Default, Deserialize)]
struct LectureFile {
    #[serde(default)]
    lectures: Vec<Lecture>,
}

#[derive(Serialize)]
struct LectureFileRef<'a> {
    lectures: &'a [Lecture],
}

/// Lecture timetable, optionally backed by a JSON file.
///
/// Same contract as the reservation store: one lock, and every mutation is written out
/// before it returns or is rolled back.
pub struct LectureSchedule {
    path: Option<PathBuf>,
    lectures: Mutex<Vec<Lecture>>,
}

impl LectureSchedule {
    /// Not persisted anywhere.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            lectures: Mutex::new(Vec::new()),
        }
    }

    /// Load from `path`. Missing starts empty; unreadable is quarantined and starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lectures = match snapshot::read_json::<LectureFile>(&path) {
            Ok(Some(file)) => dedup_by_id(file.lectures),
            Ok(None) => Vec::new(),
            Err(StoreError::Format(e)) => {
                let moved = snapshot::quarantine(&path)?;
                error!(
                    "lecture file {} unreadable ({e}); moved to {} and starting empty",
                    path.display(),
                    moved.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        info!("loaded {} lectures from {}", lectures.len(), path.display());
        metrics::gauge!(crate::observability::LECTURE_RECORDS).set(lectures.len() as f64);
        Ok(Self {
            path: Some(path),
            lectures: Mutex::new(lectures),
        })
    }

    pub async fn lock(&self) -> LectureGuard<'_> {
        LectureGuard {
            lectures: self.lectures.lock().await,
            path: self.path.as_deref(),
        }
    }

    pub async fn find_all(&self) -> Vec<Lecture> {
        self.lectures.lock().await.clone()
    }
}

/// Later entries win, keeping the first position.
fn dedup_by_id(list: Vec<Lecture>) -> Vec<Lecture> {
    let mut out: Vec<Lecture> = Vec::with_capacity(list.len());
    for l in list {
        match out.iter_mut().find(|o| o.id == l.id) {
            Some(slot) => *slot = l,
            None => out.push(l),
        }
    }
    out
}

pub struct LectureGuard<'a> {
    lectures: MutexGuard<'a, Vec<Lecture>>,
    path: Option<&'a Path>,
}

impl LectureGuard<'_> {
    pub fn lectures(&self) -> &[Lecture] {
        &self.lectures
    }

    /// Insert, or replace by id.
    pub fn save(&mut self, lecture: Lecture) -> Result<(), StoreError> {
        let previous = match self.lectures.iter().position(|l| l.id == lecture.id) {
            Some(pos) => Some((pos, std::mem::replace(&mut self.lectures[pos], lecture))),
            None => {
                self.lectures.push(lecture);
                None
            }
        };
        if let Err(e) = self.flush() {
            match previous {
                Some((pos, prev)) => self.lectures[pos] = prev,
                None => {
                    self.lectures.pop();
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Returns false if no such id.
    pub fn delete_by_id(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(pos) = self.lectures.iter().position(|l| l.id == id) else {
            return Ok(false);
        };
        let removed = self.lectures.remove(pos);
        if let Err(e) = self.flush() {
            self.lectures.insert(pos, removed);
            return Err(e);
        }
        Ok(true)
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(path) = self.path {
            let result = snapshot::write_json(path, &LectureFileRef { lectures: &self.lectures });
            if let Err(e) = &result {
                error!("failed to persist lectures to {}: {e}", path.display());
                return result;
            }
        }
        metrics::gauge!(crate::observability::LECTURE_RECORDS).set(self.lectures.len() as f64);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::fixtures::time;

    pub fn lecture(id: &str, location: Location, day: Weekday, start: &str, end: &str) -> Lecture {
        Lecture {
            id: id.into(),
            title: format!("Course {id}"),
            professor: Some("p100".into()),
            location,
            day,
            start_time: time(start),
            end_time: time(end),
            year: 2025,
            semester: Semester::First,
        }
    }
}
