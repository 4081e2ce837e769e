use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::model::Location;

/// Static seating capacity per room. Loaded once at startup, read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct RoomCapacityTable {
    rooms: HashMap<Location, u32>,
}

#[derive(Deserialize)]
struct CapacityFile {
    #[serde(default)]
    rooms: Vec<RoomEntry>,
}

#[derive(Deserialize)]
struct RoomEntry {
    building: String,
    floor: Floor,
    room: String,
    capacity: u32,
}

/// Floors appear as `9` or `"9"` in hand-maintained files.
#[derive(Deserialize)]
#[serde(untagged)]
enum Floor {
    Number(i64),
    Text(String),
}

impl From<Floor> for String {
    fn from(f: Floor) -> Self {
        match f {
            Floor::Number(n) => n.to_string(),
            Floor::Text(s) => s,
        }
    }
}

impl RoomCapacityTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Location, u32)>) -> Self {
        Self {
            rooms: entries.into_iter().collect(),
        }
    }

    /// Parse `{"rooms": [{"building", "floor", "room", "capacity"}]}`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: CapacityFile = serde_json::from_str(raw)?;
        Ok(Self::from_entries(file.rooms.into_iter().map(|e| {
            (Location::new(e.building, e.floor, e.room), e.capacity)
        })))
    }

    /// Load from disk. A missing file yields an empty table, which disables the capacity rule.
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("capacity file {} not found; capacity checks disabled", path.display());
                return Ok(Self::empty());
            }
            Err(e) => return Err(e),
        };
        let table = Self::from_json(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        info!("loaded capacity for {} rooms from {}", table.len(), path.display());
        Ok(table)
    }

    /// 0 when the room is unknown.
    pub fn capacity(&self, location: &Location) -> u32 {
        self.rooms.get(location).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
