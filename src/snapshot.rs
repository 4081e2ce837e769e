use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::now_ms;
use crate::model::Reservation;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Format(serde_json::Error),
    MissingSnapshot(PathBuf),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Format(e) => write!(f, "malformed snapshot: {e}"),
            StoreError::MissingSnapshot(p) => write!(f, "snapshot not found: {}", p.display()),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Format(e)
    }
}

/// On-disk layout: `{"reservations": [...]}`.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    reservations: &'a [Reservation],
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the full collection to `path`.
pub fn write(path: &Path, reservations: &[Reservation]) -> Result<(), StoreError> {
    write_json(path, &SnapshotRef { reservations })
}

/// Read a snapshot. `Ok(None)` if the file does not exist.
pub fn read(path: &Path) -> Result<Option<Vec<Reservation>>, StoreError> {
    Ok(read_json::<Snapshot>(path)?.map(|s| s.reservations))
}

/// Serialize `value` as pretty JSON to `path`.
///
/// Data goes to a sibling temp file which is fsynced and then renamed over `path`,
/// so readers see either the previous file or the new one.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_reader(BufReader::new(file))?))
}

/// Move an unreadable snapshot aside so the next write cannot clobber it.
pub fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".corrupt-{}", now_ms()));
    let target = path.with_file_name(name);
    fs::rename(path, &target)?;
    Ok(target)
}
