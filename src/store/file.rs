//! Subscriber file codec
//!
//! Layout: CSV, header `email,x,y,registered_at`, one row per subscriber.
//! Columns are positional, so header-less files and files written with
//! other header names (`email,lat,lon,timestamp`) load the same way. The
//! `registered_at` column is optional on read.
//!
//! Writes never touch the live file in place:
//!
//! 1. Write all rows to a uniquely named temp file in the same directory
//! 2. fsync the temp file
//! 3. Rename over the live file
//! 4. fsync the parent directory
//!
//! Processes sharing the file coordinate through `flock(2)` on the sibling
//! `<file>.lock`. The data file itself is replaced on every write, so it
//! cannot carry the lock.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tempfile::NamedTempFile;

use super::errors::{StoreError, StoreResult};
use super::record::{validate_email, Coordinate, Subscriber};

/// Header written on every rewrite
pub const HEADER: [&str; 4] = ["email", "x", "y", "registered_at"];

fn io_error(path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), e))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Lock file guarding `path` across processes
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "subscribers.csv".into());
    name.push(".lock");
    path.with_file_name(name)
}

/// Held lock on a subscriber file, released on drop
#[cfg(unix)]
pub type FileLock = nix::fcntl::Flock<File>;

/// Held lock on a subscriber file, released on drop
#[cfg(not(unix))]
pub type FileLock = ();

/// Block until the lock for `path` is held
///
/// Readers take it shared, read-modify-write cycles take it exclusive.
#[cfg(unix)]
pub fn acquire_lock(path: &Path, exclusive: bool) -> StoreResult<FileLock> {
    use std::os::unix::fs::OpenOptionsExt;

    let parent = parent_dir(path);
    fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;

    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(&lock_path)
        .map_err(|e| io_error(&lock_path, e))?;

    let arg = if exclusive {
        nix::fcntl::FlockArg::LockExclusive
    } else {
        nix::fcntl::FlockArg::LockShared
    };

    #[allow(deprecated)]
    nix::fcntl::Flock::lock(file, arg).map_err(|(_file, e)| io_error(&lock_path, e))
}

#[cfg(not(unix))]
pub fn acquire_lock(_path: &Path, _exclusive: bool) -> StoreResult<FileLock> {
    Ok(())
}

/// Read every row of the subscriber file in file order
///
/// A missing file is an empty store. Rows without a timestamp are stamped
/// with `loaded_at`.
pub fn read_records(path: &Path, loaded_at: DateTime<Utc>) -> StoreResult<Vec<Subscriber>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| io_error(path, e))?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| io_error(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(index as u64 + 1);

        if index == 0 && is_header(&row) {
            continue;
        }

        records.push(parse_row(&row, line, loaded_at)?);
    }

    Ok(records)
}

fn is_header(row: &StringRecord) -> bool {
    row.get(0)
        .map(|f| f.eq_ignore_ascii_case("email"))
        .unwrap_or(false)
}

fn parse_row(row: &StringRecord, line: u64, loaded_at: DateTime<Utc>) -> StoreResult<Subscriber> {
    let corrupt = |reason: String| StoreError::Corrupt { line, reason };

    if row.len() < 3 {
        return Err(corrupt(format!("expected at least 3 columns, found {}", row.len())));
    }

    let email = validate_email(&row[0]).map_err(|e| corrupt(e.to_string()))?;
    let x: f64 = row[1]
        .parse()
        .map_err(|_| corrupt(format!("x is not a number: {:?}", &row[1])))?;
    let y: f64 = row[2]
        .parse()
        .map_err(|_| corrupt(format!("y is not a number: {:?}", &row[2])))?;
    let location = Coordinate::new(x, y).map_err(|e| corrupt(e.to_string()))?;

    let registered_at = match row.get(3).filter(|s| !s.is_empty()) {
        Some(ts) => parse_timestamp(ts)
            .ok_or_else(|| corrupt(format!("registered_at is not a timestamp: {:?}", ts)))?,
        None => loaded_at,
    };

    Ok(Subscriber {
        email,
        location,
        registered_at,
    })
}

/// Accepts RFC 3339 and the offset-less ISO form the web layer wrote
fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Replace the subscriber file with `records`
///
/// Callers hold the exclusive lock. A failed write drops the temp file and
/// leaves the live file untouched.
pub fn write_records_atomic(path: &Path, records: &[Subscriber]) -> StoreResult<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| io_error(&parent, e))?;
    write_rows(&mut tmp, records).map_err(|e| io_error(tmp.path(), e))?;

    // fsync is mandatory before the rename publishes the file
    tmp.as_file().sync_all().map_err(|e| io_error(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;

    fsync_dir(&parent)
}

fn write_rows<W: Write>(out: W, records: &[Subscriber]) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);

    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record([
            record.email.clone(),
            record.location.x.to_string(),
            record.location.y.to_string(),
            record.registered_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> StoreResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| io_error(path, e))?;
    dir.sync_all().map_err(|e| io_error(path, e))
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> StoreResult<()> {
    Ok(())
}
