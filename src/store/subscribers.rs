//! # Subscriber Store
//!
//! File-backed set of subscribers, shared by every process that opens the
//! same path.
//!
//! The file is the only copy of the set. Each mutation holds the exclusive
//! file lock across re-read → validate → rewrite, so a change made by
//! another process is never overwritten. Reads take the shared lock and
//! re-read the file, so `list()` observes either the old or the new set.
//!
//! Lock order: in-process `gate` first, then the file lock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;

use super::errors::{StoreError, StoreResult};
use super::file::{acquire_lock, read_records, write_records_atomic};
use super::record::{email_key, Subscriber};
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};

/// Read access used by the sweep
pub trait SubscriberSource: Send + Sync {
    /// Snapshot of all current subscribers, in unspecified order
    fn list(&self) -> StoreResult<Vec<Subscriber>>;
}

/// File-backed subscriber store
#[derive(Debug)]
pub struct SubscriberStore {
    path: PathBuf,
    gate: RwLock<()>,
}

/// Keep the first row per email key, return the dropped ones
fn dedupe(rows: Vec<Subscriber>) -> (Vec<Subscriber>, Vec<Subscriber>) {
    let mut seen = HashSet::new();
    let (mut kept, mut dropped) = (Vec::with_capacity(rows.len()), Vec::new());
    for row in rows {
        if seen.insert(row.key()) {
            kept.push(row);
        } else {
            dropped.push(row);
        }
    }
    (kept, dropped)
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("Lock poisoned".into())
}

impl SubscriberStore {
    /// Open the store at `path` and validate its contents
    ///
    /// Creates the lock file next to `path`. The data file itself is
    /// created by the first write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self {
            path: path.into(),
            gate: RwLock::new(()),
        };
        let path_str = store.path.display().to_string();

        let (records, dropped) = {
            let _lock = acquire_lock(&store.path, false)?;
            dedupe(read_records(&store.path, Utc::now())?)
        };

        for row in &dropped {
            log_event_at(
                Severity::Warn,
                Event::StoreDuplicateDropped,
                &[("email", row.email.as_str()), ("path", path_str.as_str())],
            );
        }

        log_event_with_fields(
            Event::StoreLoaded,
            &[
                ("path", path_str.as_str()),
                ("subscribers", records.len().to_string().as_str()),
            ],
        );

        Ok(store)
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current rows; caller holds a lock
    fn load(&self) -> StoreResult<Vec<Subscriber>> {
        read_records(&self.path, Utc::now()).map(|rows| dedupe(rows).0)
    }

    /// Subscribe `email` to alerts for `(x, y)`
    ///
    /// Returns only after the new record set is durable on disk.
    pub fn add(&self, email: &str, x: f64, y: f64) -> StoreResult<Subscriber> {
        let subscriber = Subscriber::new(email, x, y)?;
        let key = subscriber.key();

        let _gate = self.gate.write().map_err(poisoned)?;
        let _lock = acquire_lock(&self.path, true)?;

        let mut records = self.load()?;
        if records.iter().any(|r| r.key() == key) {
            return Err(StoreError::DuplicateEmail(subscriber.email));
        }

        records.push(subscriber.clone());
        write_records_atomic(&self.path, &records)?;

        log_event_with_fields(
            Event::SubscriberAdded,
            &[
                ("email", subscriber.email.as_str()),
                ("x", subscriber.location.x.to_string().as_str()),
                ("y", subscriber.location.y.to_string().as_str()),
            ],
        );

        Ok(subscriber)
    }

    /// Unsubscribe `email`, matched case-insensitively
    pub fn remove(&self, email: &str) -> StoreResult<Subscriber> {
        let key = email_key(email);

        let _gate = self.gate.write().map_err(poisoned)?;
        let _lock = acquire_lock(&self.path, true)?;

        let mut records = self.load()?;
        let index = records
            .iter()
            .position(|r| r.key() == key)
            .ok_or_else(|| StoreError::NotFound(email.trim().to_string()))?;

        let removed = records.remove(index);
        write_records_atomic(&self.path, &records)?;

        log_event_with_fields(Event::SubscriberRemoved, &[("email", removed.email.as_str())]);

        Ok(removed)
    }

    /// Snapshot of all subscribers, read from the file
    pub fn list(&self) -> StoreResult<Vec<Subscriber>> {
        let _gate = self.gate.read().map_err(poisoned)?;
        let _lock = acquire_lock(&self.path, false)?;
        self.load()
    }

    /// Look up one subscriber
    pub fn get(&self, email: &str) -> StoreResult<Option<Subscriber>> {
        let key = email_key(email);
        Ok(self.list()?.into_iter().find(|r| r.key() == key))
    }

    /// Number of subscribers, 0 if the file cannot be read
    pub fn len(&self) -> usize {
        self.list().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriberSource for SubscriberStore {
    fn list(&self) -> StoreResult<Vec<Subscriber>> {
        SubscriberStore::list(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SubscriberStore) {
        let dir = TempDir::new().unwrap();
        let store = SubscriberStore::open(dir.path().join("subscribers.csv")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_add_and_get() {
        let (_dir, store) = open_temp();

        store.add("a@x.com", 1.0, 2.0).unwrap();

        let found = store.get("A@X.COM").unwrap().unwrap();
        assert_eq!(found.email, "a@x.com");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_is_case_insensitive() {
        let (_dir, store) = open_temp();

        store.add("a@x.com", 1.0, 2.0).unwrap();
        let err = store.add("A@x.Com", 5.0, 6.0).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateEmail(_)));
        assert_eq!(store.list().unwrap()[0].location.x, 1.0);
    }

    #[test]
    fn test_invalid_input_not_persisted() {
        let (_dir, store) = open_temp();

        assert!(matches!(
            store.add("nobody", 1.0, 2.0),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add("a@x.com", f64::NAN, 2.0),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_remove_returns_record() {
        let (_dir, store) = open_temp();

        store.add("a@x.com", 1.0, 2.0).unwrap();
        let removed = store.remove(" A@X.com ").unwrap();

        assert_eq!(removed.email, "a@x.com");
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicates_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subscribers.csv");
        std::fs::write(&path, "a@x.com,1,2\nA@x.com,3,4\nb@x.com,5,6\n").unwrap();

        let store = SubscriberStore::open(&path).unwrap();
        let records = store.list().unwrap();

        assert_eq!(records.len(), 2);
        let a = store.get("a@x.com").unwrap().unwrap();
        assert_eq!(a.location.x, 1.0);
    }

    #[test]
    fn test_second_handle_sees_mutations() {
        let (_dir, store) = open_temp();
        let other = SubscriberStore::open(store.path()).unwrap();

        other.add("a@x.com", 1.0, 2.0).unwrap();
        assert_eq!(store.get("a@x.com").unwrap().unwrap().location.y, 2.0);

        store.remove("a@x.com").unwrap();
        assert!(other.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_fails_when_file_turns_corrupt() {
        let (_dir, store) = open_temp();
        store.add("a@x.com", 1.0, 2.0).unwrap();

        std::fs::write(store.path(), "a@x.com,west,2\n").unwrap();

        assert!(matches!(store.list(), Err(StoreError::Corrupt { line: 1, .. })));
    }
}
