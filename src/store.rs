//! Conference state persistence.
//!
//! The state is stored as a pretty-printed JSON mapping with `venues`,
//! `sessions` and `venue_bookings`. A missing or blank store holds the empty
//! default. Every load hands out a [`StateVersion`] (a BLAKE3 digest of the
//! stored bytes) and every save must present the version it started from,
//! so two read-modify-write cycles racing on the same store cannot silently
//! overwrite each other. [`JsonFileStore`] holds an exclusive advisory lock
//! on a sidecar `.lock` file across the version check and the write; writers
//! that bypass this type (or platforms without advisory locks) are not
//! covered.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domains::event::ConferenceState;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// Stored state breaks a conference invariant
    #[error("Stored conference state is inconsistent: {0}")]
    Corrupt(String),

    /// The state changed between load and save
    #[error("Conference state changed since it was loaded (expected version {expected}, found {found})")]
    Conflict {
        /// Version the writer started from
        expected: StateVersion,
        /// Version currently stored
        found: StateVersion,
    },
}

/// Convenience result alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Digest identifying one stored revision of the state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateVersion(String);

impl StateVersion {
    /// Version of the given stored bytes.
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Version of an empty store.
    pub fn empty() -> Self {
        Self::of(&[])
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form
        write!(f, "{}", &self.0[..self.0.len().min(12)])
    }
}

/// A loaded state together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// The conference state
    pub state: ConferenceState,
    /// Version to present when saving
    pub version: StateVersion,
}

/// Durable home of the conference state.
pub trait StateStore {
    /// Read the current state; empty storage yields the default state.
    fn load(&self) -> StoreResult<Loaded>;

    /// Replace the stored state, provided it is still at `expected`.
    fn save(&self, state: &ConferenceState, expected: &StateVersion) -> StoreResult<StateVersion>;
}

fn decode(bytes: &[u8]) -> StoreResult<ConferenceState> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ConferenceState::default());
    }
    let state: ConferenceState = serde_json::from_slice(bytes)?;
    state
        .verify()
        .map_err(|err| StoreError::Corrupt(err.to_string()))?;
    Ok(state)
}

fn encode(state: &ConferenceState) -> StoreResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(state)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn check_version(expected: &StateVersion, current: &[u8]) -> StoreResult<()> {
    let found = StateVersion::of(current);
    if &found == expected {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            expected: expected.clone(),
            found,
        })
    }
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path` (created on first save).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file that serializes writers.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Block until this process holds the writer lock. Released when the
    /// returned handle is dropped.
    fn lock(&self) -> StoreResult<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    }

    fn read_bytes(&self) -> StoreResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> StoreResult<Loaded> {
        let bytes = self.read_bytes()?;
        let state = decode(&bytes)?;
        tracing::debug!(path = %self.path.display(), venues = state.venues.len(), "loaded conference state");
        Ok(Loaded {
            state,
            version: StateVersion::of(&bytes),
        })
    }

    fn save(&self, state: &ConferenceState, expected: &StateVersion) -> StoreResult<StateVersion> {
        let _lock = self.lock()?;
        check_version(expected, &self.read_bytes()?)?;
        let bytes = encode(state)?;
        write_atomic(&self.path, &bytes)?;
        let version = StateVersion::of(&bytes);
        tracing::info!(path = %self.path.display(), %version, "saved conference state");
        Ok(version)
    }
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Mutex<Vec<u8>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `state`.
    pub fn with_state(state: &ConferenceState) -> StoreResult<Self> {
        Ok(Self {
            bytes: Mutex::new(encode(state)?),
        })
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> StoreResult<Loaded> {
        let bytes = self.bytes.lock();
        Ok(Loaded {
            state: decode(&bytes)?,
            version: StateVersion::of(&bytes),
        })
    }

    fn save(&self, state: &ConferenceState, expected: &StateVersion) -> StoreResult<StateVersion> {
        let mut bytes = self.bytes.lock();
        check_version(expected, &bytes)?;
        *bytes = encode(state)?;
        Ok(StateVersion::of(&bytes))
    }
}

/// Write data atomically to a file
///
/// Creates a temporary file, writes the data, syncs, then renames
pub fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let temp_path = path.with_extension("tmp");
    let failed = |detail: String| StoreError::AtomicWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    let mut file = File::create(&temp_path)
        .map_err(|err| failed(format!("create {}: {}", temp_path.display(), err)))?;
    file.write_all(data)
        .map_err(|err| failed(format!("write: {}", err)))?;
    file.sync_all()
        .map_err(|err| failed(format!("sync: {}", err)))?;
    drop(file);

    fs::rename(&temp_path, path)
        .map_err(|err| failed(format!("rename {}: {}", temp_path.display(), err)))?;

    // Directory handles cannot be opened on every platform; the rename already landed.
    match OpenOptions::new().read(true).open(&parent) {
        Ok(dir) => {
            if let Err(err) = dir.sync_all() {
                tracing::warn!(dir = %parent.display(), error = %err, "failed to sync state directory");
            }
        }
        Err(err) => {
            tracing::warn!(dir = %parent.display(), error = %err, "cannot open state directory for sync");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::event::Venue;
    use tempfile::TempDir;

    fn one_venue() -> ConferenceState {
        let mut state = ConferenceState::new();
        state.venues.insert(
            "Hall".into(),
            Venue {
                capacity: 10,
                has_av_system: false,
            },
        );
        state
    }

    #[test]
    fn test_atomic_write() {
        let temp = TempDir::new().unwrap();
        let test_file = temp.path().join("nested/state.json");

        write_atomic(&test_file, b"{}").unwrap();

        assert_eq!(fs::read(&test_file).unwrap(), b"{}");
        assert!(!temp.path().join("nested/state.tmp").exists());
    }

    #[test]
    fn blank_file_is_the_empty_state() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "  \n").unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap();
        assert!(loaded.state.is_empty());
    }

    #[test]
    fn file_store_round_trips_and_rejects_stale_saves() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().join("state.json"));

        let empty = store.load().unwrap();
        assert!(empty.state.is_empty());

        let version = store.save(&one_venue(), &empty.version).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.state, one_venue());
        assert_eq!(loaded.version, version);

        let err = store.save(&ConferenceState::new(), &empty.version).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.load().unwrap().state, one_venue());
    }

    #[test]
    fn concurrent_file_saves_from_one_version_conflict() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        let base = JsonFileStore::new(&path).load().unwrap().version;
        let barrier = std::sync::Barrier::new(2);

        let results: Vec<StoreResult<StateVersion>> = std::thread::scope(|scope| {
            let handles: Vec<_> = [("Hall", 10), ("Annex", 20)]
                .into_iter()
                .map(|(name, capacity)| {
                    let (base, barrier, path) = (&base, &barrier, &path);
                    scope.spawn(move || {
                        let mut state = ConferenceState::new();
                        state.venues.insert(
                            name.into(),
                            Venue {
                                capacity,
                                has_av_system: false,
                            },
                        );
                        let store = JsonFileStore::new(path);
                        barrier.wait();
                        store.save(&state, base)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict { .. })))
            .count();
        assert_eq!(conflicts, 1, "{results:?}");
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

        let stored = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(stored.state.venues.len(), 1);
        assert!(temp.path().join("state.lock").exists());
    }

    #[test]
    fn memory_store_detects_stale_versions() {
        let store = MemoryStore::new();
        let first = store.load().unwrap();
        assert_eq!(first.version, StateVersion::empty());

        store.save(&one_venue(), &first.version).unwrap();
        let err = store.save(&ConferenceState::new(), &first.version).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn inconsistent_state_is_refused() {
        let mut state = one_venue();
        state.venue_bookings.insert("Hall".into(), "Ghost".into());
        let store = MemoryStore::with_state(&state).unwrap();
        assert!(matches!(store.load().unwrap_err(), StoreError::Corrupt(_)));
    }
}
