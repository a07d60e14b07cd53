//! The write-once / barrier / read-everywhere protocol used to share a generated mesh
//! between all participants of a parallel job.
//!
//! Exactly one participant, the coordinator, renders and stores an artifact.
//! Everybody then waits at a barrier and only afterwards reads the artifact back,
//! so no reader can observe a partially written file.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier, Mutex};

use crate::error::CollectiveIoError;

/// Rank of the participant which writes shared artifacts
pub const COORDINATOR_RANK: usize = 0;

/// A group of participants able to synchronize with each other.
pub trait Communicator: Send + Sync {
    /// This participant's rank in `[0, size)`
    fn rank(&self) -> usize;

    /// Number of participants
    fn size(&self) -> usize;

    /// Blocks until every participant has reached the barrier.
    fn barrier(&self) -> Result<(), CollectiveIoError>;

    /// Whether this participant writes shared artifacts
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }
}

/// Storage visible to every participant, e.g. a shared filesystem.
pub trait SharedStore: Send + Sync {
    /// Stores `contents` under `name`, replacing any previous artifact.
    ///
    /// Must not return before the contents are visible to other participants.
    fn write(&self, name: &str, contents: &str) -> io::Result<()>;

    /// Reads the artifact stored under `name`.
    fn read(&self, name: &str) -> io::Result<String>;

    /// Deletes the artifact stored under `name`. Removing a missing artifact is not an error.
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Runs the write-once / barrier / read-everywhere protocol.
///
/// Only the coordinator calls `render` and writes its result to `store`.
/// Every participant, the coordinator included, returns the artifact as read back from `store`.
///
/// A coordinator whose render or write failed removes any artifact left under `name` and still
/// enters the barrier before returning its error, so the other participants fail on the missing
/// artifact instead of waiting forever or reading a stale one.
pub fn write_then_read<F>(
    comm: &dyn Communicator,
    store: &dyn SharedStore,
    name: &str,
    render: F,
) -> Result<String, CollectiveIoError>
where
    F: FnOnce() -> Result<String, CollectiveIoError>,
{
    let written = if comm.is_coordinator() {
        let written = render().and_then(|contents| {
            store.write(name, &contents).map_err(|source| CollectiveIoError::Write {
                name: name.to_owned(),
                source,
            })
        });
        match &written {
            Ok(()) => log::debug!("rank {} wrote shared artifact {:?}", comm.rank(), name),
            Err(error) => {
                log::debug!("rank {} failed to produce {:?}: {}", comm.rank(), name, error);
                if let Err(source) = store.remove(name) {
                    log::error!(
                        "rank {} could not remove stale artifact {:?}: {}",
                        comm.rank(),
                        name,
                        source
                    );
                }
            }
        }
        written
    } else {
        Ok(())
    };

    comm.barrier()?;
    written?;

    let contents = store.read(name).map_err(|source| CollectiveIoError::Read {
        name: name.to_owned(),
        source,
    })?;
    log::debug!("rank {} read shared artifact {:?}", comm.rank(), name);
    Ok(contents)
}

/// A job consisting of a single participant.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        COORDINATOR_RANK
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<(), CollectiveIoError> {
        Ok(())
    }
}

/// One member of a team of threads acting as a parallel job.
#[derive(Clone, Debug)]
pub struct ThreadCommunicator {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
}

impl ThreadCommunicator {
    /// Creates the communicators for a team of `size` threads, ordered by rank.
    pub fn team(size: usize) -> Vec<ThreadCommunicator> {
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| ThreadCommunicator {
                rank,
                size,
                barrier: barrier.clone(),
            })
            .collect()
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<(), CollectiveIoError> {
        self.barrier.wait();
        Ok(())
    }
}

/// Stores artifacts as files inside a directory.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Store writing into `root`, which has to exist
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    /// Store writing into the current working directory
    pub fn working_directory() -> Self {
        DirectoryStore::new(".")
    }

    /// The file an artifact is stored in
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// The directory artifacts are stored in
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SharedStore for DirectoryStore {
    fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        let mut file = File::create(self.path(name))?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    fn read(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path(name))
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path(name)) {
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}

/// Stores artifacts in memory. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    artifacts: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// An empty store
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Whether an artifact is stored under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.artifacts
            .lock()
            .map(|artifacts| artifacts.contains_key(name))
            .unwrap_or(false)
    }
}

fn poisoned<T>(_: T) -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory store lock poisoned")
}

impl SharedStore for MemoryStore {
    fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        let mut artifacts = self.artifacts.lock().map_err(poisoned)?;
        artifacts.insert(name.to_owned(), contents.to_owned());
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<String> {
        let artifacts = self.artifacts.lock().map_err(poisoned)?;
        artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no artifact {:?}", name))
            })
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        let mut artifacts = self.artifacts.lock().map_err(poisoned)?;
        artifacts.remove(name);
        Ok(())
    }
}
