//! Resource directory and store doubles.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use reliefnet_core::geo::Coordinates;
use reliefnet_resource::{AmenityKind, Resource, ResourceDirectory, ResourceError, ResourceStore};

/// A directory that plays back a script of responses, one per `find_near`
/// call. `Err` entries become transient directory errors; once the script
/// runs out, every call fails.
#[derive(Debug, Default)]
pub struct ScriptedDirectory {
    script: Mutex<VecDeque<Result<Vec<Resource>, String>>>,
    calls: AtomicU32,
}

impl ScriptedDirectory {
    /// Creates a directory with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a successful response to the script.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_found(&self, resources: Vec<Resource>) {
        self.script.lock().unwrap().push_back(Ok(resources));
    }

    /// Appends a transient failure to the script.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_failure(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(message.to_owned()));
    }

    /// How many times `find_near` was called.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceDirectory for ScriptedDirectory {
    async fn find_near(
        &self,
        _location: Coordinates,
        _radius_meters: u32,
    ) -> Result<Vec<Resource>, ResourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(resources)) => Ok(resources),
            Some(Err(message)) => Err(ResourceError::Directory(message)),
            None => Err(ResourceError::Directory("script exhausted".to_owned())),
        }
    }
}

/// A store that upserts into a map keyed by `(name, amenity)` and counts
/// `upsert_all` calls, so tests can assert idempotence across retried runs.
#[derive(Debug, Default)]
pub struct RecordingResourceStore {
    rows: Mutex<HashMap<(String, AmenityKind), Resource>>,
    upsert_calls: AtomicU32,
}

impl RecordingResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct rows stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `upsert_all` was called.
    #[must_use]
    pub fn upsert_calls(&self) -> u32 {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for RecordingResourceStore {
    async fn upsert_all(&self, resources: &[Resource]) -> Result<(), ResourceError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        for resource in resources {
            rows.insert(resource.upsert_key(), resource.clone());
        }
        Ok(())
    }
}
