//! Disaster repository doubles.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use reliefnet_disaster::{Disaster, DisasterError, DisasterRepository, DisasterStatus};

/// An in-memory disaster repository that records every delete call,
/// including deletes of ids it never stored.
#[derive(Debug, Default)]
pub struct InMemoryDisasterRepository {
    disasters: Mutex<HashMap<Uuid, Disaster>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl InMemoryDisasterRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored record for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn stored(&self, id: Uuid) -> Option<Disaster> {
        self.disasters.lock().unwrap().get(&id).cloned()
    }

    /// Number of records currently stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.disasters.lock().unwrap().len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every id passed to `delete`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DisasterRepository for InMemoryDisasterRepository {
    async fn create(&self, disaster: &Disaster) -> Result<(), DisasterError> {
        self.disasters
            .lock()
            .unwrap()
            .insert(disaster.id, disaster.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Disaster>, DisasterError> {
        Ok(self.disasters.lock().unwrap().get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: DisasterStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DisasterError> {
        let mut disasters = self.disasters.lock().unwrap();
        let disaster = disasters
            .get_mut(&id)
            .ok_or(DisasterError::NotFound(id))?;
        disaster.status = status;
        disaster.updated_at = updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DisasterError> {
        self.disasters.lock().unwrap().remove(&id);
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

/// A disaster repository whose every operation fails as unavailable.
#[derive(Debug, Default)]
pub struct FailingDisasterRepository;

#[async_trait]
impl DisasterRepository for FailingDisasterRepository {
    async fn create(&self, _disaster: &Disaster) -> Result<(), DisasterError> {
        Err(DisasterError::Repository("connection refused".into()))
    }

    async fn get(&self, _id: Uuid) -> Result<Option<Disaster>, DisasterError> {
        Err(DisasterError::Repository("connection refused".into()))
    }

    async fn update_status(
        &self,
        _id: Uuid,
        _status: DisasterStatus,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), DisasterError> {
        Err(DisasterError::Repository("connection refused".into()))
    }

    async fn delete(&self, _id: Uuid) -> Result<(), DisasterError> {
        Err(DisasterError::Repository("connection refused".into()))
    }
}
