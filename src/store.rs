//! Persistence for per-profile instance records.
//!
//! The production system keeps these columns on the backend's profile
//! table behind row-level security; here the store is a trait with an
//! in-memory implementation for tests and a JSON file implementation for
//! the CLI. Only the connection manager writes through it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ZapError;
use crate::lifecycle::InstanceRecord;

pub trait InstanceStore: Send + Sync {
    /// Fetch the record for a profile, if one was ever written.
    fn get(&self, profile_id: Uuid) -> Result<Option<InstanceRecord>, ZapError>;

    /// Persist a freshly created instance record. Fails with
    /// [`ZapError::AlreadyExists`] if the profile already holds an
    /// id/token pair — this is the uniqueness constraint that closes the
    /// create() check-then-write race.
    fn insert_new(&self, record: InstanceRecord) -> Result<(), ZapError>;

    /// Overwrite the record for its profile.
    fn update(&self, record: InstanceRecord) -> Result<(), ZapError>;
}

/// In-memory store, used by tests and by `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Uuid, InstanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstanceStore for MemoryStore {
    fn get(&self, profile_id: Uuid) -> Result<Option<InstanceRecord>, ZapError> {
        let records = self
            .records
            .lock()
            .map_err(|_| ZapError::Store("poisoned lock".into()))?;
        Ok(records.get(&profile_id).cloned())
    }

    fn insert_new(&self, record: InstanceRecord) -> Result<(), ZapError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ZapError::Store("poisoned lock".into()))?;
        if let Some(existing) = records.get(&record.profile_id)
            && existing.has_instance()
        {
            return Err(ZapError::AlreadyExists);
        }
        records.insert(record.profile_id, record);
        Ok(())
    }

    fn update(&self, record: InstanceRecord) -> Result<(), ZapError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ZapError::Store("poisoned lock".into()))?;
        records.insert(record.profile_id, record);
        Ok(())
    }
}

/// Document shape persisted by [`FileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    records: HashMap<Uuid, InstanceRecord>,
}

/// JSON-file-backed store for the CLI. The whole document is read and
/// rewritten under one lock per operation; record counts here are tiny
/// (one per configured profile).
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<StoreDocument, ZapError> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        let doc = serde_json::from_str(&contents)?;
        Ok(doc)
    }

    fn save(&self, doc: &StoreDocument) -> Result<(), ZapError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl InstanceStore for FileStore {
    fn get(&self, profile_id: Uuid) -> Result<Option<InstanceRecord>, ZapError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ZapError::Store("poisoned lock".into()))?;
        let doc = self.load()?;
        Ok(doc.records.get(&profile_id).cloned())
    }

    fn insert_new(&self, record: InstanceRecord) -> Result<(), ZapError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ZapError::Store("poisoned lock".into()))?;
        let mut doc = self.load()?;
        if let Some(existing) = doc.records.get(&record.profile_id)
            && existing.has_instance()
        {
            return Err(ZapError::AlreadyExists);
        }
        doc.records.insert(record.profile_id, record);
        self.save(&doc)
    }

    fn update(&self, record: InstanceRecord) -> Result<(), ZapError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ZapError::Store("poisoned lock".into()))?;
        let mut doc = self.load()?;
        doc.records.insert(record.profile_id, record);
        self.save(&doc)
    }
}
