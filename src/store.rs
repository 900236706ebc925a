//! Backing stores for the mailbox slot.
//!
//! A store holds the three logical keys of a pending action (identifier,
//! action, timestamp) and always writes or removes them together. Stores
//! report failures; deciding what a failure means is left to the
//! [`Mailbox`](crate::mailbox::Mailbox).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::action::{ActionKind, PendingAction};
use crate::error::StoreError;

/// Persistent key space holding at most one pending action.
pub trait SlotStore: Send {
    /// Reads the slot. An empty or incomplete slot yields `None`.
    fn load(&mut self) -> Result<Option<PendingAction>, StoreError>;

    /// Replaces the slot contents. Must be durable when this returns.
    fn save(&mut self, action: &PendingAction) -> Result<(), StoreError>;

    /// Empties the slot. Removing an empty slot succeeds.
    fn remove(&mut self) -> Result<(), StoreError>;

    /// Empties the slot only if it still holds `expected`, returning whether
    /// it did. No other writer of the slot may interleave between the
    /// comparison and the removal.
    ///
    /// The default is atomic only for stores that nothing outside the owning
    /// mailbox can reach.
    fn remove_if(&mut self, expected: &PendingAction) -> Result<bool, StoreError> {
        match self.load()? {
            Some(current) if current == *expected => {
                self.remove()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// On-disk layout of the slot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SlotDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_reminder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_timestamp: Option<u64>,
}

impl SlotDocument {
    fn from_action(action: &PendingAction) -> Self {
        Self {
            pending_reminder_id: Some(action.reminder_id.clone()),
            pending_action: Some(action.action.as_str().to_string()),
            pending_timestamp: Some(action.created_at),
        }
    }

    fn into_action(self) -> Option<PendingAction> {
        match (self.pending_reminder_id, self.pending_action, self.pending_timestamp) {
            (Some(id), Some(action), Some(ts)) if !id.is_empty() && !action.is_empty() => {
                Some(PendingAction::new(id, ActionKind::parse(&action), ts))
            }
            _ => None,
        }
    }
}

/// Process-local slot. Does not survive the process; used for tests and
/// for embedding where the host provides its own persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Option<PendingAction>,
}

impl MemoryStore {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemoryStore {
    fn load(&mut self) -> Result<Option<PendingAction>, StoreError> {
        Ok(self.slot.clone())
    }

    fn save(&mut self, action: &PendingAction) -> Result<(), StoreError> {
        self.slot = Some(action.clone());
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StoreError> {
        self.slot = None;
        Ok(())
    }
}

/// Slot persisted as a small JSON document.
///
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the slot, so readers in other processes see either the
/// old slot or the new one.
///
/// Every mutation runs under an exclusive OS lock on a sibling `.lock` file.
/// Several processes (a notification handler and the application) may
/// therefore share one slot file without a write landing inside another
/// process's compare-and-remove.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

/// Exclusive hold on a [`FileStore`] slot, released on drop.
#[derive(Debug)]
pub struct SlotLock {
    file: File,
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well.
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStore {
    /// A store for the slot file at `path`; nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file guarding the slot.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Blocks until this handle holds the slot exclusively across processes.
    pub fn lock(&self) -> Result<SlotLock, StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir).map_err(|e| self.io_err(e))?;

        let lock_path = self.lock_path();
        let lock_err = |source| StoreError::Io {
            path: lock_path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&file).map_err(lock_err)?;
        Ok(SlotLock { file })
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn read_slot(&self) -> Result<Option<PendingAction>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let doc: SlotDocument = serde_json::from_slice(&data).map_err(StoreError::Decode)?;
        Ok(doc.into_action())
    }

    fn delete_slot(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

impl SlotStore for FileStore {
    fn load(&mut self) -> Result<Option<PendingAction>, StoreError> {
        // Renames are atomic, so an unlocked read never sees a partial write.
        self.read_slot()
    }

    fn save(&mut self, action: &PendingAction) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_vec(&SlotDocument::from_action(action)).map_err(StoreError::Encode)?;

        let _guard = self.lock()?;
        let mut tmp = NamedTempFile::new_in(self.parent_dir()).map_err(|e| self.io_err(e))?;
        tmp.write_all(&encoded).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.delete_slot()
    }

    fn remove_if(&mut self, expected: &PendingAction) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        match self.read_slot()? {
            Some(current) if current == *expected => {
                self.delete_slot()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
