//! Save slots: opaque blob storage plus a checksummed JSON envelope.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;

use crate::constants::{LOG_STORAGE, SAVE_FORMAT_VERSION};
use crate::state::Ledger;

/// Blob store holding whole save slots. Writes replace the entire slot.
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replace the slot's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the blob.
    fn write_slot(&self, slot: &str, blob: &str) -> Result<(), Self::Error>;

    /// Read the slot, `None` when it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read_slot(&self, slot: &str) -> Result<Option<String>, Self::Error>;

    /// Remove the slot if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot delete the slot.
    fn delete_slot(&self, slot: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("no save present")]
    NoSave,
    #[error("unreadable save: {0}")]
    Unreadable(String),
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Full ledger snapshot plus the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlot {
    pub version: u32,
    pub ledger: Ledger,
    pub last_saved: DateTime<Utc>,
    /// The run had already ended when it was saved.
    #[serde(default)]
    pub ended: bool,
}

impl SaveSlot {
    #[must_use]
    pub fn new(ledger: Ledger, last_saved: DateTime<Utc>) -> Self {
        Self {
            version: SAVE_FORMAT_VERSION,
            ledger,
            last_saved,
            ended: false,
        }
    }

    #[must_use]
    pub const fn with_ended(mut self, ended: bool) -> Self {
        self.ended = ended;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    sha256: String,
    payload: String,
}

fn sha256_hex(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Serialize a slot into its checksummed envelope.
///
/// # Errors
///
/// Returns `PersistenceError::Backend` if serialization fails.
pub fn encode_slot(slot: &SaveSlot) -> Result<String, PersistenceError> {
    let payload =
        serde_json::to_string(slot).map_err(|err| PersistenceError::Backend(err.to_string()))?;
    let envelope = Envelope {
        sha256: sha256_hex(&payload),
        payload,
    };
    serde_json::to_string(&envelope).map_err(|err| PersistenceError::Backend(err.to_string()))
}

/// Parse and verify an envelope.
///
/// # Errors
///
/// Returns `PersistenceError::Unreadable` when the envelope, digest, version or
/// payload does not check out.
pub fn decode_slot(blob: &str) -> Result<SaveSlot, PersistenceError> {
    let envelope: Envelope = serde_json::from_str(blob)
        .map_err(|err| PersistenceError::Unreadable(format!("envelope: {err}")))?;
    if sha256_hex(&envelope.payload) != envelope.sha256 {
        return Err(PersistenceError::Unreadable("checksum mismatch".to_string()));
    }
    let slot: SaveSlot = serde_json::from_str(&envelope.payload)
        .map_err(|err| PersistenceError::Unreadable(format!("payload: {err}")))?;
    if slot.version != SAVE_FORMAT_VERSION {
        return Err(PersistenceError::Unreadable(format!(
            "unsupported save version {}",
            slot.version
        )));
    }
    if !slot.ledger.stats.is_well_formed() {
        return Err(PersistenceError::Unreadable(
            "stats violate ledger invariants".to_string(),
        ));
    }
    Ok(slot)
}

/// Encode and write a slot.
///
/// # Errors
///
/// Returns `PersistenceError::Backend` if encoding or the write fails.
pub fn save_slot<S: GameStorage>(
    storage: &S,
    name: &str,
    slot: &SaveSlot,
) -> Result<(), PersistenceError> {
    let blob = encode_slot(slot)?;
    storage
        .write_slot(name, &blob)
        .map_err(|err| PersistenceError::Backend(err.to_string()))?;
    log::debug!(target: LOG_STORAGE, "saved slot {name} at day {}", slot.ledger.day);
    Ok(())
}

/// Read and verify a slot.
///
/// # Errors
///
/// `NoSave` for an empty slot, `Unreadable` for a corrupt one, `Backend` for I/O failures.
pub fn load_slot<S: GameStorage>(storage: &S, name: &str) -> Result<SaveSlot, PersistenceError> {
    let blob = storage
        .read_slot(name)
        .map_err(|err| PersistenceError::Backend(err.to_string()))?
        .ok_or(PersistenceError::NoSave)?;
    decode_slot(&blob).inspect_err(|err| {
        log::warn!(target: LOG_STORAGE, "rejected slot {name}: {err}");
    })
}

/// In-process storage, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl GameStorage for MemoryStorage {
    type Error = std::convert::Infallible;

    fn write_slot(&self, slot: &str, blob: &str) -> Result<(), Self::Error> {
        self.slots
            .borrow_mut()
            .insert(slot.to_string(), blob.to_string());
        Ok(())
    }

    fn read_slot(&self, slot: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.slots.borrow().get(slot).cloned())
    }

    fn delete_slot(&self, slot: &str) -> Result<(), Self::Error> {
        self.slots.borrow_mut().remove(slot);
        Ok(())
    }
}

/// One JSON file per slot under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.root.join(format!("{slot}.json"))
    }
}

impl GameStorage for JsonFileStorage {
    type Error = io::Error;

    fn write_slot(&self, slot: &str, blob: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root)?;
        let path = self.slot_path(slot);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, blob)?;
        fs::rename(&tmp_path, &path)
    }

    fn read_slot(&self, slot: &str) -> Result<Option<String>, Self::Error> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete_slot(&self, slot: &str) -> Result<(), Self::Error> {
        match fs::remove_file(self.slot_path(slot)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}
