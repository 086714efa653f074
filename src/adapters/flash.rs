//! Flash configuration store.
//!
//! Implements [`ConfigPort`] over a single postcard-encoded blob.  The
//! backing store here is an in-memory cell standing in for a flash
//! partition; the embedding binary copies the blob to and from the real
//! medium.
//!
//! - Validation: state is checked before it is written and again after it
//!   is read back.
//! - Capacity: a blob larger than the partition is refused with
//!   [`ConfigError::StorageFull`].

use std::cell::RefCell;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::PersistedState;

/// Default partition size.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

pub struct FlashConfigStore {
    blob: RefCell<Option<Vec<u8>>>,
    capacity: usize,
}

impl Default for FlashConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashConfigStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blob: RefCell::new(None),
            capacity,
        }
    }

    /// Start from a blob previously read off the medium.
    pub fn from_blob(bytes: Vec<u8>) -> Self {
        let store = Self::new();
        *store.blob.borrow_mut() = Some(bytes);
        store
    }

    /// Copy of the stored blob, for writing back to the medium.
    pub fn blob(&self) -> Option<Vec<u8>> {
        self.blob.borrow().clone()
    }
}

impl ConfigPort for FlashConfigStore {
    fn load(&self) -> Result<PersistedState, ConfigError> {
        let blob = self.blob.borrow();
        let bytes = blob.as_deref().ok_or(ConfigError::NotFound)?;
        let state: PersistedState = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        state.validate()?;
        info!("FlashConfigStore: loaded {} bytes", bytes.len());
        Ok(state)
    }

    fn save(&self, state: &PersistedState) -> Result<(), ConfigError> {
        state.validate()?;
        let bytes = postcard::to_allocvec(state).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > self.capacity {
            warn!(
                "FlashConfigStore: {} bytes exceeds {} byte partition",
                bytes.len(),
                self.capacity
            );
            return Err(ConfigError::StorageFull);
        }
        info!("FlashConfigStore: saved {} bytes", bytes.len());
        *self.blob.borrow_mut() = Some(bytes);
        Ok(())
    }

    fn erase(&self) -> Result<(), ConfigError> {
        self.blob.borrow_mut().take();
        info!("FlashConfigStore: erased");
        Ok(())
    }
}
