//! Identifier types for simulated threads and synchronization objects.
//!
//! All IDs are lightweight Copy types using the newtype pattern. Unlike
//! process-wide counters, every ID here is allocated by the session that owns
//! the referenced object, so two simulators never share an ID space.

use serde::Serialize;

/// Identifier of a simulated thread.
///
/// Allocated by the `Simulator` when a thread is registered and never reused
/// within one session, even after the thread is unregistered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub struct ThreadId(pub u32);

/// Arena index of a semaphore in the environment's object store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct SemaphoreId(pub u32);

/// Arena index of a lightswitch in the environment's object store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct LightswitchId(pub u32);

impl ThreadId {
    /// Get the raw value.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Create a ThreadId from a raw value.
    pub fn from_raw(value: u32) -> Self {
        ThreadId(value)
    }
}

impl SemaphoreId {
    pub fn from_index(index: usize) -> Self {
        SemaphoreId(index as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl LightswitchId {
    pub fn from_index(index: usize) -> Self {
        LightswitchId(index as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
