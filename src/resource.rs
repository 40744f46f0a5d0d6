//! Resource tracker: owns every transient byte-buffer handle.
//!
//! The tracker is an arena and [`Handle`]s are generational indices into it.
//! A handle stays dereferenceable until it is released; releasing bumps the
//! slot's generation so stale copies of the handle resolve to nothing and a
//! second release is a silent no-op.
//!
//! Registering never copies the bytes: callers hand over an `Arc<[u8]>`, so
//! a preview handle and an output handle can point at the same buffer while
//! still being released independently.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Opaque, revocable reference to a registered byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Stable identifier for display, analogous to an object URL.
    pub fn url(&self) -> String {
        format!("blob:fileflip/{}-{}", self.index, self.generation)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// A registered buffer and the MIME type it was registered with.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
}

/// Register/release counters, for leak accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandleStats {
    pub registered: u64,
    pub released: u64,
    pub live: usize,
}

struct Slot {
    generation: u32,
    blob: Option<Blob>,
}

/// Arena of live handles.
#[derive(Default)]
pub struct ResourceTracker {
    slots: Vec<Slot>,
    free: Vec<u32>,
    registered: u64,
    released: u64,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `bytes` in a new handle. O(1), no copy.
    pub fn register(&mut self, bytes: impl Into<Arc<[u8]>>, mime_type: &str) -> Handle {
        let blob = Blob {
            bytes: bytes.into(),
            mime_type: mime_type.to_string(),
        };
        let len = blob.bytes.len();

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.blob = Some(blob);
                Handle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    blob: Some(blob),
                });
                Handle {
                    index,
                    generation: 0,
                }
            }
        };

        self.registered += 1;
        debug!("Registered {} ({} bytes, {})", handle, len, mime_type);
        handle
    }

    /// Release a handle. Idempotent: stale, already-released and `None`
    /// handles are ignored. Returns `true` when something was freed.
    pub fn release(&mut self, handle: impl Into<Option<Handle>>) -> bool {
        let Some(handle) = handle.into() else {
            return false;
        };
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.blob.is_none() {
            return false;
        }

        slot.blob = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.released += 1;
        debug!("Released {}", handle);
        true
    }

    /// Resolve a handle to its buffer, if still live.
    pub fn get(&self, handle: Handle) -> Option<&Blob> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.blob.as_ref())
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Render a live handle as a `data:` URL.
    pub fn data_url(&self, handle: Handle) -> Option<String> {
        self.get(handle)
            .map(|blob| format!("data:{};base64,{}", blob.mime_type, STANDARD.encode(&blob.bytes)))
    }

    /// Number of handles currently live.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.blob.is_some()).count()
    }

    pub fn stats(&self) -> HandleStats {
        HandleStats {
            registered: self.registered,
            released: self.released,
            live: self.live(),
        }
    }
}

impl fmt::Debug for ResourceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTracker")
            .field("live", &self.live())
            .field("registered", &self.registered)
            .field("released", &self.released)
            .finish()
    }
}
