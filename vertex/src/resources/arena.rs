//! Reference-counted arena of device buffers.
//!
//! Buffers live in slots indexed by [`BufferId`]. Each slot carries a
//! reference count; the buffer is removed and handed back to the caller when
//! the count drops to zero. Freed slots are recycled through a free list and
//! their generation is bumped, so an id that outlived its buffer never
//! resolves to the slot's next occupant.

use super::DeviceBuffer;

/// Stable identifier of a device buffer in a [`BufferArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId {
    index: u32,
    generation: u32,
}

impl BufferId {
    /// Get the slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the slot generation this id was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Buffer({}v{})", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

struct Entry {
    ref_count: u32,
    buffer: DeviceBuffer,
}

/// Slot arena holding every live device buffer of a device.
#[derive(Default)]
pub struct BufferArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl BufferArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a buffer with a reference count of 1.
    pub fn insert(&mut self, buffer: DeviceBuffer) -> BufferId {
        let entry = Entry {
            ref_count: 1,
            buffer,
        };
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return BufferId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        BufferId {
            index,
            generation: 0,
        }
    }

    fn entry(&self, id: BufferId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: BufferId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Whether `id` refers to a live buffer.
    pub fn contains(&self, id: BufferId) -> bool {
        self.entry(id).is_some()
    }

    /// Get a live buffer.
    pub fn get(&self, id: BufferId) -> Option<&DeviceBuffer> {
        self.entry(id).map(|entry| &entry.buffer)
    }

    /// Get a live buffer mutably.
    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut DeviceBuffer> {
        self.entry_mut(id).map(|entry| &mut entry.buffer)
    }

    /// Current reference count, or 0 if the buffer is gone.
    pub fn ref_count(&self, id: BufferId) -> u32 {
        self.entry(id).map_or(0, |entry| entry.ref_count)
    }

    /// Add a reference. Returns `false` if the buffer is gone.
    pub fn acquire(&mut self, id: BufferId) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference.
    ///
    /// Returns the buffer when this was the last reference; the caller is
    /// responsible for freeing its storage.
    pub fn release(&mut self, id: BufferId) -> Option<DeviceBuffer> {
        let entry = self.entry_mut(id)?;
        debug_assert!(entry.ref_count > 0);
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return None;
        }

        let slot = &mut self.slots[id.index as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(entry.buffer)
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the arena holds no live buffers.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live buffers.
    pub fn iter(&self) -> impl Iterator<Item = (BufferId, &DeviceBuffer)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                let id = BufferId {
                    index: index as u32,
                    generation: slot.generation,
                };
                (id, &entry.buffer)
            })
        })
    }

    /// Remove every buffer regardless of reference count.
    pub fn drain(&mut self) -> Vec<DeviceBuffer> {
        let mut buffers = Vec::with_capacity(self.live);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                buffers.push(entry.buffer);
            }
        }
        self.live = 0;
        buffers
    }
}

impl std::fmt::Debug for BufferArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferArena")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .finish()
    }
}
