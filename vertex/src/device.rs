//! Vertex device.
//!
//! The [`VertexDevice`] owns every device buffer of one rendering context and
//! implements [`BufferFactory`] on top of a [`GpuBackend`].
//!
//! Storage replaced by `resize` or `discard` is not freed right away. It moves
//! to a retired list, because draws already submitted may still read it. The
//! list holds at most [`DeviceCapabilities::max_retired_allocations`] entries;
//! the oldest allocation is freed when a new one is retired past that bound.
//! [`VertexDevice::collect_retired`] frees the whole list early, typically
//! after the frame fence signals.
//!
//! A buffer whose last reference is released is destroyed at once, storage
//! included. Holding a reference is how a caller keeps storage alive for
//! in-flight draws.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{self, BackendType, GpuBackend, GpuBuffer};
use crate::conversion;
use crate::error::VertexBufferError;
use crate::factory::BufferFactory;
use crate::resources::{BufferArena, BufferId, DeviceBuffer, Serial, SerialCounter};
use crate::types::{CurrentValueType, VertexAttribute, VertexBinding};

/// Capabilities of a vertex device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum size of a single vertex buffer in bytes.
    pub max_buffer_size: u32,
    /// Maximum number of replaced allocations kept alive for in-flight
    /// draws, usually the number of frames in flight.
    pub max_retired_allocations: usize,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_buffer_size: 1 << 30, // 1 GB
            max_retired_allocations: 3,
        }
    }
}

/// Parameters for creating a [`VertexDevice`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceDescriptor {
    /// Debug label, also used to label device buffers.
    pub label: Option<String>,
    /// Backend to create.
    pub backend: BackendType,
    /// Device limits.
    pub capabilities: DeviceCapabilities,
}

impl DeviceDescriptor {
    /// Create a descriptor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the backend type.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the maximum size of a single buffer.
    pub fn with_max_buffer_size(mut self, size: u32) -> Self {
        self.capabilities.max_buffer_size = size;
        self
    }

    /// Set how many replaced allocations are kept before the oldest is freed.
    pub fn with_max_retired_allocations(mut self, count: usize) -> Self {
        self.capabilities.max_retired_allocations = count;
        self
    }
}

/// Counters describing device buffer activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceStats {
    /// Device buffers currently alive.
    pub live_buffers: usize,
    /// Storage allocations performed (initialize, resize and discard).
    pub allocations: u64,
    /// Discards performed.
    pub discards: u64,
    /// Replaced allocations waiting for [`VertexDevice::collect_retired`].
    pub retired_pending: usize,
    /// Bytes held by live and retired storage.
    pub bytes_allocated: u64,
}

#[derive(Default)]
struct DeviceState {
    buffers: BufferArena,
    retired: VecDeque<GpuBuffer>,
    allocations: u64,
    discards: u64,
}

/// Owner of the device buffers of one rendering context.
///
/// # Thread Safety
///
/// `VertexDevice` is `Send + Sync`. Buffer state sits behind a mutex, but the
/// interfaces built on it assume a single owner issuing calls in order; the
/// lock only keeps the arena consistent.
///
/// # Example
///
/// ```ignore
/// let device = VertexDevice::new(DeviceDescriptor::new().with_label("context"));
/// let mut stream = StreamingVertexBuffer::new(device.clone());
/// ```
pub struct VertexDevice {
    label: Option<String>,
    capabilities: DeviceCapabilities,
    backend: Arc<dyn GpuBackend>,
    serials: SerialCounter,
    state: Mutex<DeviceState>,
}

impl VertexDevice {
    /// Create a device with the backend named by `descriptor`.
    pub fn new(descriptor: DeviceDescriptor) -> Arc<Self> {
        let backend = backend::create_backend(descriptor.backend);
        Self::with_backend(descriptor, backend)
    }

    /// Create a device on an existing backend.
    pub fn with_backend(descriptor: DeviceDescriptor, backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        log::info!(
            "Creating VertexDevice {:?} on {}",
            descriptor.label,
            backend.name()
        );
        Arc::new(Self {
            label: descriptor.label,
            capabilities: descriptor.capabilities,
            backend,
            serials: SerialCounter::new(),
            state: Mutex::new(DeviceState::default()),
        })
    }

    /// Get the device label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Get the backend.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Number of live device buffers.
    pub fn buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Snapshot of the device counters.
    pub fn stats(&self) -> DeviceStats {
        let state = self.state.lock();
        let retired: u64 = state
            .retired
            .iter()
            .map(|storage| u64::from(storage.size()))
            .sum();
        let live: u64 = state
            .buffers
            .iter()
            .map(|(_, buffer)| u64::from(buffer.size()))
            .sum();
        DeviceStats {
            live_buffers: state.buffers.len(),
            allocations: state.allocations,
            discards: state.discards,
            retired_pending: state.retired.len(),
            bytes_allocated: live + retired,
        }
    }

    /// Free every retired allocation.
    ///
    /// Only call this once the GPU has finished all work submitted before the
    /// storage was replaced. Without it the retired list still stays bounded
    /// by [`DeviceCapabilities::max_retired_allocations`]. Returns the number
    /// of allocations freed.
    pub fn collect_retired(&self) -> usize {
        let retired = std::mem::take(&mut self.state.lock().retired);
        let count = retired.len();
        for storage in retired {
            self.backend.destroy_buffer(storage);
        }
        if count > 0 {
            log::trace!("VertexDevice: collected {} retired allocations", count);
            crate::profile_message!("vertex buffers retired");
        }
        count
    }

    /// Read back `size` bytes at `offset` from a buffer's current storage.
    ///
    /// Returns an empty vector if the buffer is gone or has no storage.
    pub fn read_buffer(&self, id: BufferId, offset: u32, size: u32) -> Vec<u8> {
        let state = self.state.lock();
        state
            .buffers
            .get(id)
            .and_then(DeviceBuffer::storage)
            .map(|storage| self.backend.read_buffer(storage, offset, size))
            .unwrap_or_default()
    }

    fn check_size(&self, size: u32) -> Result<(), VertexBufferError> {
        if size > self.capabilities.max_buffer_size {
            log::warn!(
                "VertexDevice: buffer size {} exceeds maximum {}",
                size,
                self.capabilities.max_buffer_size
            );
            return Err(VertexBufferError::out_of_memory(format!(
                "buffer size {size} exceeds maximum {}",
                self.capabilities.max_buffer_size
            )));
        }
        Ok(())
    }

    /// Run a storage-replacing operation and retire the previous storage.
    fn replace_storage<F>(&self, id: BufferId, op: F) -> Result<(), VertexBufferError>
    where
        F: FnOnce(
            &mut DeviceBuffer,
            &dyn GpuBackend,
            &SerialCounter,
        ) -> Result<Option<GpuBuffer>, VertexBufferError>,
    {
        let mut state = self.state.lock();
        let Some(buffer) = state.buffers.get_mut(id) else {
            return Err(missing_buffer(id));
        };
        let replaced = op(buffer, self.backend.as_ref(), &self.serials)?;
        state.allocations += 1;
        if let Some(storage) = replaced {
            self.retire(&mut state, storage);
        }
        Ok(())
    }

    /// Queue replaced storage, freeing the oldest entries past the bound.
    fn retire(&self, state: &mut DeviceState, storage: GpuBuffer) {
        state.retired.push_back(storage);
        while state.retired.len() > self.capabilities.max_retired_allocations {
            let Some(oldest) = state.retired.pop_front() else {
                break;
            };
            log::trace!("VertexDevice: freeing oldest retired allocation");
            self.backend.destroy_buffer(oldest);
        }
    }
}

fn missing_buffer(id: BufferId) -> VertexBufferError {
    log::warn!("VertexDevice: {} does not exist", id);
    VertexBufferError::out_of_memory(format!("{id} has been destroyed"))
}

impl BufferFactory for VertexDevice {
    fn create_vertex_buffer(&self) -> BufferId {
        let buffer = DeviceBuffer::new(self.serials.next(), self.label.clone());
        let id = self.state.lock().buffers.insert(buffer);
        log::trace!("VertexDevice: created {}", id);
        id
    }

    fn vertex_space_required(
        &self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        count: usize,
        instances: u32,
    ) -> Result<u32, VertexBufferError> {
        // Every current value type is four 32-bit components, so the hint
        // does not affect the size.
        conversion::stored_byte_count(
            attribute,
            binding,
            CurrentValueType::default(),
            count,
            instances,
        )
        .ok_or_else(|| {
            log::warn!(
                "VertexDevice: space for {} elements of {:?} overflows",
                count,
                attribute.component_type
            );
            VertexBufferError::out_of_memory("vertex buffer space requirement overflows")
        })
    }

    fn add_ref(&self, id: BufferId) {
        if !self.state.lock().buffers.acquire(id) {
            log::warn!("VertexDevice: add_ref on destroyed {}", id);
        }
    }

    fn release(&self, id: BufferId) {
        let mut state = self.state.lock();
        if let Some(mut buffer) = state.buffers.release(id) {
            log::trace!("VertexDevice: destroying {} ({:?})", id, buffer);
            if let Some(storage) = buffer.take_storage() {
                self.backend.destroy_buffer(storage);
            }
        }
    }

    fn ref_count(&self, id: BufferId) -> u32 {
        self.state.lock().buffers.ref_count(id)
    }

    fn buffer_serial(&self, id: BufferId) -> Option<Serial> {
        self.state.lock().buffers.get(id).map(DeviceBuffer::serial)
    }

    fn buffer_size(&self, id: BufferId) -> u32 {
        self.state
            .lock()
            .buffers
            .get(id)
            .map_or(0, DeviceBuffer::size)
    }

    fn initialize_buffer(
        &self,
        id: BufferId,
        size: u32,
        dynamic: bool,
    ) -> Result<(), VertexBufferError> {
        self.check_size(size)?;
        self.replace_storage(id, |buffer, backend, serials| {
            buffer.initialize(backend, serials, size, dynamic)
        })
    }

    fn resize_buffer(&self, id: BufferId, size: u32) -> Result<(), VertexBufferError> {
        self.check_size(size)?;
        self.replace_storage(id, |buffer, backend, serials| {
            buffer.resize(backend, serials, size)
        })
    }

    fn discard_buffer(&self, id: BufferId) -> Result<(), VertexBufferError> {
        self.replace_storage(id, |buffer, backend, serials| {
            buffer.discard(backend, serials)
        })?;
        self.state.lock().discards += 1;
        Ok(())
    }

    fn store_vertex_attributes(
        &self,
        id: BufferId,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        current_value_type: CurrentValueType,
        start: u32,
        count: usize,
        instances: u32,
        offset: u32,
        source: &[u8],
    ) -> Result<(), VertexBufferError> {
        let mut state = self.state.lock();
        let Some(buffer) = state.buffers.get_mut(id) else {
            return Err(missing_buffer(id));
        };
        buffer.store_vertex_attributes(
            self.backend.as_ref(),
            attribute,
            binding,
            current_value_type,
            start,
            count,
            instances,
            offset,
            source,
        )
    }

    fn hint_unmap_resource(&self, id: BufferId) {
        let state = self.state.lock();
        if let Some(buffer) = state.buffers.get(id) {
            buffer.hint_unmap_resource(self.backend.as_ref());
        }
    }
}

impl Drop for VertexDevice {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let live = state.buffers.drain();
        if !live.is_empty() {
            log::warn!(
                "VertexDevice {:?}: dropping with {} live buffers",
                self.label,
                live.len()
            );
        }
        let storages = live
            .into_iter()
            .filter_map(|mut buffer| buffer.take_storage())
            .chain(state.retired.drain(..));
        for storage in storages {
            self.backend.destroy_buffer(storage);
        }
    }
}

impl std::fmt::Debug for VertexDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexDevice")
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// Ensure VertexDevice is Send + Sync
static_assertions::assert_impl_all!(VertexDevice: Send, Sync);
