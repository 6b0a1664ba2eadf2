//! Buffer factory interface.
//!
//! The [`BufferFactory`] trait is everything the vertex buffer interfaces need
//! from the outside world: creating device buffers, sizing attribute data, and
//! the operations on a device buffer addressed by its [`BufferId`].
//!
//! [`VertexDevice`](crate::VertexDevice) is the standard implementation.
//! Every mutating call returns its status unchanged to the caller; nothing on
//! this boundary retries.

use crate::error::VertexBufferError;
use crate::resources::{BufferId, Serial};
use crate::types::{CurrentValueType, VertexAttribute, VertexBinding};

/// Creates device buffers and carries out operations on them.
pub trait BufferFactory: Send + Sync {
    /// Create a device buffer without storage, with a reference count of 1
    /// and a fresh serial.
    fn create_vertex_buffer(&self) -> BufferId;

    /// Unaligned number of bytes needed to store `count` vertices or
    /// `instances` instances of an attribute.
    ///
    /// Equal inputs always produce equal results.
    ///
    /// # Errors
    ///
    /// Returns [`VertexBufferError::OutOfMemory`] if the byte count does not
    /// fit in `u32`.
    fn vertex_space_required(
        &self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        count: usize,
        instances: u32,
    ) -> Result<u32, VertexBufferError>;

    /// Add a reference to a buffer.
    fn add_ref(&self, id: BufferId);

    /// Drop a reference; the buffer is destroyed when none remain.
    fn release(&self, id: BufferId);

    /// Current reference count (0 once destroyed).
    fn ref_count(&self, id: BufferId) -> u32;

    /// Current serial of a buffer, or `None` once destroyed.
    fn buffer_serial(&self, id: BufferId) -> Option<Serial>;

    /// Storage size of a buffer in bytes.
    fn buffer_size(&self, id: BufferId) -> u32;

    /// First-time allocation of `size` bytes.
    fn initialize_buffer(&self, id: BufferId, size: u32, dynamic: bool)
    -> Result<(), VertexBufferError>;

    /// Reallocate with `size` bytes. Contents are not preserved.
    fn resize_buffer(&self, id: BufferId, size: u32) -> Result<(), VertexBufferError>;

    /// Replace the storage with a fresh allocation of the same size.
    fn discard_buffer(&self, id: BufferId) -> Result<(), VertexBufferError>;

    /// Pack attribute data for a draw and write it at `offset`.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<(), VertexBufferError>;

    /// Hint that CPU writes to the buffer are done for now.
    fn hint_unmap_resource(&self, id: BufferId);
}
