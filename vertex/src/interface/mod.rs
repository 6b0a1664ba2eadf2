//! Vertex buffer interfaces.
//!
//! An interface owns exactly one device buffer obtained from a
//! [`BufferFactory`] and decides when that buffer is sized, discarded and
//! written. Two variants exist:
//!
//! - [`StreamingVertexBuffer`] - growable bump allocator for attribute data
//!   that changes on every draw
//! - [`StaticVertexBuffer`] - single-layout cache for attribute data that
//!   stays the same across many draws
//!
//! Both are built on [`VertexBufferBase`] and expose the common
//! [`VertexBufferInterface`] capability.
//!
//! # Ownership
//!
//! The interface holds one reference on its device buffer and drops it when
//! the interface is dropped. Other parties (typically a draw binding cache)
//! may [`add_ref`](BufferFactory::add_ref) the buffer to keep it alive past
//! the interface.

mod static_cache;
mod streaming;

pub use static_cache::{AttributeSignature, StaticVertexBuffer};
pub use streaming::StreamingVertexBuffer;

use std::sync::Arc;

use crate::error::VertexBufferError;
use crate::factory::BufferFactory;
use crate::resources::{BufferId, Serial};
use crate::types::{CurrentValueType, VertexAttribute, VertexBinding};

/// Alignment of every space requirement, in bytes.
pub const VERTEX_BUFFER_ALIGNMENT: u32 = 16;

/// Numerator of the streaming buffer growth factor.
pub const STREAMING_GROWTH_NUMERATOR: u32 = 3;

/// Denominator of the streaming buffer growth factor.
pub const STREAMING_GROWTH_DENOMINATOR: u32 = 2;

/// Round `size` up to [`VERTEX_BUFFER_ALIGNMENT`].
///
/// # Errors
///
/// Returns [`VertexBufferError::OutOfMemory`] if the aligned size does not
/// fit in `u32`.
pub fn align_vertex_space(size: u32) -> Result<u32, VertexBufferError> {
    size.checked_next_multiple_of(VERTEX_BUFFER_ALIGNMENT)
        .ok_or_else(|| {
            log::warn!("Vertex space of {} bytes overflows when aligned", size);
            VertexBufferError::out_of_memory(format!(
                "aligning {size} bytes to {VERTEX_BUFFER_ALIGNMENT} overflows"
            ))
        })
}

/// Operations shared by every vertex buffer interface.
pub trait VertexBufferInterface {
    /// Get the shared base.
    fn base(&self) -> &VertexBufferBase;

    /// Get the shared base mutably.
    fn base_mut(&mut self) -> &mut VertexBufferBase;

    /// Serial of the current storage, or `None` when no buffer is held.
    fn serial(&self) -> Option<Serial> {
        self.base().serial()
    }

    /// Size of the current storage in bytes.
    fn buffer_size(&self) -> u32 {
        self.base().buffer_size()
    }

    /// Allocate or reallocate the storage with `size` bytes.
    fn set_buffer_size(&mut self, size: u32) -> Result<(), VertexBufferError> {
        self.base_mut().set_buffer_size(size)
    }

    /// Replace the storage with fresh storage of the same size.
    fn discard(&mut self) -> Result<(), VertexBufferError> {
        self.base_mut().discard()
    }
}

/// Handle-owning state shared by the interface variants.
pub struct VertexBufferBase {
    factory: Arc<dyn BufferFactory>,
    buffer: Option<BufferId>,
    dynamic: bool,
}

impl VertexBufferBase {
    /// Create a base holding a fresh device buffer from `factory`.
    pub fn new(factory: Arc<dyn BufferFactory>, dynamic: bool) -> Self {
        let buffer = factory.create_vertex_buffer();
        Self {
            factory,
            buffer: Some(buffer),
            dynamic,
        }
    }

    /// Get the factory.
    pub fn factory(&self) -> &Arc<dyn BufferFactory> {
        &self.factory
    }

    /// Get the device buffer currently held.
    pub fn vertex_buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Whether storage is allocated with the dynamic hint.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Serial of the current storage.
    pub fn serial(&self) -> Option<Serial> {
        self.buffer.and_then(|id| self.factory.buffer_serial(id))
    }

    /// Size of the current storage in bytes (0 when no buffer is held).
    pub fn buffer_size(&self) -> u32 {
        self.buffer.map_or(0, |id| self.factory.buffer_size(id))
    }

    /// Get the held buffer, creating one if the base was reset.
    fn ensure_buffer(&mut self) -> BufferId {
        *self
            .buffer
            .get_or_insert_with(|| self.factory.create_vertex_buffer())
    }

    /// Allocate storage of `size` bytes.
    ///
    /// Performs the first allocation when the buffer has no storage yet and
    /// reallocates otherwise. Contents are not preserved.
    pub fn set_buffer_size(&mut self, size: u32) -> Result<(), VertexBufferError> {
        let id = self.ensure_buffer();
        if self.factory.buffer_size(id) == 0 {
            self.factory.initialize_buffer(id, size, self.dynamic)
        } else {
            self.factory.resize_buffer(id, size)
        }
    }

    /// Aligned space needed to store an attribute for a draw.
    pub fn space_required(
        &self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        count: usize,
        instances: u32,
    ) -> Result<u32, VertexBufferError> {
        let raw = self
            .factory
            .vertex_space_required(attribute, binding, count, instances)?;
        align_vertex_space(raw)
    }

    /// Replace the storage with fresh storage of the same size.
    ///
    /// Does nothing when no buffer is held.
    pub fn discard(&mut self) -> Result<(), VertexBufferError> {
        match self.buffer {
            Some(id) => self.factory.discard_buffer(id),
            None => Ok(()),
        }
    }

    /// Write one attribute at `offset` of the held buffer.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn store_vertex_attributes(
        &mut self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        current_value_type: CurrentValueType,
        start: u32,
        count: usize,
        instances: u32,
        offset: u32,
        source: &[u8],
    ) -> Result<(), VertexBufferError> {
        let id = self.ensure_buffer();
        self.factory.store_vertex_attributes(
            id,
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

    pub(crate) fn hint_unmap_resource(&self) {
        if let Some(id) = self.buffer {
            self.factory.hint_unmap_resource(id);
        }
    }

    /// Drop the held buffer reference without allocating a replacement.
    pub fn reset(&mut self) {
        if let Some(id) = self.buffer.take() {
            self.factory.release(id);
        }
    }
}

impl Drop for VertexBufferBase {
    fn drop(&mut self) {
        self.reset();
    }
}

impl std::fmt::Debug for VertexBufferBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexBufferBase")
            .field("buffer", &self.buffer)
            .field("dynamic", &self.dynamic)
            .field("size", &self.buffer_size())
            .finish()
    }
}
