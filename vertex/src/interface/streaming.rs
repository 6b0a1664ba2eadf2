//! Streaming vertex buffer.
//!
//! A growable bump allocator for attribute data that changes every draw.
//! Attributes are written one after another at a write cursor. When the
//! pending writes no longer fit behind the cursor, the buffer is discarded
//! (fresh storage of the same size) and writing restarts at offset 0, so data
//! still read by in-flight draws is never overwritten and the caller never
//! waits on the GPU. When the pending writes are larger than the whole
//! buffer, it grows by at least half its size.
//!
//! # Example
//!
//! ```ignore
//! let mut stream = StreamingVertexBuffer::new(device.clone());
//!
//! // Reserve the whole draw first so it lands in a single buffer
//! stream.reserve_vertex_space(&position, &binding, vertex_count, 0)?;
//! stream.reserve_vertex_space(&color, &binding, vertex_count, 0)?;
//!
//! let position_offset = stream.store_dynamic_attribute(
//!     &position, &binding, CurrentValueType::Float, 0, vertex_count, 0, positions,
//! )?;
//! ```

use std::sync::Arc;

use crate::conversion;
use crate::error::VertexBufferError;
use crate::factory::BufferFactory;
use crate::profile_scope;
use crate::types::{CurrentValueType, VertexAttribute, VertexBinding};

use super::{
    STREAMING_GROWTH_DENOMINATOR, STREAMING_GROWTH_NUMERATOR, VertexBufferBase,
    VertexBufferInterface,
};

/// Growable bump allocator over one device buffer.
///
/// # Thread Safety
///
/// `StreamingVertexBuffer` is NOT thread-safe. It belongs to the thread that
/// owns the rendering context.
pub struct StreamingVertexBuffer {
    base: VertexBufferBase,
    write_position: u32,
    reserved_space: u32,
}

impl StreamingVertexBuffer {
    /// Create a streaming buffer. No storage is allocated until the first
    /// store or explicit sizing.
    pub fn new(factory: Arc<dyn BufferFactory>) -> Self {
        Self {
            base: VertexBufferBase::new(factory, true),
            write_position: 0,
            reserved_space: 0,
        }
    }

    /// Create a streaming buffer and allocate `size` bytes up front.
    pub fn with_initial_size(
        factory: Arc<dyn BufferFactory>,
        size: u32,
    ) -> Result<Self, VertexBufferError> {
        let mut buffer = Self::new(factory);
        buffer.base.set_buffer_size(size)?;
        Ok(buffer)
    }

    /// Byte offset the next attribute is written at.
    pub fn write_position(&self) -> u32 {
        self.write_position
    }

    /// Space reserved since the last store.
    pub fn reserved_space(&self) -> u32 {
        self.reserved_space
    }

    /// Reserve space for an attribute that is about to be stored.
    ///
    /// Reserving every attribute of a draw before storing any of them makes
    /// the whole draw land in one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`VertexBufferError::OutOfMemory`] if the accumulated
    /// reservation overflows. The reservation is left unchanged.
    pub fn reserve_vertex_space(
        &mut self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        count: usize,
        instances: u32,
    ) -> Result<(), VertexBufferError> {
        let space = self
            .base
            .space_required(attribute, binding, count, instances)?;
        self.reserved_space = self.reserved_space.checked_add(space).ok_or_else(|| {
            log::warn!(
                "StreamingVertexBuffer: reserving {} more bytes overflows ({} reserved)",
                space,
                self.reserved_space
            );
            VertexBufferError::out_of_memory(format!(
                "unable to reserve {space} extra bytes in the streaming vertex buffer"
            ))
        })?;
        Ok(())
    }

    /// Write one attribute for a draw and return the byte offset to bind.
    ///
    /// The pending reservation (at least this attribute's own space) is
    /// resolved first: the buffer grows when the reservation exceeds its
    /// size, and is discarded when the reservation does not fit behind the
    /// write cursor. Either way writing restarts at offset 0.
    ///
    /// # Errors
    ///
    /// Returns [`VertexBufferError::OutOfMemory`] if the source does not
    /// cover the draw, if the write position would overflow, or if the
    /// device fails to allocate. The write cursor and the reservation are
    /// unchanged on failure.
    #[allow(clippy::too_many_arguments)]
    pub fn store_dynamic_attribute(
        &mut self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        current_value_type: CurrentValueType,
        start: u32,
        count: usize,
        instances: u32,
        source: &[u8],
    ) -> Result<u32, VertexBufferError> {
        profile_scope!("store_dynamic_attribute");

        conversion::validate_attribute_source(
            attribute,
            binding,
            current_value_type,
            start,
            count,
            instances,
            source,
        )?;

        let space = self
            .base
            .space_required(attribute, binding, count, instances)?;
        if self.write_position.checked_add(space).is_none() {
            log::warn!(
                "StreamingVertexBuffer: write position {} + {} overflows",
                self.write_position,
                space
            );
            return Err(VertexBufferError::out_of_memory(
                "new vertex buffer write position would overflow",
            ));
        }

        let pending = self.reserved_space.max(space);
        if pending == 0 {
            return Ok(self.write_position);
        }

        let offset = self.resolve_reservation(pending)?;
        self.base.store_vertex_attributes(
            attribute,
            binding,
            current_value_type,
            start,
            count,
            instances,
            offset,
            source,
        )?;

        self.reserved_space = 0;
        self.write_position = offset + space;
        log::trace!(
            "StreamingVertexBuffer: stored {} bytes at {}",
            space,
            offset
        );
        Ok(offset)
    }

    /// Make room for `pending` bytes and return the offset to write at.
    fn resolve_reservation(&mut self, pending: u32) -> Result<u32, VertexBufferError> {
        let capacity = self.base.buffer_size();
        if pending > capacity {
            let size = grown_size(capacity, pending);
            log::debug!(
                "StreamingVertexBuffer: growing {} -> {} bytes",
                capacity,
                size
            );
            self.base.set_buffer_size(size)?;
            return Ok(0);
        }

        let fits = self
            .write_position
            .checked_add(pending)
            .is_some_and(|end| end <= capacity);
        if !fits {
            log::debug!(
                "StreamingVertexBuffer: wrapping at {} of {} bytes",
                self.write_position,
                capacity
            );
            self.base.discard()?;
            return Ok(0);
        }

        Ok(self.write_position)
    }

    /// Release the buffer without allocating a replacement.
    ///
    /// The next store creates a new buffer.
    pub fn reset(&mut self) {
        self.base.reset();
        self.write_position = 0;
    }
}

/// New size of a buffer that must hold at least `required` bytes.
fn grown_size(capacity: u32, required: u32) -> u32 {
    let grown = u64::from(capacity) * u64::from(STREAMING_GROWTH_NUMERATOR)
        / u64::from(STREAMING_GROWTH_DENOMINATOR);
    required.max(u32::try_from(grown).unwrap_or(u32::MAX))
}

impl VertexBufferInterface for StreamingVertexBuffer {
    fn base(&self) -> &VertexBufferBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VertexBufferBase {
        &mut self.base
    }
}

impl std::fmt::Debug for StreamingVertexBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingVertexBuffer")
            .field("base", &self.base)
            .field("write_position", &self.write_position)
            .field("reserved_space", &self.reserved_space)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceDescriptor, VertexDevice};

    fn create_test_device() -> Arc<VertexDevice> {
        VertexDevice::new(DeviceDescriptor::new().with_label("stream_test"))
    }

    fn vec4_source(count: usize) -> Vec<u8> {
        let data: Vec<f32> = (0..count * 4).map(|v| v as f32).collect();
        bytemuck::cast_slice(&data).to_vec()
    }

    #[test]
    fn test_grown_size() {
        assert_eq!(grown_size(0, 1600), 1600);
        assert_eq!(grown_size(1000, 1200), 1500);
        assert_eq!(grown_size(1000, 4000), 4000);
        assert_eq!(grown_size(u32::MAX, 16), u32::MAX);
    }

    #[test]
    fn test_store_without_reservation_allocates() {
        let device = create_test_device();
        let mut stream = StreamingVertexBuffer::new(device.clone());
        let attribute = VertexAttribute::float(4);
        let binding = VertexBinding::new(16);

        let offset = stream
            .store_dynamic_attribute(
                &attribute,
                &binding,
                CurrentValueType::Float,
                0,
                4,
                0,
                &vec4_source(4),
            )
            .unwrap();
        assert_eq!(offset, 0);
        assert_eq!(stream.buffer_size(), 64);
        assert_eq!(stream.write_position(), 64);

        let id = stream.base().vertex_buffer().unwrap();
        assert_eq!(device.read_buffer(id, 0, 64), vec4_source(4));
    }

    #[test]
    fn test_consecutive_stores_advance_cursor() {
        let device = create_test_device();
        let mut stream = StreamingVertexBuffer::with_initial_size(device, 1024).unwrap();
        let attribute = VertexAttribute::float(3);
        let binding = VertexBinding::new(12);
        let source = vec![0u8; 12 * 3];

        let first = stream
            .store_dynamic_attribute(&attribute, &binding, CurrentValueType::Float, 0, 3, 0, &source)
            .unwrap();
        let second = stream
            .store_dynamic_attribute(&attribute, &binding, CurrentValueType::Float, 0, 3, 0, &source)
            .unwrap();
        // 36 bytes aligned to 48
        assert_eq!(first, 0);
        assert_eq!(second, 48);
        assert_eq!(stream.write_position(), 96);
    }

    #[test]
    fn test_short_source_leaves_state_unchanged() {
        let device = create_test_device();
        let mut stream = StreamingVertexBuffer::with_initial_size(device.clone(), 256).unwrap();
        let attribute = VertexAttribute::float(4);
        let binding = VertexBinding::new(16);
        stream
            .reserve_vertex_space(&attribute, &binding, 100, 0)
            .unwrap();
        let serial = stream.serial();

        let result = stream.store_dynamic_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            0,
            100,
            0,
            &vec4_source(10),
        );
        assert!(result.is_err());
        assert_eq!(stream.reserved_space(), 1600);
        assert_eq!(stream.write_position(), 0);
        assert_eq!(stream.buffer_size(), 256);
        assert_eq!(stream.serial(), serial);
    }

    #[test]
    fn test_failed_growth_leaves_state_unchanged() {
        let device = VertexDevice::new(DeviceDescriptor::new().with_max_buffer_size(512));
        let mut stream = StreamingVertexBuffer::with_initial_size(device, 256).unwrap();
        let attribute = VertexAttribute::float(4);
        let binding = VertexBinding::new(16);

        stream
            .store_dynamic_attribute(
                &attribute,
                &binding,
                CurrentValueType::Float,
                0,
                2,
                0,
                &vec4_source(2),
            )
            .unwrap();
        stream
            .reserve_vertex_space(&attribute, &binding, 64, 0)
            .unwrap();

        let result = stream.store_dynamic_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            0,
            64,
            0,
            &vec4_source(64),
        );
        assert!(matches!(result, Err(VertexBufferError::OutOfMemory(_))));
        assert_eq!(stream.write_position(), 32);
        assert_eq!(stream.reserved_space(), 1024);
        assert_eq!(stream.buffer_size(), 256);
    }

    #[test]
    fn test_reset_then_store_creates_new_buffer() {
        let device = create_test_device();
        let mut stream = StreamingVertexBuffer::with_initial_size(device.clone(), 128).unwrap();
        let old = stream.base().vertex_buffer().unwrap();

        stream.reset();
        assert!(stream.serial().is_none());
        assert_eq!(stream.buffer_size(), 0);
        assert_eq!(device.buffer_count(), 0);

        let attribute = VertexAttribute::float(4);
        let offset = stream
            .store_dynamic_attribute(
                &attribute,
                &VertexBinding::new(16),
                CurrentValueType::Float,
                0,
                1,
                0,
                &vec4_source(1),
            )
            .unwrap();
        assert_eq!(offset, 0);
        assert_ne!(stream.base().vertex_buffer(), Some(old));
        assert_eq!(stream.buffer_size(), 16);
    }

    #[test]
    fn test_disabled_attribute_streams_current_value() {
        let device = create_test_device();
        let mut stream = StreamingVertexBuffer::new(device.clone());
        let attribute = VertexAttribute::float(2).disabled();
        let value: [i32; 4] = [1, 2, 3, 4];

        let offset = stream
            .store_dynamic_attribute(
                &attribute,
                &VertexBinding::new(0),
                CurrentValueType::Int,
                0,
                1000,
                0,
                bytemuck::bytes_of(&value),
            )
            .unwrap();
        assert_eq!(offset, 0);
        assert_eq!(stream.write_position(), 16);

        let id = stream.base().vertex_buffer().unwrap();
        assert_eq!(device.read_buffer(id, 0, 16), bytemuck::bytes_of(&value));
    }

    #[test]
    fn test_empty_store_is_a_no_op() {
        let device = create_test_device();
        let mut stream = StreamingVertexBuffer::new(device.clone());
        let offset = stream
            .store_dynamic_attribute(
                &VertexAttribute::float(4),
                &VertexBinding::new(16),
                CurrentValueType::Float,
                0,
                0,
                0,
                &[],
            )
            .unwrap();
        assert_eq!(offset, 0);
        assert_eq!(stream.buffer_size(), 0);
        assert_eq!(device.stats().allocations, 0);
    }
}
