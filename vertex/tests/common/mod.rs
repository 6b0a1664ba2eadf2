//! Common utilities for vertex buffer integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use redlilium_vertex::{
    BufferFactory, BufferId, CurrentValueType, DeviceDescriptor, Serial, VertexAttribute,
    VertexBinding, VertexBufferError, VertexDevice,
};

/// Install `env_logger` once for the test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a device on the dummy backend.
pub fn create_test_device() -> Arc<VertexDevice> {
    init_logging();
    VertexDevice::new(DeviceDescriptor::new().with_label("integration"))
}

/// `count` tightly packed `vec4` elements, each component holding its index.
pub fn vec4_source(count: usize) -> Vec<u8> {
    let data: Vec<f32> = (0..count * 4).map(|v| v as f32).collect();
    bytemuck::cast_slice(&data).to_vec()
}

/// Store `count` vec4 vertices into `stream` and return the offset.
pub fn store_vec4(
    stream: &mut redlilium_vertex::StreamingVertexBuffer,
    count: usize,
) -> Result<u32, VertexBufferError> {
    stream.store_dynamic_attribute(
        &VertexAttribute::float(4),
        &VertexBinding::new(16),
        CurrentValueType::Float,
        0,
        count,
        0,
        &vec4_source(count),
    )
}

/// Factory that reports a fixed raw space requirement for every attribute.
///
/// Everything else is forwarded to a real device, so the space rule can be
/// tested with byte counts no attribute layout produces.
pub struct FixedSpaceFactory {
    pub device: Arc<VertexDevice>,
    raw_space: AtomicU32,
}

impl FixedSpaceFactory {
    pub fn new(raw_space: u32) -> Arc<Self> {
        Arc::new(Self {
            device: create_test_device(),
            raw_space: AtomicU32::new(raw_space),
        })
    }

    /// Change the reported requirement.
    pub fn set_raw_space(&self, raw_space: u32) {
        self.raw_space.store(raw_space, Ordering::Relaxed);
    }
}

impl BufferFactory for FixedSpaceFactory {
    fn create_vertex_buffer(&self) -> BufferId {
        self.device.create_vertex_buffer()
    }

    fn vertex_space_required(
        &self,
        _attribute: &VertexAttribute,
        _binding: &VertexBinding,
        _count: usize,
        _instances: u32,
    ) -> Result<u32, VertexBufferError> {
        Ok(self.raw_space.load(Ordering::Relaxed))
    }

    fn add_ref(&self, id: BufferId) {
        self.device.add_ref(id);
    }

    fn release(&self, id: BufferId) {
        self.device.release(id);
    }

    fn ref_count(&self, id: BufferId) -> u32 {
        self.device.ref_count(id)
    }

    fn buffer_serial(&self, id: BufferId) -> Option<Serial> {
        self.device.buffer_serial(id)
    }

    fn buffer_size(&self, id: BufferId) -> u32 {
        self.device.buffer_size(id)
    }

    fn initialize_buffer(
        &self,
        id: BufferId,
        size: u32,
        dynamic: bool,
    ) -> Result<(), VertexBufferError> {
        self.device.initialize_buffer(id, size, dynamic)
    }

    fn resize_buffer(&self, id: BufferId, size: u32) -> Result<(), VertexBufferError> {
        self.device.resize_buffer(id, size)
    }

    fn discard_buffer(&self, id: BufferId) -> Result<(), VertexBufferError> {
        self.device.discard_buffer(id)
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
        self.device.store_vertex_attributes(
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

    fn hint_unmap_resource(&self, id: BufferId) {
        self.device.hint_unmap_resource(id);
    }
}
