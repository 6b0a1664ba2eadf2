//! GPU backend abstraction layer.
//!
//! The vertex buffer code never talks to a graphics API directly. Storage is
//! allocated, written and freed through the [`GpuBackend`] trait, which keeps
//! the sizing and streaming policy independent of the API that finally
//! consumes the bytes.
//!
//! # Available Backends
//!
//! - `dummy`: host-memory backend for testing and development. Written bytes
//!   can be read back, which the tests use to verify packing and offsets.

pub mod dummy;

use std::sync::Arc;

use crate::error::VertexBufferError;
use crate::types::BufferDescriptor;

pub use dummy::DummyBackend;

/// Handle to the storage of one device buffer allocation.
pub enum GpuBuffer {
    /// Dummy backend (host memory)
    Dummy {
        /// Buffer contents.
        data: Vec<u8>,
    },
}

impl GpuBuffer {
    /// Size of the allocation in bytes.
    pub fn size(&self) -> u32 {
        match self {
            // Dummy allocations never exceed u32::MAX bytes, see DummyBackend::create_buffer
            Self::Dummy { data } => data.len() as u32,
        }
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dummy { data } => f
                .debug_struct("GpuBuffer::Dummy")
                .field("size", &data.len())
                .finish(),
        }
    }
}

/// Which backend implementation to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Host-memory backend with no GPU.
    #[default]
    Dummy,
}

/// Operations a graphics backend provides for vertex buffer storage.
pub trait GpuBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Allocate storage described by `descriptor`.
    ///
    /// Contents of the new allocation are unspecified.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, VertexBufferError>;

    /// Free an allocation.
    fn destroy_buffer(&self, buffer: GpuBuffer);

    /// Write `data` into `buffer` at `offset`.
    fn write_buffer(
        &self,
        buffer: &mut GpuBuffer,
        offset: u32,
        data: &[u8],
    ) -> Result<(), VertexBufferError>;

    /// Read `size` bytes at `offset` back from `buffer`.
    fn read_buffer(&self, buffer: &GpuBuffer, offset: u32, size: u32) -> Vec<u8>;

    /// Hint that the CPU is done writing `buffer` for now.
    ///
    /// Backends that keep buffers mapped may unmap here. The hint never changes
    /// observable behavior.
    fn unmap_hint(&self, _buffer: &GpuBuffer) {}
}

/// Create a backend of the given type.
pub fn create_backend(backend_type: BackendType) -> Arc<dyn GpuBackend> {
    match backend_type {
        BackendType::Dummy => Arc::new(DummyBackend::new()),
    }
}
