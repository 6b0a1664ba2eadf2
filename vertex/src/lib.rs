//! # RedLilium Vertex
//!
//! Vertex buffer streaming and caching for the RedLilium renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`VertexDevice`] - Owner of reference-counted device buffers, implements
//!   [`BufferFactory`]
//! - [`StreamingVertexBuffer`] - Growable bump allocator for per-draw data
//! - [`StaticVertexBuffer`] - Layout-keyed cache for data stable across draws
//! - [`GpuBackend`] - Trait for storage backends, with a host-memory
//!   [`DummyBackend`] for testing
//!
//! Every buffer carries a [`Serial`] that changes whenever its storage is
//! replaced, so draw bindings cached by the caller can detect staleness.
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_vertex::{
//!     CurrentValueType, DeviceDescriptor, StreamingVertexBuffer, VertexAttribute,
//!     VertexBinding, VertexDevice,
//! };
//!
//! let device = VertexDevice::new(DeviceDescriptor::new().with_label("main"));
//! let mut stream = StreamingVertexBuffer::new(device.clone());
//!
//! let position = VertexAttribute::float(3);
//! let binding = VertexBinding::new(12);
//! stream.reserve_vertex_space(&position, &binding, vertex_count, 0)?;
//! let offset = stream.store_dynamic_attribute(
//!     &position, &binding, CurrentValueType::Float, 0, vertex_count, 0, bytes,
//! )?;
//!
//! // Once the frame fence has signalled
//! device.collect_retired();
//! ```

pub mod backend;
pub mod conversion;
pub mod device;
pub mod error;
pub mod factory;
pub mod interface;
pub mod profiling;
pub mod resources;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendType, DummyBackend, GpuBackend, GpuBuffer};
pub use device::{DeviceCapabilities, DeviceDescriptor, DeviceStats, VertexDevice};
pub use error::VertexBufferError;
pub use factory::BufferFactory;
pub use interface::{
    AttributeSignature, STREAMING_GROWTH_DENOMINATOR, STREAMING_GROWTH_NUMERATOR,
    StaticVertexBuffer, StreamingVertexBuffer, VERTEX_BUFFER_ALIGNMENT, VertexBufferBase,
    VertexBufferInterface, align_vertex_space,
};
pub use resources::{BufferId, Serial};
pub use types::{
    BufferDescriptor, BufferUsage, ComponentType, CurrentValueType, VertexAttribute,
    VertexBinding,
};

/// Vertex library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the vertex subsystem.
pub fn init() {
    log::info!("RedLilium Vertex v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }

    #[test]
    fn test_alignment_constant() {
        assert!(VERTEX_BUFFER_ALIGNMENT.is_power_of_two());
        assert!(STREAMING_GROWTH_NUMERATOR > STREAMING_GROWTH_DENOMINATOR);
    }
}
