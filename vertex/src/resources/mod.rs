//! Device buffer resources.
//!
//! This module contains the storage side of the vertex pipeline:
//! - [`DeviceBuffer`] - one physical buffer and its current storage
//! - [`BufferArena`] - reference-counted slots addressed by [`BufferId`]
//! - [`Serial`] - identity of one generation of storage
//!
//! Buffers are owned by a [`VertexDevice`](crate::VertexDevice) and reached
//! through their id, never by pointer. An interface may drop its reference
//! while other references keep the buffer alive.

mod arena;
mod device_buffer;
mod serial;

pub use arena::{BufferArena, BufferId};
pub use device_buffer::DeviceBuffer;
pub use serial::{Serial, SerialCounter};
