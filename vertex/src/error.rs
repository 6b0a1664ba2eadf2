//! Vertex buffer error types.

use std::fmt;

/// Errors that can occur while sizing, streaming or caching vertex data.
///
/// Every failure in this crate is a form of resource exhaustion: the device
/// could not satisfy an allocation, or a byte count left the representable
/// `u32` range. The message carries the context of the failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexBufferError {
    /// Out of device memory, or a byte count would overflow.
    OutOfMemory(String),
}

impl VertexBufferError {
    /// Create an out-of-memory error with the given context.
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }
}

impl fmt::Display for VertexBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory(msg) => write!(f, "out of memory: {msg}"),
        }
    }
}

impl std::error::Error for VertexBufferError {}
