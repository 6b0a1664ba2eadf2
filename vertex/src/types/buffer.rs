//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for device buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer content is rewritten frequently (streaming).
        ///
        /// Without this flag the buffer is expected to be written once and
        /// read by many draws.
        const DYNAMIC = 1 << 1;
        /// Buffer can be written from the CPU.
        const COPY_DST = 1 << 2;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

impl BufferUsage {
    /// Usage for a vertex buffer with the given dynamic hint.
    pub fn vertex(dynamic: bool) -> Self {
        let usage = Self::VERTEX | Self::COPY_DST;
        if dynamic { usage | Self::DYNAMIC } else { usage }
    }
}

/// Descriptor for allocating device buffer storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u32,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u32, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether the buffer was requested with the dynamic hint.
    pub fn is_dynamic(&self) -> bool {
        self.usage.contains(BufferUsage::DYNAMIC)
    }
}
