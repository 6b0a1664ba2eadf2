//! Device buffer resource.

use crate::backend::{GpuBackend, GpuBuffer};
use crate::conversion;
use crate::error::VertexBufferError;
use crate::types::{
    BufferDescriptor, BufferUsage, CurrentValueType, VertexAttribute, VertexBinding,
};

use super::{Serial, SerialCounter};

/// One physical vertex buffer.
///
/// A device buffer starts without storage (size 0). `initialize` performs the
/// first allocation; `resize` and `discard` replace the storage later on.
/// Replacing storage issues a new [`Serial`] and hands the previous
/// allocation back to the caller, which retires it once in-flight GPU work is
/// known to be done.
///
/// Contents are never preserved when storage is replaced.
pub struct DeviceBuffer {
    label: Option<String>,
    serial: Serial,
    usage: BufferUsage,
    storage: Option<GpuBuffer>,
}

impl DeviceBuffer {
    /// Create a buffer without storage (called by the device).
    pub(crate) fn new(serial: Serial, label: Option<String>) -> Self {
        Self {
            label,
            serial,
            usage: BufferUsage::vertex(false),
            storage: None,
        }
    }

    /// Get the current serial.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Get the storage size in bytes (0 before the first allocation).
    pub fn size(&self) -> u32 {
        self.storage.as_ref().map_or(0, GpuBuffer::size)
    }

    /// Whether the buffer was allocated with the dynamic hint.
    pub fn is_dynamic(&self) -> bool {
        self.usage.contains(BufferUsage::DYNAMIC)
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the current storage.
    pub(crate) fn storage(&self) -> Option<&GpuBuffer> {
        self.storage.as_ref()
    }

    /// Take the storage out, leaving the buffer empty.
    pub(crate) fn take_storage(&mut self) -> Option<GpuBuffer> {
        self.storage.take()
    }

    /// Allocate new storage and swap it in.
    ///
    /// On failure the buffer is left untouched.
    fn replace_storage(
        &mut self,
        backend: &dyn GpuBackend,
        serials: &SerialCounter,
        size: u32,
        usage: BufferUsage,
    ) -> Result<Option<GpuBuffer>, VertexBufferError> {
        let mut descriptor = BufferDescriptor::new(size, usage);
        descriptor.label = self.label.clone();
        let storage = backend.create_buffer(&descriptor)?;

        self.usage = usage;
        self.serial = serials.next();
        Ok(self.storage.replace(storage))
    }

    /// Perform the first allocation.
    ///
    /// Returns the storage that was replaced, if the buffer already had some.
    pub(crate) fn initialize(
        &mut self,
        backend: &dyn GpuBackend,
        serials: &SerialCounter,
        size: u32,
        dynamic: bool,
    ) -> Result<Option<GpuBuffer>, VertexBufferError> {
        log::trace!(
            "DeviceBuffer {:?}: initialize size={} dynamic={}",
            self.label,
            size,
            dynamic
        );
        self.replace_storage(backend, serials, size, BufferUsage::vertex(dynamic))
    }

    /// Reallocate with a new size, keeping the usage hint.
    pub(crate) fn resize(
        &mut self,
        backend: &dyn GpuBackend,
        serials: &SerialCounter,
        size: u32,
    ) -> Result<Option<GpuBuffer>, VertexBufferError> {
        log::trace!(
            "DeviceBuffer {:?}: resize {} -> {}",
            self.label,
            self.size(),
            size
        );
        self.replace_storage(backend, serials, size, self.usage)
    }

    /// Swap in fresh storage of the same size.
    ///
    /// GPU work still reading the previous storage is unaffected, so the
    /// caller does not have to wait for it before writing again.
    pub(crate) fn discard(
        &mut self,
        backend: &dyn GpuBackend,
        serials: &SerialCounter,
    ) -> Result<Option<GpuBuffer>, VertexBufferError> {
        log::trace!("DeviceBuffer {:?}: discard size={}", self.label, self.size());
        self.replace_storage(backend, serials, self.size(), self.usage)
    }

    /// Pack one attribute for a draw and write it at `offset`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn store_vertex_attributes(
        &mut self,
        backend: &dyn GpuBackend,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        current_value_type: CurrentValueType,
        start: u32,
        count: usize,
        instances: u32,
        offset: u32,
        source: &[u8],
    ) -> Result<(), VertexBufferError> {
        let packed = conversion::pack_vertex_attribute(
            attribute,
            binding,
            current_value_type,
            start,
            count,
            instances,
            source,
        )?;

        let Some(storage) = self.storage.as_mut() else {
            return Err(VertexBufferError::out_of_memory(
                "vertex buffer has no storage to write into",
            ));
        };

        backend.write_buffer(storage, offset, &packed)
    }

    /// Forward the unmap hint to the backend.
    pub(crate) fn hint_unmap_resource(&self, backend: &dyn GpuBackend) {
        if let Some(storage) = &self.storage {
            backend.unmap_hint(storage);
        }
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("label", &self.label)
            .field("serial", &self.serial)
            .field("size", &self.size())
            .field("usage", &self.usage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_new_buffer_has_no_storage() {
        let serials = SerialCounter::new();
        let buffer = DeviceBuffer::new(serials.next(), Some("test".into()));
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.label(), Some("test"));
        assert!(buffer.storage().is_none());
    }

    #[test]
    fn test_initialize_refreshes_serial() {
        let backend = DummyBackend::new();
        let serials = SerialCounter::new();
        let mut buffer = DeviceBuffer::new(serials.next(), None);
        let before = buffer.serial();

        let replaced = buffer.initialize(&backend, &serials, 256, true).unwrap();
        assert!(replaced.is_none());
        assert_eq!(buffer.size(), 256);
        assert!(buffer.is_dynamic());
        assert!(buffer.serial() > before);
    }

    #[test]
    fn test_discard_keeps_size_and_returns_old_storage() {
        let backend = DummyBackend::new();
        let serials = SerialCounter::new();
        let mut buffer = DeviceBuffer::new(serials.next(), None);
        buffer.initialize(&backend, &serials, 128, true).unwrap();
        let before = buffer.serial();

        let old = buffer.discard(&backend, &serials).unwrap();
        assert_eq!(old.map(|s| s.size()), Some(128));
        assert_eq!(buffer.size(), 128);
        assert!(buffer.serial() > before);
    }

    #[test]
    fn test_failed_resize_leaves_buffer_unchanged() {
        let backend = DummyBackend::with_memory_budget(100);
        let serials = SerialCounter::new();
        let mut buffer = DeviceBuffer::new(serials.next(), None);
        buffer.initialize(&backend, &serials, 64, false).unwrap();
        let serial = buffer.serial();

        let result = buffer.resize(&backend, &serials, 64);
        assert!(result.is_err());
        assert_eq!(buffer.size(), 64);
        assert_eq!(buffer.serial(), serial);
        assert!(!buffer.is_dynamic());
    }

    #[test]
    fn test_store_without_storage_fails() {
        let backend = DummyBackend::new();
        let serials = SerialCounter::new();
        let mut buffer = DeviceBuffer::new(serials.next(), None);
        let data = [0u8; 16];

        let result = buffer.store_vertex_attributes(
            &backend,
            &VertexAttribute::float(4),
            &VertexBinding::new(0),
            CurrentValueType::Float,
            0,
            1,
            0,
            0,
            &data,
        );
        assert!(result.is_err());
    }
}
