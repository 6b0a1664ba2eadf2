//! Dummy GPU backend for testing and development.
//!
//! This backend keeps every allocation in host memory. It performs no GPU
//! work but honours the full allocation contract, including failure when an
//! optional memory budget is exhausted.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::VertexBufferError;
use crate::types::BufferDescriptor;

use super::{GpuBackend, GpuBuffer};

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    /// Total bytes the backend may have allocated at once, if limited.
    memory_budget: Option<u64>,
    /// Bytes currently allocated.
    allocated: AtomicU64,
}

impl DummyBackend {
    /// Create a new dummy backend without a memory budget.
    pub fn new() -> Self {
        Self {
            memory_budget: None,
            allocated: AtomicU64::new(0),
        }
    }

    /// Create a dummy backend that fails allocations past `bytes` in total.
    pub fn with_memory_budget(bytes: u64) -> Self {
        Self {
            memory_budget: Some(bytes),
            allocated: AtomicU64::new(0),
        }
    }

    /// Bytes currently allocated.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated.load(Ordering::Acquire)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, VertexBufferError> {
        let size = u64::from(descriptor.size);
        let reserved = self
            .allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let total = current.checked_add(size)?;
                match self.memory_budget {
                    Some(budget) if total > budget => None,
                    _ => Some(total),
                }
            });

        if reserved.is_err() {
            log::warn!(
                "DummyBackend: allocation of {} bytes for {:?} exceeds memory budget {:?}",
                size,
                descriptor.label,
                self.memory_budget
            );
            return Err(VertexBufferError::out_of_memory(format!(
                "failed to allocate {size} bytes of vertex buffer storage"
            )));
        }

        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {}, usage: {:?})",
            descriptor.label,
            descriptor.size,
            descriptor.usage
        );
        Ok(GpuBuffer::Dummy {
            data: vec![0u8; descriptor.size as usize],
        })
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let size = u64::from(buffer.size());
        self.allocated.fetch_sub(size, Ordering::AcqRel);
        log::trace!("DummyBackend: destroying buffer (size: {})", size);
    }

    fn write_buffer(
        &self,
        buffer: &mut GpuBuffer,
        offset: u32,
        data: &[u8],
    ) -> Result<(), VertexBufferError> {
        match buffer {
            GpuBuffer::Dummy { data: storage } => {
                let start = offset as usize;
                let end = start.checked_add(data.len()).filter(|&end| end <= storage.len());
                let Some(end) = end else {
                    return Err(VertexBufferError::out_of_memory(format!(
                        "write of {} bytes at offset {} exceeds buffer size {}",
                        data.len(),
                        offset,
                        storage.len()
                    )));
                };
                storage[start..end].copy_from_slice(data);
                log::trace!(
                    "DummyBackend: write_buffer offset={} len={}",
                    offset,
                    data.len()
                );
                Ok(())
            }
        }
    }

    fn read_buffer(&self, buffer: &GpuBuffer, offset: u32, size: u32) -> Vec<u8> {
        match buffer {
            GpuBuffer::Dummy { data } => {
                let start = (offset as usize).min(data.len());
                let end = start.saturating_add(size as usize).min(data.len());
                data[start..end].to_vec()
            }
        }
    }
}
