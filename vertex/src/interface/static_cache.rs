//! Static vertex buffer cache.

use std::sync::Arc;

use crate::conversion;
use crate::error::VertexBufferError;
use crate::factory::BufferFactory;
use crate::profile_function;
use crate::types::{
    ComponentType, CurrentValueType, VertexAttribute, VertexBinding,
    compute_vertex_attribute_offset, compute_vertex_attribute_stride,
};

use super::{VertexBufferBase, VertexBufferInterface};

/// Layout fingerprint of the attribute held by a [`StaticVertexBuffer`].
///
/// Two attributes with the same signature can share buffer contents. The
/// signature says nothing about the data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeSignature {
    /// Component type, `None` until a signature has been recorded.
    pub component_type: Option<ComponentType>,
    /// Number of components.
    pub component_count: u32,
    /// Effective stride in bytes.
    pub stride: u32,
    /// Whether integer data is normalized.
    pub normalized: bool,
    /// Whether the shader reads the data as integers.
    pub pure_integer: bool,
    /// Effective start offset modulo the stride.
    pub offset: u64,
}

impl AttributeSignature {
    /// Compute the signature of an attribute.
    pub fn of(attribute: &VertexAttribute, binding: &VertexBinding) -> Self {
        let stride = compute_vertex_attribute_stride(attribute, binding);
        Self {
            component_type: Some(attribute.component_type),
            component_count: attribute.component_count,
            stride,
            normalized: attribute.normalized,
            pure_integer: attribute.pure_integer,
            offset: offset_within_stride(attribute, binding, stride),
        }
    }

    /// Whether an attribute has exactly this layout.
    pub fn matches_attribute(&self, attribute: &VertexAttribute, binding: &VertexBinding) -> bool {
        let stride = compute_vertex_attribute_stride(attribute, binding);
        if self.component_type != Some(attribute.component_type)
            || self.component_count != attribute.component_count
            || self.stride != stride
            || self.normalized != attribute.normalized
            || self.pure_integer != attribute.pure_integer
        {
            return false;
        }
        self.offset == offset_within_stride(attribute, binding, stride)
    }

    /// Record the layout of an attribute.
    pub fn set(&mut self, attribute: &VertexAttribute, binding: &VertexBinding) {
        *self = Self::of(attribute, binding);
    }
}

fn offset_within_stride(attribute: &VertexAttribute, binding: &VertexBinding, stride: u32) -> u64 {
    let offset = compute_vertex_attribute_offset(attribute, binding);
    if stride == 0 {
        offset
    } else {
        offset % u64::from(stride)
    }
}

/// Vertex buffer holding one attribute whose layout is stable across draws.
///
/// The draw-call path checks [`matches_attribute`](Self::matches_attribute)
/// and re-uploads with [`store_static_attribute`](Self::store_static_attribute)
/// on a mismatch. The buffer is sized exactly to the data on every store.
pub struct StaticVertexBuffer {
    base: VertexBufferBase,
    signature: AttributeSignature,
}

impl StaticVertexBuffer {
    /// Create an empty static buffer.
    pub fn new(factory: Arc<dyn BufferFactory>) -> Self {
        Self {
            base: VertexBufferBase::new(factory, false),
            signature: AttributeSignature::default(),
        }
    }

    /// Get the recorded signature.
    pub fn signature(&self) -> &AttributeSignature {
        &self.signature
    }

    /// Whether the cached contents have the layout of `attribute`.
    pub fn matches_attribute(&self, attribute: &VertexAttribute, binding: &VertexBinding) -> bool {
        self.signature.matches_attribute(attribute, binding)
    }

    /// Record the layout of `attribute` without writing any data.
    pub fn set_attribute(&mut self, attribute: &VertexAttribute, binding: &VertexBinding) {
        self.signature.set(attribute, binding);
    }

    /// Upload an attribute, replacing the buffer contents.
    ///
    /// # Panics
    ///
    /// Panics if the attribute is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`VertexBufferError::OutOfMemory`] if `source` is too short,
    /// the space computation overflows or the device fails to allocate. A
    /// short source is rejected before the buffer is resized. The signature
    /// is only updated once the data is written.
    pub fn store_static_attribute(
        &mut self,
        attribute: &VertexAttribute,
        binding: &VertexBinding,
        start: u32,
        count: usize,
        instances: u32,
        source: &[u8],
    ) -> Result<(), VertexBufferError> {
        profile_function!();
        assert!(
            attribute.enabled,
            "static vertex buffers only hold enabled attributes"
        );

        conversion::validate_attribute_source(
            attribute,
            binding,
            CurrentValueType::default(),
            start,
            count,
            instances,
            source,
        )?;
        let space = self
            .base
            .space_required(attribute, binding, count, instances)?;
        self.base.set_buffer_size(space)?;
        self.base.store_vertex_attributes(
            attribute,
            binding,
            CurrentValueType::default(),
            start,
            count,
            instances,
            0,
            source,
        )?;

        self.signature.set(attribute, binding);
        self.base.hint_unmap_resource();
        log::trace!(
            "StaticVertexBuffer: stored {} bytes ({:?} x{})",
            space,
            attribute.component_type,
            attribute.component_count
        );
        Ok(())
    }
}

impl VertexBufferInterface for StaticVertexBuffer {
    fn base(&self) -> &VertexBufferBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VertexBufferBase {
        &mut self.base
    }
}

impl std::fmt::Debug for StaticVertexBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticVertexBuffer")
            .field("base", &self.base)
            .field("signature", &self.signature)
            .finish()
    }
}
