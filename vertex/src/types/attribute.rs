//! Vertex attribute and binding descriptors.
//!
//! These mirror what the draw-call path knows about one enabled (or disabled)
//! attribute at draw time:
//!
//! - [`VertexAttribute`] describes the element format and where the attribute
//!   sits relative to its binding.
//! - [`VertexBinding`] describes the stream the attribute reads from: stride,
//!   base offset and per-instance step rate.
//!
//! The helpers at the bottom compute the effective stride, offset and element
//! count that the buffer factory and the static cache use.

/// Scalar type of a single attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Signed 8-bit integer.
    Byte,
    /// Unsigned 8-bit integer.
    UnsignedByte,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UnsignedShort,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    UnsignedInt,
    /// 16-bit IEEE half float.
    HalfFloat,
    /// 32-bit IEEE float.
    Float,
    /// 16.16 signed fixed point.
    Fixed,
}

impl ComponentType {
    /// Size in bytes of one component as it appears in client memory.
    pub fn size(&self) -> u32 {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort | Self::HalfFloat => 2,
            Self::Int | Self::UnsignedInt | Self::Float | Self::Fixed => 4,
        }
    }

    /// Size in bytes of one component once stored in a vertex buffer.
    ///
    /// Fixed point has no device format and is widened to `f32`, which
    /// happens to keep the same size.
    pub fn stored_size(&self) -> u32 {
        match self {
            Self::Fixed => 4,
            other => other.size(),
        }
    }

    /// Whether stored data of this type must be converted on upload.
    pub fn requires_conversion(&self) -> bool {
        matches!(self, Self::Fixed)
    }
}

/// Type of the current generic value used for a disabled attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurrentValueType {
    /// Four 32-bit floats.
    #[default]
    Float,
    /// Four 32-bit signed integers.
    Int,
    /// Four 32-bit unsigned integers.
    UnsignedInt,
}

impl CurrentValueType {
    /// Component type of the current value.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Float => ComponentType::Float,
            Self::Int => ComponentType::Int,
            Self::UnsignedInt => ComponentType::UnsignedInt,
        }
    }

    /// Size in bytes of one current value (always four components).
    pub const SIZE: u32 = 16;
}

/// A single vertex attribute as seen by the draw-call path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Component scalar type.
    pub component_type: ComponentType,
    /// Number of components (1 to 4).
    pub component_count: u32,
    /// Whether integer data is normalized to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
    /// Whether the shader reads the data as integers.
    pub pure_integer: bool,
    /// Whether the attribute array is enabled.
    ///
    /// Disabled attributes stream the current generic value instead.
    pub enabled: bool,
    /// Byte offset of the attribute relative to its binding offset.
    pub relative_offset: u32,
    /// Index of the binding this attribute reads from.
    pub binding_index: u32,
}

impl VertexAttribute {
    /// Create an enabled attribute with the given format.
    pub fn new(component_type: ComponentType, component_count: u32) -> Self {
        debug_assert!(
            (1..=4).contains(&component_count),
            "component count must be 1..=4, got {component_count}"
        );
        Self {
            component_type,
            component_count,
            normalized: false,
            pure_integer: false,
            enabled: true,
            relative_offset: 0,
            binding_index: 0,
        }
    }

    /// Create a float attribute with `count` components.
    pub fn float(count: u32) -> Self {
        Self::new(ComponentType::Float, count)
    }

    /// Set the normalized flag.
    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Mark the attribute as read by the shader as integers.
    pub fn with_pure_integer(mut self, pure_integer: bool) -> Self {
        self.pure_integer = pure_integer;
        self
    }

    /// Set the relative offset.
    pub fn with_relative_offset(mut self, offset: u32) -> Self {
        self.relative_offset = offset;
        self
    }

    /// Set the binding index.
    pub fn with_binding_index(mut self, index: u32) -> Self {
        self.binding_index = index;
        self
    }

    /// Disable the attribute array.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Size in bytes of one element in client memory.
    pub fn element_size(&self) -> u32 {
        self.component_type.size() * self.component_count
    }
}

/// A vertex buffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexBinding {
    /// Byte stride between elements; `0` means tightly packed.
    pub stride: u32,
    /// Base byte offset of the binding.
    pub offset: u64,
    /// Per-instance step rate; `0` steps per vertex.
    pub divisor: u32,
}

impl VertexBinding {
    /// Create a per-vertex binding with the given stride.
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            offset: 0,
            divisor: 0,
        }
    }

    /// Create a per-instance binding.
    pub fn per_instance(stride: u32, divisor: u32) -> Self {
        Self {
            stride,
            offset: 0,
            divisor,
        }
    }

    /// Set the base offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the divisor.
    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }
}

/// Effective stride of an attribute, resolving tightly-packed bindings.
pub fn compute_vertex_attribute_stride(attribute: &VertexAttribute, binding: &VertexBinding) -> u32 {
    if binding.stride == 0 {
        attribute.element_size()
    } else {
        binding.stride
    }
}

/// Effective start offset of an attribute within its buffer.
pub fn compute_vertex_attribute_offset(attribute: &VertexAttribute, binding: &VertexBinding) -> u64 {
    binding.offset + u64::from(attribute.relative_offset)
}

/// Number of elements a draw reads from an attribute.
///
/// Instanced attributes advance once every `divisor` instances; everything
/// else advances once per vertex.
pub fn compute_vertex_attribute_element_count(
    binding: &VertexBinding,
    vertex_count: usize,
    instances: u32,
) -> usize {
    if instances != 0 && binding.divisor > 0 {
        instances.div_ceil(binding.divisor) as usize
    } else {
        vertex_count
    }
}
