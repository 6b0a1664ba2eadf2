//! Core descriptor types.

mod attribute;
mod buffer;

pub use attribute::{
    ComponentType, CurrentValueType, VertexAttribute, VertexBinding,
    compute_vertex_attribute_element_count, compute_vertex_attribute_offset,
    compute_vertex_attribute_stride,
};
pub use buffer::{BufferDescriptor, BufferUsage};
