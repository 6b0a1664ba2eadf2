//! Packing of client attribute data into vertex buffer layout.
//!
//! Source data arrives with an arbitrary stride. Stored data is always
//! tightly packed, one element after another, so the device binding uses the
//! stored element size as its stride. Fixed-point components are widened to
//! `f32`; every other component type is copied verbatim.

use crate::error::VertexBufferError;
use crate::types::{
    ComponentType, CurrentValueType, VertexAttribute, VertexBinding,
    compute_vertex_attribute_element_count, compute_vertex_attribute_stride,
};

/// Component type and count actually written for an attribute.
///
/// Disabled attributes stream the four-component current value.
pub fn stored_format(
    attribute: &VertexAttribute,
    current_value_type: CurrentValueType,
) -> (ComponentType, u32) {
    if attribute.enabled {
        (attribute.component_type, attribute.component_count)
    } else {
        (current_value_type.component_type(), 4)
    }
}

/// Bytes written per element.
pub fn stored_element_size(
    attribute: &VertexAttribute,
    current_value_type: CurrentValueType,
) -> u32 {
    let (component_type, count) = stored_format(attribute, current_value_type);
    component_type.stored_size() * count
}

/// Number of elements written for a draw.
///
/// A disabled attribute is a single constant value regardless of the draw.
pub fn stored_element_count(
    attribute: &VertexAttribute,
    binding: &VertexBinding,
    vertex_count: usize,
    instances: u32,
) -> usize {
    if attribute.enabled {
        compute_vertex_attribute_element_count(binding, vertex_count, instances)
    } else {
        1
    }
}

/// Exact number of bytes written for a draw, or `None` on overflow.
pub fn stored_byte_count(
    attribute: &VertexAttribute,
    binding: &VertexBinding,
    current_value_type: CurrentValueType,
    vertex_count: usize,
    instances: u32,
) -> Option<u32> {
    let count = stored_element_count(attribute, binding, vertex_count, instances);
    let count = u32::try_from(count).ok()?;
    stored_element_size(attribute, current_value_type).checked_mul(count)
}

/// Locate the source elements of a draw.
///
/// Returns `(first byte, stride, element count)`.
fn source_layout(
    attribute: &VertexAttribute,
    binding: &VertexBinding,
    start: u32,
    vertex_count: usize,
    instances: u32,
) -> Option<(usize, usize, usize)> {
    if !attribute.enabled {
        return Some((0, 0, 1));
    }

    let stride = compute_vertex_attribute_stride(attribute, binding) as usize;
    let count = compute_vertex_attribute_element_count(binding, vertex_count, instances);
    let first = if instances == 0 || binding.divisor == 0 {
        (start as usize).checked_mul(stride)?
    } else {
        0
    };
    Some((first, stride, count))
}

/// Check that `source` covers every element a draw reads.
///
/// Returns `(first byte, stride, element count)` of the source elements.
fn checked_source_layout(
    attribute: &VertexAttribute,
    binding: &VertexBinding,
    source_element_size: usize,
    start: u32,
    vertex_count: usize,
    instances: u32,
    source_len: usize,
) -> Result<(usize, usize, usize), VertexBufferError> {
    let overflow = || VertexBufferError::out_of_memory("vertex attribute byte count overflow");

    let (first, stride, count) =
        source_layout(attribute, binding, start, vertex_count, instances).ok_or_else(overflow)?;

    if count > 0 {
        let end = (count - 1)
            .checked_mul(stride)
            .and_then(|v| v.checked_add(first))
            .and_then(|v| v.checked_add(source_element_size))
            .ok_or_else(overflow)?;
        if end > source_len {
            return Err(VertexBufferError::out_of_memory(format!(
                "attribute source holds {source_len} bytes but the draw reads {end}"
            )));
        }
    }

    Ok((first, stride, count))
}

/// Validate the source of a draw without packing it.
///
/// # Errors
///
/// Same conditions as [`pack_vertex_attribute`].
pub fn validate_attribute_source(
    attribute: &VertexAttribute,
    binding: &VertexBinding,
    current_value_type: CurrentValueType,
    start: u32,
    vertex_count: usize,
    instances: u32,
    source: &[u8],
) -> Result<(), VertexBufferError> {
    let (component_type, component_count) = stored_format(attribute, current_value_type);
    checked_source_layout(
        attribute,
        binding,
        (component_type.size() * component_count) as usize,
        start,
        vertex_count,
        instances,
        source.len(),
    )
    .map(|_| ())
}

/// Pack the elements of one attribute for a draw.
///
/// # Errors
///
/// Returns [`VertexBufferError::OutOfMemory`] if the source slice does not
/// cover every element the draw reads, or if a byte count overflows.
pub fn pack_vertex_attribute(
    attribute: &VertexAttribute,
    binding: &VertexBinding,
    current_value_type: CurrentValueType,
    start: u32,
    vertex_count: usize,
    instances: u32,
    source: &[u8],
) -> Result<Vec<u8>, VertexBufferError> {
    let (component_type, component_count) = stored_format(attribute, current_value_type);
    let source_element_size = (component_type.size() * component_count) as usize;
    let (first, stride, count) = checked_source_layout(
        attribute,
        binding,
        source_element_size,
        start,
        vertex_count,
        instances,
        source.len(),
    )?;

    let stored_size = (component_type.stored_size() * component_count) as usize;
    let capacity = count.checked_mul(stored_size).ok_or_else(|| {
        VertexBufferError::out_of_memory("vertex attribute byte count overflow")
    })?;
    let mut packed = Vec::with_capacity(capacity);
    for index in 0..count {
        let offset = first + index * stride;
        let element = &source[offset..offset + source_element_size];
        if component_type.requires_conversion() {
            convert_fixed_to_float(element, &mut packed);
        } else {
            packed.extend_from_slice(element);
        }
    }

    Ok(packed)
}

/// Widen 16.16 fixed-point components to `f32`.
fn convert_fixed_to_float(element: &[u8], out: &mut Vec<u8>) {
    for component in element.chunks_exact(4) {
        let fixed: i32 = bytemuck::pod_read_unaligned(component);
        let value = fixed as f32 / 65536.0;
        out.extend_from_slice(bytemuck::bytes_of(&value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_tightly_packed_floats() {
        let attribute = VertexAttribute::float(2);
        let binding = VertexBinding::new(0);
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let source = bytemuck::cast_slice(&data);

        let packed = pack_vertex_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            1,
            2,
            0,
            source,
        )
        .unwrap();
        let values: Vec<f32> = packed
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_pack_strided_source() {
        // Interleaved: position (float) + padding (float)
        let attribute = VertexAttribute::float(1);
        let binding = VertexBinding::new(8);
        let data: Vec<f32> = vec![1.0, -1.0, 2.0, -1.0, 3.0, -1.0];

        let packed = pack_vertex_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            0,
            3,
            0,
            bytemuck::cast_slice(&data),
        )
        .unwrap();
        let values: Vec<f32> = packed
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_pack_instanced_ignores_start() {
        let attribute = VertexAttribute::new(ComponentType::UnsignedByte, 4);
        let binding = VertexBinding::per_instance(4, 1);
        let source: Vec<u8> = (0..8).collect();

        let packed = pack_vertex_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            100,
            3,
            2,
            &source,
        )
        .unwrap();
        assert_eq!(packed, source);
    }

    #[test]
    fn test_pack_fixed_point() {
        let attribute = VertexAttribute::new(ComponentType::Fixed, 2);
        let binding = VertexBinding::new(0);
        let data: Vec<i32> = vec![65536, -32768];

        let packed = pack_vertex_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            0,
            1,
            0,
            bytemuck::cast_slice(&data),
        )
        .unwrap();
        let values: Vec<f32> = packed
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(values, vec![1.0, -0.5]);
    }

    #[test]
    fn test_pack_disabled_uses_current_value() {
        let attribute = VertexAttribute::float(2).disabled();
        let binding = VertexBinding::new(0);
        let value: [f32; 4] = [0.25, 0.5, 0.75, 1.0];

        let packed = pack_vertex_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            10,
            100,
            0,
            bytemuck::bytes_of(&value),
        )
        .unwrap();
        assert_eq!(packed.len(), 16);
        assert_eq!(
            stored_byte_count(&attribute, &binding, CurrentValueType::Float, 100, 0),
            Some(16)
        );
    }

    #[test]
    fn test_pack_short_source_fails() {
        let attribute = VertexAttribute::float(4);
        let binding = VertexBinding::new(16);
        let source = vec![0u8; 40];

        let result = pack_vertex_attribute(
            &attribute,
            &binding,
            CurrentValueType::Float,
            0,
            3,
            0,
            &source,
        );
        assert!(matches!(result, Err(VertexBufferError::OutOfMemory(_))));
    }

    #[test]
    fn test_stored_byte_count_overflow() {
        let attribute = VertexAttribute::float(4);
        let binding = VertexBinding::new(16);
        assert_eq!(
            stored_byte_count(&attribute, &binding, CurrentValueType::Float, 1 << 30, 0),
            None
        );
    }

    #[test]
    fn test_validate_source_with_start_offset() {
        let attribute = VertexAttribute::float(1);
        let binding = VertexBinding::new(4);
        let source = vec![0u8; 16];

        // Elements 2 and 3 end exactly at the slice end
        assert!(
            validate_attribute_source(
                &attribute,
                &binding,
                CurrentValueType::Float,
                2,
                2,
                0,
                &source
            )
            .is_ok()
        );
        assert!(
            validate_attribute_source(
                &attribute,
                &binding,
                CurrentValueType::Float,
                3,
                2,
                0,
                &source
            )
            .is_err()
        );
    }
}
