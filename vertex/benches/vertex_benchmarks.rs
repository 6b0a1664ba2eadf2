use criterion::{Criterion, black_box, criterion_group, criterion_main};

use redlilium_vertex::{
    ComponentType, CurrentValueType, DeviceDescriptor, StaticVertexBuffer,
    StreamingVertexBuffer, VertexAttribute, VertexBinding, VertexDevice, conversion,
};

fn vec4_source(count: usize) -> Vec<u8> {
    let data: Vec<f32> = (0..count * 4).map(|v| v as f32).collect();
    bytemuck::cast_slice(&data).to_vec()
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

fn bench_streaming_store(c: &mut Criterion) {
    let device = VertexDevice::new(DeviceDescriptor::new());
    let mut stream = StreamingVertexBuffer::with_initial_size(device.clone(), 1 << 20).unwrap();
    let attribute = VertexAttribute::float(4);
    let binding = VertexBinding::new(16);
    let source = vec4_source(256);

    c.bench_function("streaming_store_256_vec4", |b| {
        b.iter(|| {
            let offset = stream
                .store_dynamic_attribute(
                    &attribute,
                    &binding,
                    CurrentValueType::Float,
                    0,
                    256,
                    0,
                    black_box(&source),
                )
                .unwrap();
            device.collect_retired();
            black_box(offset);
        });
    });
}

fn bench_streaming_draw_with_reservation(c: &mut Criterion) {
    let device = VertexDevice::new(DeviceDescriptor::new());
    let mut stream = StreamingVertexBuffer::with_initial_size(device.clone(), 64 * 1024).unwrap();
    let position = VertexAttribute::float(3);
    let position_binding = VertexBinding::new(12);
    let color = VertexAttribute::new(ComponentType::UnsignedByte, 4).with_normalized(true);
    let color_binding = VertexBinding::new(4);
    let positions = vec![0u8; 12 * 128];
    let colors = vec![255u8; 4 * 128];

    c.bench_function("streaming_draw_2_attributes_128_vertices", |b| {
        b.iter(|| {
            stream
                .reserve_vertex_space(&position, &position_binding, 128, 0)
                .unwrap();
            stream
                .reserve_vertex_space(&color, &color_binding, 128, 0)
                .unwrap();
            let position_offset = stream
                .store_dynamic_attribute(
                    &position,
                    &position_binding,
                    CurrentValueType::Float,
                    0,
                    128,
                    0,
                    &positions,
                )
                .unwrap();
            let color_offset = stream
                .store_dynamic_attribute(
                    &color,
                    &color_binding,
                    CurrentValueType::Float,
                    0,
                    128,
                    0,
                    &colors,
                )
                .unwrap();
            device.collect_retired();
            black_box((position_offset, color_offset));
        });
    });
}

// ---------------------------------------------------------------------------
// Static cache
// ---------------------------------------------------------------------------

fn bench_static_cache_hit(c: &mut Criterion) {
    let device = VertexDevice::new(DeviceDescriptor::new());
    let mut cache = StaticVertexBuffer::new(device);
    let attribute = VertexAttribute::float(3);
    let binding = VertexBinding::new(12);
    cache
        .store_static_attribute(&attribute, &binding, 0, 64, 0, &[0u8; 12 * 64])
        .unwrap();

    c.bench_function("static_cache_matches_attribute", |b| {
        b.iter(|| black_box(cache.matches_attribute(black_box(&attribute), &binding)));
    });
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn bench_pack_fixed_point(c: &mut Criterion) {
    let attribute = VertexAttribute::new(ComponentType::Fixed, 4);
    let binding = VertexBinding::new(0);
    let source: Vec<u8> = bytemuck::cast_slice(&vec![65536i32; 4 * 1024]).to_vec();

    c.bench_function("pack_fixed_point_1024_vec4", |b| {
        b.iter(|| {
            let packed = conversion::pack_vertex_attribute(
                &attribute,
                &binding,
                CurrentValueType::Float,
                0,
                1024,
                0,
                black_box(&source),
            )
            .unwrap();
            black_box(packed);
        });
    });
}

criterion_group!(
    benches,
    bench_streaming_store,
    bench_streaming_draw_with_reservation,
    bench_static_cache_hit,
    bench_pack_fixed_point,
);
criterion_main!(benches);
