//! Hot-path benchmarks for compact integers and handshake descriptors

use codec::{BufferedInput, BufferedOutput, ProtocolDescriptor};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use types::MessageType;

fn sample_values() -> Vec<i32> {
    (0..1024)
        .map(|i: i32| i.wrapping_mul(0x0101_0101).rotate_left((i % 32) as u32) >> (i % 31))
        .collect()
}

fn bench_compact_int(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact_int");
    let values = sample_values();

    group.bench_function("write_1024", |b| {
        let mut out = BufferedOutput::with_capacity(8 * 1024);
        b.iter(|| {
            out.clear();
            for &v in &values {
                out.write_compact_int(black_box(v));
            }
        });
    });

    let mut out = BufferedOutput::new();
    for &v in &values {
        out.write_compact_int(v);
    }
    let encoded = out.freeze();
    group.bench_function("read_1024", |b| {
        b.iter(|| {
            let mut input = BufferedInput::new(black_box(&encoded));
            let mut sum = 0i64;
            while input.has_available() {
                sum += input.read_compact_int().map(i64::from).unwrap_or(0);
            }
            sum
        });
    });

    group.finish();
}

fn bench_descriptor(c: &mut Criterion) {
    let mut desc = ProtocolDescriptor::new_self("qtp");
    for t in MessageType::ALL.iter().filter(|t| t.has_records()) {
        desc.add_send(desc.new_message_descriptor(*t));
        desc.add_receive(desc.new_message_descriptor(*t));
    }

    c.bench_function("protocol_descriptor_compose", |b| {
        let mut out = BufferedOutput::with_capacity(1024);
        b.iter(|| {
            out.clear();
            black_box(&desc).compose_to(&mut out);
        });
    });

    let mut out = BufferedOutput::new();
    desc.compose_to(&mut out);
    let encoded = out.freeze();
    c.bench_function("protocol_descriptor_parse", |b| {
        b.iter(|| ProtocolDescriptor::parse_from(&mut BufferedInput::new(black_box(&encoded))))
    });
}

criterion_group!(benches, bench_compact_int, bench_descriptor);
criterion_main!(benches);
