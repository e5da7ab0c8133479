#[macro_use]
extern crate criterion;

use cql_frame_codec::{ColumnMetadata, TypeDescriptor, Value};
use criterion::{black_box, Criterion};

fn criterion_benchmark(c: &mut Criterion) {
    let metadata = ColumnMetadata::new(vec![
        ("ks".into(), "t".into(), "name".into(), TypeDescriptor::Text),
        ("ks".into(), "t".into(), "score".into(), TypeDescriptor::Int),
    ]);
    let row = vec![
        Some(Value::Text("alice".to_string())),
        Some(Value::Int(42)),
    ];

    c.bench_function("encode_data single row", |b| {
        b.iter(|| {
            let _ = metadata.encode_data(black_box(&row)).unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
