#[macro_use]
extern crate criterion;

use cql_frame_codec::{ColumnMetadata, Frame, ProtocolVersion, ResultSet, TypeDescriptor};
use criterion::{black_box, Criterion};

fn rows_body() -> Vec<u8> {
    let metadata = ColumnMetadata::new(vec![
        ("ks".into(), "t".into(), "name".into(), TypeDescriptor::Text),
        ("ks".into(), "t".into(), "score".into(), TypeDescriptor::Int),
    ]);
    let rows = vec![
        vec![
            Some(cql_frame_codec::Value::Text("alice".into())),
            Some(cql_frame_codec::Value::Int(1)),
        ],
        vec![
            Some(cql_frame_codec::Value::Text("bob".into())),
            Some(cql_frame_codec::Value::Int(2)),
        ],
    ];

    let mut body = Frame::new();
    body.pack_int(0); // flags: no global table spec
    body.pack_int(2); // column count
    for col in &["name", "score"] {
        body.pack_string("ks");
        body.pack_string("t");
        body.pack_string(col);
        if *col == "name" {
            body.pack_short(0x000A); // text
        } else {
            body.pack_short(0x0009); // int
        }
    }
    body.pack_int(rows.len() as i32);
    let encoded_rows: Vec<Vec<Option<Vec<u8>>>> = rows
        .iter()
        .map(|row| metadata.encode_data(row).unwrap())
        .collect();
    for row in encoded_rows {
        for cell in row {
            body.pack_bytes(cell.as_deref());
        }
    }
    body.into_bytes()
}

fn criterion_benchmark(c: &mut Criterion) {
    let raw = rows_body();

    c.bench_function("decode RESULT_ROWS", |b| {
        b.iter(|| {
            let mut frame = Frame::from_bytes(black_box(raw.clone()));
            let _ = ResultSet::from_frame(&mut frame, ProtocolVersion::V2).unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
