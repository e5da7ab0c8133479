use cql_frame_codec::{Frame, ProtocolVersion, ResultSet, Value};

/// Builds a `RESULT_ROWS` body: flags=HAS_GLOBAL_TABLE_SPEC, one text column
/// `test.table.column`, one row with value `"data"`.
fn single_row_body() -> Vec<u8> {
    let mut body = Frame::new();
    body.pack_int(0x0001); // HAS_GLOBAL_TABLE_SPEC
    body.pack_int(1); // one column
    body.pack_string("test");
    body.pack_string("table");
    body.pack_string("column");
    body.pack_short(0x000A); // text
    body.pack_int(1); // one row
    body.pack_bytes(Some(b"data"));
    body.into_bytes()
}

#[test]
fn decodes_result_rows_end_to_end() {
    let mut frame = Frame::from_bytes(single_row_body());
    let rs = ResultSet::from_frame(&mut frame, ProtocolVersion::V2).unwrap();

    assert_eq!(rs.rows(), 1);
    assert_eq!(
        rs.row_array(0).unwrap(),
        vec![Some(Value::Text("data".to_string()))]
    );
    let hash = rs.row_hash(0).unwrap();
    assert_eq!(hash.get("column"), Some(&Some(Value::Text("data".to_string()))));
}

/// Three rows of (name: text, i: int); `rowmap_hash("name")` should have one
/// entry per distinct name.
#[test]
fn rowmap_hash_over_multiple_rows() {
    let mut body = Frame::new();
    body.pack_int(0x0001);
    body.pack_int(2);
    body.pack_string("ks");
    body.pack_string("t");
    body.pack_string("name");
    body.pack_short(0x000A); // text
    body.pack_string("i");
    body.pack_short(0x0009); // int

    let data = [("zero", 0i32), ("one", 1), ("two", 2)];
    body.pack_int(data.len() as i32);
    for (name, i) in data {
        body.pack_bytes(Some(name.as_bytes()));
        body.pack_bytes(Some(&i.to_be_bytes()));
    }

    let mut frame = Frame::from_bytes(body.into_bytes());
    let rs = ResultSet::from_frame(&mut frame, ProtocolVersion::V2).unwrap();

    let map = rs.rowmap_hash("name").unwrap();
    assert_eq!(map.len(), 3);
    for (name, i) in data {
        let record = map
            .get(&cql_frame_codec::RowKey(Value::Text(name.to_string())))
            .unwrap();
        assert_eq!(record.get("i"), Some(&Some(Value::Int(i))));
    }
}

#[test]
fn no_metadata_flag_skips_column_entries() {
    let mut body = Frame::new();
    body.pack_int(0x0004); // NO_METADATA
    body.pack_int(0); // column count irrelevant, but present on the wire
    body.pack_int(0); // zero rows

    let mut frame = Frame::from_bytes(body.into_bytes());
    let rs = ResultSet::from_frame(&mut frame, ProtocolVersion::V2).unwrap();
    assert_eq!(rs.metadata().columns(), 0);
    assert_eq!(rs.rows(), 0);
}
