//! Result sets: column metadata plus decoded rows, with array/hash/keyed views.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::metadata::ColumnMetadata;
use crate::opcode::ProtocolVersion;
use crate::value::Value;

/// A result set: a [`ColumnMetadata`] plus its decoded rows.
///
/// Composition, not inheritance: `ResultSet` holds a `ColumnMetadata` and
/// forwards its accessors rather than re-declaring them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    metadata: ColumnMetadata,
    rows: Vec<Vec<Option<Value>>>,
}

impl ResultSet {
    /// Parses a `RESULT_ROWS` body (metadata followed by row data) from `frame`.
    pub fn from_frame(frame: &mut Frame, version: ProtocolVersion) -> Result<ResultSet> {
        let metadata = ColumnMetadata::from_frame(frame, version)?;
        let n_rows = frame.unpack_int()? as usize;
        let n_columns = metadata.columns();

        let mut rows = Vec::with_capacity(n_rows);
        for _ in 0..n_rows {
            let mut blobs = Vec::with_capacity(n_columns);
            for _ in 0..n_columns {
                blobs.push(frame.unpack_bytes()?);
            }
            rows.push(metadata.decode_data(&blobs)?);
        }

        tracing::trace!(rows = rows.len(), columns = n_columns, "decoded result set");
        Ok(ResultSet { metadata, rows })
    }

    /// Builds a result set from literal metadata and already-decoded rows,
    /// validating every cell against its column's type.
    pub fn new(metadata: ColumnMetadata, rows: Vec<Vec<Option<Value>>>) -> Result<ResultSet> {
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != metadata.columns() {
                return Err(Error::ArityMismatch {
                    expected: metadata.columns(),
                    got: row.len(),
                });
            }
            for (col_idx, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    if let Some(reason) = metadata.column_type(col_idx)?.validate(value) {
                        return Err(Error::RowValidationError {
                            row: row_idx,
                            column: metadata.column_shortname(col_idx)?.to_string(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(ResultSet { metadata, rows })
    }

    pub fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, i: usize) -> Result<&[Option<Value>]> {
        self.rows
            .get(i)
            .map(Vec::as_slice)
            .ok_or(Error::NoSuchRow(i))
    }

    pub fn row_array(&self, i: usize) -> Result<Vec<Option<Value>>> {
        Ok(self.row(i)?.to_vec())
    }

    pub fn row_hash(&self, i: usize) -> Result<HashMap<String, Option<Value>>> {
        let row = self.row(i)?;
        let mut out = HashMap::with_capacity(row.len());
        for (idx, value) in row.iter().enumerate() {
            let name = self.metadata.column_shortname(idx)?.to_string();
            out.insert(name, value.clone());
        }
        Ok(out)
    }

    pub fn rows_array(&self) -> Result<Vec<Vec<Option<Value>>>> {
        (0..self.rows()).map(|i| self.row_array(i)).collect()
    }

    pub fn rows_hash(&self) -> Result<Vec<HashMap<String, Option<Value>>>> {
        (0..self.rows()).map(|i| self.row_hash(i)).collect()
    }

    /// Rows keyed by the value at `key_index`. Later rows overwrite earlier
    /// ones sharing the same key.
    pub fn rowmap_array(&self, key_index: usize) -> Result<HashMap<RowKey, Vec<Option<Value>>>> {
        let mut out = HashMap::new();
        for i in 0..self.rows() {
            let row = self.row_array(i)?;
            let key = row
                .get(key_index)
                .cloned()
                .ok_or(Error::NoSuchColumn(key_index.to_string()))?
                .ok_or_else(|| Error::Malformed("rowmap key column is absent (NULL)".to_string()))?;
            out.insert(RowKey(key), row);
        }
        Ok(out)
    }

    /// Rows keyed by the named column's value. Later rows overwrite earlier
    /// ones sharing the same key.
    pub fn rowmap_hash(
        &self,
        key_name: &str,
    ) -> Result<HashMap<RowKey, HashMap<String, Option<Value>>>> {
        let key_index = self
            .metadata
            .find_column(key_name)
            .ok_or_else(|| Error::NoSuchColumn(key_name.to_string()))?;
        let mut out = HashMap::new();
        for i in 0..self.rows() {
            let record = self.row_hash(i)?;
            let key = record
                .get(self.metadata.column_shortname(key_index)?)
                .cloned()
                .flatten()
                .ok_or_else(|| Error::Malformed("rowmap key column is absent (NULL)".to_string()))?;
            out.insert(RowKey(key), record);
        }
        Ok(out)
    }
}

/// A [`Value`] used as a hash-map key. Floating-point variants are keyed by
/// bit pattern so the type can implement `Eq`/`Hash`; this only matters for
/// `rowmap_*` grouping keys, never for the codec's core encode/decode path.
#[derive(Debug, Clone)]
pub struct RowKey(pub Value);

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (&self.0, &other.0) {
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

impl Eq for RowKey {}

impl Hash for RowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use Value::*;
        match &self.0 {
            Ascii(s) | Text(s) | Varchar(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            BigInt(v) | Counter(v) | Timestamp(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Blob(b) | Custom(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            Int(v) => {
                4u8.hash(state);
                v.hash(state);
            }
            Float(v) => {
                5u8.hash(state);
                v.to_bits().hash(state);
            }
            Double(v) => {
                6u8.hash(state);
                v.to_bits().hash(state);
            }
            Uuid(u) | TimeUuid(u) => {
                7u8.hash(state);
                u.hash(state);
            }
            Varint(v) => {
                8u8.hash(state);
                v.hash(state);
            }
            Decimal(v) => {
                9u8.hash(state);
                v.to_string().hash(state);
            }
            Inet(addr) => {
                10u8.hash(state);
                addr.hash(state);
            }
            List(items) | Set(items) => {
                11u8.hash(state);
                for item in items {
                    RowKey(item.clone()).hash(state);
                }
            }
            Map(entries) => {
                12u8.hash(state);
                for (k, v) in entries {
                    RowKey(k.clone()).hash(state);
                    RowKey(v.clone()).hash(state);
                }
            }
        }
    }
}
