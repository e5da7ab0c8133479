//! Column metadata: descriptors, short-name resolution, and vectorised
//! per-row encode/decode against a set of column types.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::opcode::{MetadataFlags, ProtocolVersion};
use crate::types::TypeDescriptor;
use crate::value::Value;

/// One column's fully-qualified name plus its type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub keyspace: String,
    pub table: String,
    pub column: String,
    pub short_name: String,
    pub type_descriptor: TypeDescriptor,
}

impl ColumnDescriptor {
    /// `keyspace.table.column`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.keyspace, self.table, self.column)
    }

    /// `table.column`.
    pub fn table_qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// An ordered set of [`ColumnDescriptor`]s with a resolved short-name index.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    columns: Vec<ColumnDescriptor>,
    name_index: HashMap<String, usize>,
    /// Row width declared on the wire. Equal to `columns.len()` unless this
    /// metadata was parsed with the v2 `NO_METADATA` flag, in which case
    /// descriptors are unavailable but rows still carry this many cells.
    declared_columns: usize,
}

impl ColumnMetadata {
    /// Builds synthetic metadata from literal column descriptions, resolving
    /// short names the same way a frame-parsed result would.
    pub fn new(columns: Vec<(String, String, String, TypeDescriptor)>) -> ColumnMetadata {
        let mut descriptors: Vec<ColumnDescriptor> = columns
            .into_iter()
            .map(|(keyspace, table, column, type_descriptor)| ColumnDescriptor {
                keyspace,
                table,
                column,
                short_name: String::new(),
                type_descriptor,
            })
            .collect();
        let name_index = resolve_short_names(&mut descriptors);
        let declared_columns = descriptors.len();
        ColumnMetadata {
            columns: descriptors,
            name_index,
            declared_columns,
        }
    }

    /// Parses a `RESULT_ROWS` / `RESULT_PREPARED` metadata section from the
    /// front of `frame`.
    pub fn from_frame(frame: &mut Frame, version: ProtocolVersion) -> Result<ColumnMetadata> {
        let raw_flags = frame.unpack_int()?;
        let flags = MetadataFlags::from_bits_truncate(raw_flags);
        let n_columns = frame.unpack_int()? as usize;

        if version == ProtocolVersion::V2 && flags.contains(MetadataFlags::HAS_MORE_PAGES) {
            frame.unpack_bytes()?;
        }

        let global_spec = if flags.contains(MetadataFlags::HAS_GLOBAL_TABLE_SPEC) {
            let keyspace = frame.unpack_string()?;
            let table = frame.unpack_string()?;
            Some((keyspace, table))
        } else {
            None
        };

        let no_metadata = version == ProtocolVersion::V2 && flags.contains(MetadataFlags::NO_METADATA);

        let mut descriptors = Vec::with_capacity(if no_metadata { 0 } else { n_columns });
        if !no_metadata {
            for _ in 0..n_columns {
                let (keyspace, table) = match &global_spec {
                    Some((ks, tbl)) => (ks.clone(), tbl.clone()),
                    None => {
                        let ks = frame.unpack_string()?;
                        let tbl = frame.unpack_string()?;
                        (ks, tbl)
                    }
                };
                let column = frame.unpack_string()?;
                let type_descriptor = TypeDescriptor::read_type(frame)?;
                descriptors.push(ColumnDescriptor {
                    keyspace,
                    table,
                    column,
                    short_name: String::new(),
                    type_descriptor,
                });
            }
        }

        let name_index = resolve_short_names(&mut descriptors);
        tracing::trace!(columns = descriptors.len(), "parsed column metadata");

        Ok(ColumnMetadata {
            columns: descriptors,
            name_index,
            declared_columns: n_columns,
        })
    }

    /// Consumes a metadata section without materialising descriptors; used
    /// for `RESULT_PREPARED` result-metadata that the caller does not need.
    pub fn skip_metadata(frame: &mut Frame, version: ProtocolVersion) -> Result<()> {
        let raw_flags = frame.unpack_int()?;
        let flags = MetadataFlags::from_bits_truncate(raw_flags);
        let n_columns = frame.unpack_int()? as usize;

        if version == ProtocolVersion::V2 && flags.contains(MetadataFlags::HAS_MORE_PAGES) {
            frame.unpack_bytes()?;
        }

        let has_global_spec = flags.contains(MetadataFlags::HAS_GLOBAL_TABLE_SPEC);
        if has_global_spec {
            frame.unpack_string()?;
            frame.unpack_string()?;
        }

        let no_metadata = version == ProtocolVersion::V2 && flags.contains(MetadataFlags::NO_METADATA);
        if no_metadata {
            return Ok(());
        }

        for _ in 0..n_columns {
            if !has_global_spec {
                frame.unpack_string()?;
                frame.unpack_string()?;
            }
            frame.unpack_string()?;
            TypeDescriptor::read_type(frame)?;
        }
        Ok(())
    }

    pub fn columns(&self) -> usize {
        self.declared_columns
    }

    /// True when this metadata was parsed with the v2 `NO_METADATA` flag: the
    /// row width is known but per-column descriptors are not.
    pub fn is_unresolved(&self) -> bool {
        self.columns.is_empty() && self.declared_columns > 0
    }

    pub fn column_name(&self, i: usize) -> Result<String> {
        Ok(self.descriptor(i)?.qualified_name())
    }

    pub fn column_shortname(&self, i: usize) -> Result<&str> {
        Ok(&self.descriptor(i)?.short_name)
    }

    pub fn column_type(&self, i: usize) -> Result<&TypeDescriptor> {
        Ok(&self.descriptor(i)?.type_descriptor)
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    fn descriptor(&self, i: usize) -> Result<&ColumnDescriptor> {
        self.columns.get(i).ok_or(Error::NoSuchColumn(i.to_string()))
    }

    /// Validates and encodes one row of application values against this
    /// metadata's column types, producing wire-ready optional byte strings.
    pub fn encode_data(&self, values: &[Option<Value>]) -> Result<Vec<Option<Vec<u8>>>> {
        if values.len() != self.declared_columns {
            return Err(Error::ArityMismatch {
                expected: self.declared_columns,
                got: values.len(),
            });
        }
        if self.is_unresolved() {
            return Err(Error::Protocol(
                "cannot encode against metadata with no resolved column types (NO_METADATA)"
                    .to_string(),
            ));
        }
        self.columns
            .iter()
            .zip(values)
            .map(|(col, value)| match value {
                None => Ok(None),
                Some(v) => {
                    if let Some(reason) = col.type_descriptor.validate(v) {
                        return Err(Error::EncodeError {
                            column: col.short_name.clone(),
                            reason,
                        });
                    }
                    col.type_descriptor.encode(v).map(Some).map_err(|e| match e {
                        Error::EncodeError { reason, .. } => Error::EncodeError {
                            column: col.short_name.clone(),
                            reason,
                        },
                        other => other,
                    })
                }
            })
            .collect()
    }

    /// Decodes one row's wire byte strings into application values.
    pub fn decode_data(&self, blobs: &[Option<Vec<u8>>]) -> Result<Vec<Option<Value>>> {
        if blobs.len() != self.declared_columns {
            return Err(Error::ArityMismatch {
                expected: self.declared_columns,
                got: blobs.len(),
            });
        }
        if self.is_unresolved() {
            // NO_METADATA: no per-column types available, so hand back the
            // raw bytes untyped. The caller is expected to already know the
            // shape from a previously cached metadata section.
            return Ok(blobs
                .iter()
                .map(|b| b.clone().map(Value::Blob))
                .collect());
        }
        self.columns
            .iter()
            .zip(blobs)
            .map(|(col, blob)| match blob {
                None => Ok(None),
                Some(bytes) => col.type_descriptor.decode(bytes).map(Some),
            })
            .collect()
    }

}

/// Assigns each column the shortest of (`column`, `table.column`,
/// `keyspace.table.column`) that is unique across the whole set, and returns
/// a lookup index for every form that turned out unique.
///
/// A query can legitimately return two columns sharing the same
/// keyspace/table/column triple (`SELECT a, a FROM ks.t`), which the bare and
/// table-qualified forms can't disambiguate either. When even the fully
/// qualified form collides, each colliding column's short name is further
/// suffixed with its 0-based column index so short names stay pairwise unique
/// across the whole set; that synthetic form is never installed in the index
/// since it isn't something a caller could address a column by.
fn resolve_short_names(columns: &mut [ColumnDescriptor]) -> HashMap<String, usize> {
    let bare_counts = count_by(columns.iter().map(|c| c.column.clone()));
    let table_counts = count_by(columns.iter().map(|c| c.table_qualified_name()));
    let qualified_counts = count_by(columns.iter().map(|c| c.qualified_name()));

    let mut index = HashMap::new();
    for (i, col) in columns.iter_mut().enumerate() {
        let qualified = col.qualified_name();
        let table_qualified = col.table_qualified_name();

        col.short_name = if bare_counts[&col.column] == 1 {
            col.column.clone()
        } else if table_counts[&table_qualified] == 1 {
            table_qualified.clone()
        } else if qualified_counts[&qualified] == 1 {
            qualified.clone()
        } else {
            format!("{qualified}#{i}")
        };

        if bare_counts[&col.column] == 1 {
            index.insert(col.column.clone(), i);
        }
        if table_counts[&table_qualified] == 1 {
            index.insert(table_qualified, i);
        }
        if qualified_counts[&qualified] == 1 {
            index.insert(qualified, i);
        }
    }
    index
}

fn count_by(items: impl Iterator<Item = String>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(cols: &[(&str, &str, &str)]) -> ColumnMetadata {
        ColumnMetadata::new(
            cols.iter()
                .map(|(ks, tbl, col)| {
                    (
                        ks.to_string(),
                        tbl.to_string(),
                        col.to_string(),
                        TypeDescriptor::Text,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn short_names_prefer_bare_when_unique() {
        let m = meta(&[("ks", "t", "a"), ("ks", "t", "b")]);
        assert_eq!(m.column_shortname(0).unwrap(), "a");
        assert_eq!(m.column_shortname(1).unwrap(), "b");
    }

    #[test]
    fn short_names_fall_back_to_table_qualified() {
        let m = meta(&[("ks", "t1", "a"), ("ks", "t2", "a")]);
        assert_eq!(m.column_shortname(0).unwrap(), "t1.a");
        assert_eq!(m.column_shortname(1).unwrap(), "t2.a");
    }

    #[test]
    fn short_names_fall_back_to_fully_qualified() {
        let m = meta(&[("ks1", "t", "a"), ("ks2", "t", "a")]);
        assert_eq!(m.column_shortname(0).unwrap(), "ks1.t.a");
        assert_eq!(m.column_shortname(1).unwrap(), "ks2.t.a");
    }

    #[test]
    fn find_column_resolves_any_installed_form() {
        let m = meta(&[("ks1", "t", "a"), ("ks2", "t", "a")]);
        assert_eq!(m.find_column("ks1.t.a"), Some(0));
        assert_eq!(m.find_column("a"), None);
    }

    #[test]
    fn short_names_stay_unique_for_duplicate_triples() {
        // SELECT a, a FROM ks.t: identical keyspace/table/column, so even the
        // fully qualified form collides.
        let m = meta(&[("ks", "t", "a"), ("ks", "t", "a")]);
        assert_eq!(m.column_shortname(0).unwrap(), "ks.t.a#0");
        assert_eq!(m.column_shortname(1).unwrap(), "ks.t.a#1");
        assert_ne!(m.column_shortname(0).unwrap(), m.column_shortname(1).unwrap());
        // The colliding qualified form is ambiguous, so it isn't installed.
        assert_eq!(m.find_column("ks.t.a"), None);
    }

    #[test]
    fn encode_data_arity_mismatch() {
        let m = meta(&[("ks", "t", "a")]);
        let err = m.encode_data(&[]).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { expected: 1, got: 0 }));
    }
}
