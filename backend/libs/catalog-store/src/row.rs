//! Mapping heterogeneous result rows back onto typed records.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::schema::Schema;
use crate::value::{FieldKind, Value};

/// One result row as returned by a backend: column name and raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.push(column, value);
        self
    }

    /// Case-insensitive column lookup.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Lower-cased column name → (field index, kind) for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndexTable {
    record: String,
    entries: HashMap<String, (usize, FieldKind)>,
}

impl FieldIndexTable {
    pub fn for_schema(schema: &Schema) -> Self {
        let entries = schema
            .columns()
            .iter()
            .map(|c| (c.name.to_lowercase(), (c.field, c.kind)))
            .collect();
        Self {
            record: schema.record().to_string(),
            entries,
        }
    }

    pub fn build<R: Record>() -> StoreResult<Self> {
        Ok(Self::for_schema(&Schema::derive::<R>()?))
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn lookup(&self, column: &str) -> Option<(usize, FieldKind)> {
        self.entries.get(&column.to_lowercase()).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.lookup(column).is_some()
    }

    /// Canonical (lower-case) name of `column`, or `UnknownColumn`.
    pub fn resolve(&self, column: &str) -> StoreResult<String> {
        let name = column.to_lowercase();
        if self.entries.contains_key(&name) {
            Ok(name)
        } else {
            Err(StoreError::UnknownColumn {
                record: self.record.clone(),
                column: column.to_string(),
            })
        }
    }
}

/// Reconstitute records from `rows` and append them to `dest`.
///
/// Unknown columns are skipped and missing columns leave the field at its
/// zero value. The first conversion failure aborts the scan; `dest` is only
/// extended when every row mapped cleanly.
pub fn scan_into<R: Record>(
    rows: Vec<Row>,
    table: &FieldIndexTable,
    dest: &mut Vec<R>,
) -> StoreResult<()> {
    if table.record() != R::NAME {
        return Err(StoreError::Mapping(format!(
            "field table for `{}` cannot map `{}` records",
            table.record(),
            R::NAME
        )));
    }

    let mut scanned = Vec::with_capacity(rows.len());
    for row in rows {
        let mut record = R::default();
        for (column, raw) in row {
            let Some((field, kind)) = table.lookup(&column) else {
                continue;
            };
            let value = raw.convert(kind, &column)?;
            if !record.set(field, value) {
                return Err(StoreError::conversion(&column, kind.as_str(), "value out of range"));
            }
        }
        scanned.push(record);
    }

    debug!(record = R::NAME, rows = scanned.len(), "Mapped result rows");
    dest.extend(scanned);
    Ok(())
}

/// Convenience wrapper around [`scan_into`] producing a fresh vector.
pub fn map_rows<R: Record>(rows: Vec<Row>, table: &FieldIndexTable) -> StoreResult<Vec<R>> {
    let mut records = Vec::new();
    scan_into(rows, table, &mut records)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Debug, Default, PartialEq)]
    struct Clip {
        id: String,
        title: String,
        duration: i64,
        tags: Vec<String>,
        published: chrono::DateTime<Utc>,
    }

    crate::impl_record!(Clip => "clip" {
        id: "id" [key],
        title: "title",
        duration: "duration",
        tags: "tags",
        published: "publishedat",
    });

    #[derive(Debug, Default)]
    struct Other {
        id: String,
    }

    crate::impl_record!(Other => "other" { id: "id" [key] });

    fn table() -> FieldIndexTable {
        FieldIndexTable::build::<Clip>().unwrap()
    }

    #[test]
    fn test_scan_is_case_insensitive_and_skips_unknown() {
        let rows = vec![Row::new()
            .with("ID", Value::Text("c1".into()))
            .with("Title", Value::Text("Cats".into()))
            .with("Duration", Value::Text("93".into()))
            .with("unrelated", Value::Int(1))
            .with("PublishedAt", Value::Text("2020-01-02 03:04:05".into()))];

        let clips: Vec<Clip> = map_rows(rows, &table()).unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].id, "c1");
        assert_eq!(clips[0].title, "Cats");
        assert_eq!(clips[0].duration, 93);
        assert_eq!(
            clips[0].published,
            Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn test_missing_column_leaves_zero_value() {
        let rows = vec![Row::new().with("id", Value::Text("c2".into()))];
        let clips: Vec<Clip> = map_rows(rows, &table()).unwrap();
        assert_eq!(clips[0].duration, 0);
        assert!(clips[0].tags.is_empty());
        assert_eq!(clips[0].title, "");
    }

    #[test]
    fn test_conversion_failure_yields_no_partial_results() {
        let rows = vec![
            Row::new().with("id", Value::Text("ok".into())),
            Row::new().with("tags", Value::Int(3)),
        ];
        let mut dest: Vec<Clip> = Vec::new();
        let err = scan_into(rows, &table(), &mut dest).unwrap_err();
        match err {
            StoreError::Conversion { column, .. } => assert_eq!(column, "tags"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(dest.is_empty());
    }

    #[test]
    fn test_wrong_record_type_is_mapping_error() {
        let mut dest: Vec<Other> = Vec::new();
        let err = scan_into(Vec::new(), &table(), &mut dest).unwrap_err();
        assert!(matches!(err, StoreError::Mapping(_)));
    }

    #[test]
    fn test_resolve_rejects_unknown_column() {
        assert_eq!(table().resolve("PublishedAt").unwrap(), "publishedat");
        let err = table().resolve("nope").unwrap_err();
        assert!(err.is_client_error());
    }
}
