//! Column/key metadata derived once per record type.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{SchemaError, StoreError, StoreResult};
use crate::record::Record;
use crate::row::FieldIndexTable;
use crate::value::FieldKind;

/// One persisted column of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Position of the backing field inside the record
    pub field: usize,
    pub kind: FieldKind,
    pub key: bool,
    pub insert: bool,
    pub update: bool,
    /// Written as the literal `1` instead of the field value
    pub version: bool,
    pub true_literal: Option<String>,
    pub false_literal: Option<String>,
}

impl Column {
    pub fn new(name: &str, field: usize, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            field,
            kind,
            key: false,
            insert: true,
            update: true,
            version: false,
            true_literal: None,
            false_literal: None,
        }
    }

    /// Part of the record identity.
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn version(mut self) -> Self {
        self.version = true;
        self
    }

    /// Written on insert, never overwritten by an upsert.
    pub fn insert_only(mut self) -> Self {
        self.update = false;
        self
    }

    /// Mapped from result rows but never written.
    pub fn read_only(mut self) -> Self {
        self.insert = false;
        self.update = false;
        self
    }

    pub fn bool_literals(mut self, true_literal: &str, false_literal: &str) -> Self {
        self.true_literal = Some(true_literal.to_string());
        self.false_literal = Some(false_literal.to_string());
        self
    }

    pub fn bool_literal(&self, value: bool) -> String {
        let custom = if value {
            self.true_literal.as_ref()
        } else {
            self.false_literal.as_ref()
        };
        match custom {
            Some(literal) => literal.clone(),
            None if value => "true".to_string(),
            None => "false".to_string(),
        }
    }

    fn usable(&self) -> bool {
        self.insert || self.key
    }
}

/// Derived, immutable metadata for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    record: String,
    columns: Vec<Column>,
    keys: Vec<usize>,
}

impl Schema {
    /// Derive the schema of `R` from its registered description.
    pub fn derive<R: Record>() -> Result<Self, SchemaError> {
        Self::from_columns(R::NAME, R::FIELD_COUNT, R::columns())
    }

    pub fn from_columns(
        record: &str,
        field_count: usize,
        columns: Vec<Column>,
    ) -> Result<Self, SchemaError> {
        if !columns.iter().any(Column::usable) {
            return Err(SchemaError::NoColumns {
                record: record.to_string(),
            });
        }

        let mut names = HashSet::new();
        let mut fields = HashSet::new();
        for column in &columns {
            if column.field >= field_count {
                return Err(SchemaError::FieldOutOfRange {
                    record: record.to_string(),
                    column: column.name.clone(),
                    field: column.field,
                    fields: field_count,
                });
            }
            if !names.insert(column.name.to_lowercase()) {
                let record = record.to_string();
                let column_name = column.name.clone();
                let duplicate_key = column.key
                    || columns
                        .iter()
                        .any(|c| c.key && c.name.eq_ignore_ascii_case(&column.name));
                return Err(if duplicate_key {
                    SchemaError::DuplicateKey {
                        record,
                        column: column_name,
                    }
                } else {
                    SchemaError::DuplicateColumn {
                        record,
                        column: column_name,
                    }
                });
            }
            if !fields.insert(column.field) {
                return Err(SchemaError::DuplicateField {
                    record: record.to_string(),
                    field: column.field,
                });
            }
        }

        let keys = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.key)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        debug!(
            record = record,
            columns = columns.len(),
            keys = keys.len(),
            "Derived record schema"
        );

        Ok(Self {
            record: record.to_string(),
            columns,
            keys,
        })
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    /// Persisted table name.
    pub fn table(&self) -> &str {
        &self.record
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &Column> {
        self.keys.iter().map(move |&i| &self.columns[i])
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn ensure_record<R: Record>(&self) -> Result<(), SchemaError> {
        if self.record == R::NAME {
            Ok(())
        } else {
            Err(SchemaError::RecordMismatch {
                expected: self.record.clone(),
                found: R::NAME.to_string(),
            })
        }
    }
}

/// Schema and row-mapping table of one record type.
#[derive(Debug, Clone)]
pub struct RecordMeta {
    pub schema: Arc<Schema>,
    pub fields: Arc<FieldIndexTable>,
}

/// Startup-time cache of derived schemas keyed by record name.
///
/// Populated once, then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: HashMap<&'static str, RecordMeta>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and cache `R`. Registering the same type twice is a no-op.
    pub fn register<R: Record>(&mut self) -> Result<&RecordMeta, SchemaError> {
        if !self.entries.contains_key(R::NAME) {
            let schema = Schema::derive::<R>()?;
            let fields = FieldIndexTable::for_schema(&schema);
            self.entries.insert(
                R::NAME,
                RecordMeta {
                    schema: Arc::new(schema),
                    fields: Arc::new(fields),
                },
            );
        }
        Ok(&self.entries[R::NAME])
    }

    pub fn with<R: Record>(mut self) -> Result<Self, SchemaError> {
        self.register::<R>()?;
        Ok(self)
    }

    pub fn get<R: Record>(&self) -> StoreResult<&RecordMeta> {
        self.entries.get(R::NAME).ok_or_else(|| {
            StoreError::Mapping(format!("record `{}` was never registered", R::NAME))
        })
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.entries.values().map(|meta| meta.schema.as_ref())
    }
}
