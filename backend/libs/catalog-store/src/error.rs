//! Error types for the catalog store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Record-type misconfiguration detected while deriving a schema.
///
/// These are startup bugs: a service that hits one must not serve requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("record `{record}` declares no usable columns")]
    NoColumns { record: String },

    #[error("record `{record}` declares column `{column}` more than once")]
    DuplicateColumn { record: String, column: String },

    #[error("record `{record}` declares key column `{column}` more than once")]
    DuplicateKey { record: String, column: String },

    #[error("record `{record}` maps two columns onto field #{field}")]
    DuplicateField { record: String, field: usize },

    #[error("record `{record}` column `{column}` points at field #{field}, but the record has {fields} fields")]
    FieldOutOfRange {
        record: String,
        column: String,
        field: usize,
        fields: usize,
    },

    #[error("schema for `{expected}` cannot be used with `{found}` records")]
    RecordMismatch { expected: String, found: String },
}

/// Errors that can occur in the persistence and query-translation engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record type misconfiguration
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Caller handed the batch builder records it cannot build
    #[error("Batch input error: {0}")]
    BatchInput(String),

    /// Result shape does not match the destination
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A column value could not be converted to its field kind
    #[error("Conversion error on column `{column}`: expected {expected}, found {found}")]
    Conversion {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// Malformed pagination token
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Projection or sort field that the record does not have
    #[error("Unknown column `{column}` for `{record}`")]
    UnknownColumn { record: String, column: String },

    /// A statement inside a batch failed; `succeeded` is diagnostic only
    #[error("Batch failed after {succeeded} statements: {source}")]
    BatchExecution {
        succeeded: u64,
        #[source]
        source: Box<StoreError>,
    },

    /// A statement failed and the rollback that followed failed as well
    #[error("Rollback failed after {succeeded} statements (statement error: {statement}): {rollback}")]
    RollbackFailed {
        succeeded: u64,
        statement: Box<StoreError>,
        rollback: Box<StoreError>,
    },

    /// Relational driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Columnar session error
    #[error("Session error: {0}")]
    Session(String),

    /// Filter document serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Errors caused by caller input rather than by the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidCursor(_) | StoreError::UnknownColumn { .. }
        )
    }

    /// Errors that mean the service was wired up incorrectly.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, StoreError::Schema(_))
    }

    pub(crate) fn conversion(column: &str, expected: &'static str, found: impl Into<String>) -> Self {
        StoreError::Conversion {
            column: column.to_string(),
            expected,
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::InvalidCursor("abc|x".to_string());
        assert_eq!(err.to_string(), "Invalid cursor: abc|x");

        let err = StoreError::from(SchemaError::NoColumns {
            record: "video".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Schema error: record `video` declares no usable columns"
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(StoreError::InvalidCursor(String::new()).is_client_error());
        assert!(StoreError::UnknownColumn {
            record: "video".into(),
            column: "nope".into()
        }
        .is_client_error());
        assert!(!StoreError::Session("down".into()).is_client_error());
        assert!(StoreError::from(SchemaError::NoColumns {
            record: "video".into()
        })
        .is_configuration_error());
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_batch_error_keeps_source() {
        let err = StoreError::BatchExecution {
            succeeded: 5,
            source: Box::new(StoreError::Session("timeout".into())),
        };
        assert_eq!(
            err.to_string(),
            "Batch failed after 5 statements: Session error: timeout"
        );
    }
}
