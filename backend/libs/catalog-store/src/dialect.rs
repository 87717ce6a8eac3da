//! Backend-specific syntax behind one statement builder.

use crate::cursor::{CursorCodec, NativeCursor, OffsetCursor};
use crate::error::StoreResult;
use crate::search::{render_lucene, render_sql, SearchQuery};
use crate::statement::Statement;

/// How an insert becomes an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `INSERT ... ON CONFLICT (keys) DO UPDATE SET ...`
    OnConflict,
    /// A plain `INSERT` already overwrites the row.
    InsertIsUpsert,
}

pub trait Dialect: Send + Sync + 'static {
    type Cursor: CursorCodec + Default;

    fn name(&self) -> &'static str;

    /// Placeholder for the 1-based parameter `position`.
    fn placeholder(&self, position: usize) -> String;

    /// Whether booleans may be written as literals.
    fn inline_bools(&self) -> bool;

    fn upsert_style(&self) -> UpsertStyle;

    /// Whether page tokens come from the store itself rather than an offset.
    fn native_paging(&self) -> bool;

    fn cursor(&self) -> Self::Cursor {
        Self::Cursor::default()
    }

    /// Render a filter tree into a complete select statement.
    fn render_search(&self, query: &SearchQuery<'_>) -> StoreResult<Statement>;
}

/// PostgreSQL: numbered `$n` placeholders, offset paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    type Cursor = OffsetCursor;

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn inline_bools(&self) -> bool {
        true
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn native_paging(&self) -> bool {
        false
    }

    fn render_search(&self, query: &SearchQuery<'_>) -> StoreResult<Statement> {
        render_sql(self, query)
    }
}

/// CQL with a Lucene index per table: positional `?` placeholders, native paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cassandra;

impl Dialect for Cassandra {
    type Cursor = NativeCursor;

    fn name(&self) -> &'static str {
        "cassandra"
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn inline_bools(&self) -> bool {
        false
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::InsertIsUpsert
    }

    fn native_paging(&self) -> bool {
        true
    }

    fn render_search(&self, query: &SearchQuery<'_>) -> StoreResult<Statement> {
        render_lucene(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(Postgres.placeholder(3), "$3");
        assert_eq!(Cassandra.placeholder(3), "?");
    }

    #[test]
    fn test_bool_inlining() {
        assert!(Postgres.inline_bools());
        assert!(!Cassandra.inline_bools());
    }

    #[test]
    fn test_paging_style() {
        assert!(!Postgres.native_paging());
        assert!(Cassandra.native_paging());
    }
}
