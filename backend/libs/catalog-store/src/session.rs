//! The columnar driver as seen by the engine.
//!
//! No CQL driver is linked into this crate; deployments plug theirs in by
//! implementing [`CqlSession`].

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::row::Row;
use crate::statement::Statement;

/// One statement inside an unlogged batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub statement: Statement,
    /// Safe for the driver to retry
    pub idempotent: bool,
}

/// An unlogged (non-atomic) batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnloggedBatch {
    pub entries: Vec<BatchEntry>,
}

impl UnloggedBatch {
    /// Batch of idempotent upserts.
    pub fn idempotent(statements: &[Statement]) -> Self {
        Self {
            entries: statements
                .iter()
                .map(|statement| BatchEntry {
                    statement: statement.clone(),
                    idempotent: true,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A page read with the driver's native paging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagedRows {
    pub rows: Vec<Row>,
    /// Opaque state for the next page; empty when exhausted
    pub paging_state: Vec<u8>,
}

#[async_trait]
pub trait CqlSession: Send + Sync + 'static {
    async fn execute(&self, statement: &Statement) -> StoreResult<()>;

    async fn query(&self, statement: &Statement) -> StoreResult<Vec<Row>>;

    async fn query_paged(
        &self,
        statement: &Statement,
        paging_state: &[u8],
        page_size: usize,
    ) -> StoreResult<PagedRows>;

    async fn execute_batch(&self, batch: &UnloggedBatch) -> StoreResult<()>;
}
