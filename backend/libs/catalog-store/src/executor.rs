//! Batch execution.
//!
//! The relational executor runs every statement inside one transaction and
//! commits nothing on failure. The columnar executor sends fixed-size unlogged
//! batches that commit independently, so a failure leaves earlier chunks
//! applied; `succeeded` in the error reports how many.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{StoreError, StoreResult};
use crate::session::{CqlSession, UnloggedBatch};
use crate::statement::Statement;
use crate::value::Value;

#[async_trait]
pub trait BatchExecutor: Send + Sync {
    /// Execute `statements` in order; returns the rows affected.
    async fn execute_all(&self, statements: &[Statement]) -> StoreResult<u64>;
}

/// Bind statement parameters onto a sqlx query in placeholder order.
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, sqlx::Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, sqlx::Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Text(s) => query.bind(s.clone()),
            Value::Int(i) => query.bind(*i),
            Value::Bool(b) => query.bind(*b),
            Value::Timestamp(ts) => query.bind::<DateTime<Utc>>(*ts),
            Value::TextList(items) => query.bind(items.clone()),
            Value::Json(json) => query.bind(sqlx::types::Json(json.clone())),
        };
    }
    query
}

/// All-or-nothing execution inside a single transaction.
#[derive(Clone)]
pub struct PgBatchExecutor {
    pool: PgPool,
}

impl PgBatchExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchExecutor for PgBatchExecutor {
    async fn execute_all(&self, statements: &[Statement]) -> StoreResult<u64> {
        if statements.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for (index, statement) in statements.iter().enumerate() {
            let result = bind_params(sqlx::query(&statement.text), &statement.params)
                .execute(&mut *tx)
                .await;
            match result {
                Ok(done) => affected += done.rows_affected(),
                Err(e) => {
                    let succeeded = index as u64;
                    warn!(succeeded, error = %e, "Batch statement failed, rolling back");
                    return Err(match tx.rollback().await {
                        Ok(()) => StoreError::BatchExecution {
                            succeeded,
                            source: Box::new(e.into()),
                        },
                        Err(rollback) => StoreError::RollbackFailed {
                            succeeded,
                            statement: Box::new(e.into()),
                            rollback: Box::new(rollback.into()),
                        },
                    });
                }
            }
        }
        tx.commit().await?;

        debug!(statements = statements.len(), affected, "Batch committed");
        Ok(affected)
    }
}

/// Fixed-size unlogged batches against a columnar session.
pub struct ChunkedBatchExecutor<S> {
    session: Arc<S>,
    chunk_size: usize,
}

impl<S: CqlSession> ChunkedBatchExecutor<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[async_trait]
impl<S: CqlSession> BatchExecutor for ChunkedBatchExecutor<S> {
    async fn execute_all(&self, statements: &[Statement]) -> StoreResult<u64> {
        let mut applied = 0u64;
        for (chunk_index, chunk) in statements.chunks(self.chunk_size).enumerate() {
            let batch = UnloggedBatch::idempotent(chunk);
            if let Err(e) = self.session.execute_batch(&batch).await {
                warn!(
                    chunk = chunk_index,
                    succeeded = applied,
                    error = %e,
                    "Unlogged batch failed, skipping remaining chunks"
                );
                return Err(StoreError::BatchExecution {
                    succeeded: applied,
                    source: Box::new(e),
                });
            }
            applied += chunk.len() as u64;
            debug!(chunk = chunk_index, size = chunk.len(), "Unlogged batch applied");
        }
        Ok(applied)
    }
}
