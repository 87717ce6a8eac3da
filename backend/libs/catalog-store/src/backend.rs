//! Storage backends: statement execution, row retrieval and paging.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column as _, PgPool, Row as _, TypeInfo as _};
use tracing::debug;

use crate::config::StoreConfig;
use crate::cursor::{CursorCodec, NativeCursor, OffsetCursor, OffsetState};
use crate::dialect::{Cassandra, Dialect, Postgres};
use crate::error::{StoreError, StoreResult};
use crate::executor::{bind_params, BatchExecutor, ChunkedBatchExecutor, PgBatchExecutor};
use crate::row::{FieldIndexTable, Row};
use crate::session::CqlSession;
use crate::statement::Statement;
use crate::value::Value;

/// Which page of a query to read.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Token from the previous page, `""` for the first
    pub token: &'a str,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// `""` when there are no more pages
    pub next_token: String,
}

#[async_trait]
pub trait Backend: Send + Sync {
    type Dialect: Dialect;

    fn dialect(&self) -> &Self::Dialect;

    /// Execute a single write; returns the rows affected.
    async fn execute(&self, statement: &Statement) -> StoreResult<u64>;

    /// Run a query and return every row. `fields` limits which columns are
    /// decoded.
    async fn query(&self, statement: &Statement, fields: &FieldIndexTable) -> StoreResult<Vec<Row>>;

    async fn query_page(
        &self,
        statement: &Statement,
        fields: &FieldIndexTable,
        page: PageRequest<'_>,
    ) -> StoreResult<Page>;

    async fn execute_all(&self, statements: &[Statement]) -> StoreResult<u64>;
}

/// PostgreSQL via sqlx.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
    dialect: Postgres,
    executor: PgBatchExecutor,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self {
            executor: PgBatchExecutor::new(pool.clone()),
            pool,
            dialect: Postgres,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(
        &self,
        text: &str,
        params: &[Value],
        fields: &FieldIndexTable,
    ) -> StoreResult<Vec<Row>> {
        let rows = bind_params(sqlx::query(text), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| decode_row(row, fields)).collect()
    }
}

fn decode_row(row: &PgRow, fields: &FieldIndexTable) -> StoreResult<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let name = column.name();
        if !fields.contains(name) {
            continue;
        }
        let value = decode_column(row, column.ordinal(), column.type_info().name(), name)?;
        decoded.push(name, value);
    }
    Ok(decoded)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str, name: &str) -> StoreResult<Value> {
    let value = match type_name {
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.map(Value::Text)
        }
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| Value::Int(i64::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| Value::Int(i64::from(v))),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::Int),
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(Value::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|naive| Value::Timestamp(Utc.from_utc_datetime(&naive))),
        "TEXT[]" | "VARCHAR[]" => row
            .try_get::<Option<Vec<String>>, _>(index)?
            .map(Value::TextList),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(Value::Json),
        other => {
            return Err(StoreError::Conversion {
                column: name.to_string(),
                expected: "supported column type",
                found: other.to_string(),
            })
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

#[async_trait]
impl Backend for PgBackend {
    type Dialect = Postgres;

    fn dialect(&self) -> &Postgres {
        &self.dialect
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<u64> {
        let done = bind_params(sqlx::query(&statement.text), &statement.params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    async fn query(&self, statement: &Statement, fields: &FieldIndexTable) -> StoreResult<Vec<Row>> {
        self.fetch(&statement.text, &statement.params, fields).await
    }

    async fn query_page(
        &self,
        statement: &Statement,
        fields: &FieldIndexTable,
        page: PageRequest<'_>,
    ) -> StoreResult<Page> {
        let cursor = OffsetCursor;
        let state = cursor.decode(page.token)?;
        let text = format!(
            "{} limit {} offset {}",
            statement.text, page.size, state.skip
        );
        let rows = self.fetch(&text, &statement.params, fields).await?;

        let last_id = rows
            .last()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_text)
            .map(str::to_string);
        let next_token = cursor.encode(
            &OffsetState {
                skip: state.skip,
                last_id,
            },
            rows.len(),
            page.size,
        );

        debug!(rows = rows.len(), skip = state.skip, "Read offset page");
        Ok(Page { rows, next_token })
    }

    async fn execute_all(&self, statements: &[Statement]) -> StoreResult<u64> {
        self.executor.execute_all(statements).await
    }
}

/// Column-family store behind a [`CqlSession`].
pub struct CqlBackend<S> {
    session: Arc<S>,
    dialect: Cassandra,
    executor: ChunkedBatchExecutor<S>,
}

impl<S: CqlSession> CqlBackend<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self {
            executor: ChunkedBatchExecutor::new(session.clone()),
            session,
            dialect: Cassandra,
        }
    }

    /// Backend tuned by `config` (batch chunk size).
    pub fn from_config(session: Arc<S>, config: &StoreConfig) -> Self {
        Self::new(session).with_chunk_size(config.batch_chunk_size)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.executor = self.executor.with_chunk_size(chunk_size);
        self
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }
}

#[async_trait]
impl<S: CqlSession> Backend for CqlBackend<S> {
    type Dialect = Cassandra;

    fn dialect(&self) -> &Cassandra {
        &self.dialect
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<u64> {
        self.session.execute(statement).await?;
        Ok(1)
    }

    async fn query(&self, statement: &Statement, _fields: &FieldIndexTable) -> StoreResult<Vec<Row>> {
        self.session.query(statement).await
    }

    async fn query_page(
        &self,
        statement: &Statement,
        _fields: &FieldIndexTable,
        page: PageRequest<'_>,
    ) -> StoreResult<Page> {
        let cursor = NativeCursor;
        let state = cursor.decode(page.token)?;
        let paged = self
            .session
            .query_paged(statement, &state, page.size)
            .await?;
        let next_token = cursor.encode(&paged.paging_state, paged.rows.len(), page.size);

        debug!(rows = paged.rows.len(), "Read native page");
        Ok(Page {
            rows: paged.rows,
            next_token,
        })
    }

    async fn execute_all(&self, statements: &[Statement]) -> StoreResult<u64> {
        self.executor.execute_all(statements).await
    }
}
