//! Upsert and lookup statements rendered from typed records.

use tracing::debug;

use crate::dialect::{Dialect, UpsertStyle};
use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::schema::{Column, Schema};
use crate::value::{render_literal, Value};

/// Query text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(text: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertOptions {
    /// List absent fields as `null` in the insert instead of leaving them out.
    /// The conflict update always clears them.
    pub explicit_nulls: bool,
}

/// Collects bound parameters and hands out strictly increasing placeholders.
pub struct ParamWriter<'d, D: Dialect> {
    dialect: &'d D,
    params: Vec<Value>,
}

impl<'d, D: Dialect> ParamWriter<'d, D> {
    pub fn new(dialect: &'d D) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Bind `value` unconditionally.
    pub fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    /// Inline `value` when it renders as a literal, bind it otherwise.
    pub fn column_value(&mut self, column: &Column, value: Value) -> String {
        match render_literal(self.dialect, column, &value) {
            Some(literal) => literal,
            None => self.bind(value),
        }
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Render an upsert of `record`.
pub fn build_upsert<D: Dialect, R: Record>(
    dialect: &D,
    schema: &Schema,
    record: &R,
    options: UpsertOptions,
) -> StoreResult<Statement> {
    schema.ensure_record::<R>()?;

    let mut writer = ParamWriter::new(dialect);
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for column in schema.columns().iter().filter(|c| c.insert || c.key) {
        if column.version {
            columns.push(column.name.as_str());
            values.push("1".to_string());
            continue;
        }
        let value = record.get(column.field);
        if value.is_null() && !options.explicit_nulls {
            continue;
        }
        columns.push(column.name.as_str());
        values.push(writer.column_value(column, value));
    }

    let mut text = format!(
        "insert into {}({}) values ({})",
        schema.table(),
        columns.join(","),
        values.join(",")
    );

    if dialect.upsert_style() == UpsertStyle::OnConflict {
        let mut updates = Vec::new();
        for column in schema
            .columns()
            .iter()
            .filter(|c| c.update && !c.key && !c.version)
        {
            // absent fields still clear the stored value
            let value = record.get(column.field);
            updates.push(format!(
                "{}={}",
                column.name,
                writer.column_value(column, value)
            ));
        }
        let keys: Vec<&str> = schema.keys().map(|c| c.name.as_str()).collect();
        if updates.is_empty() {
            text.push_str(&format!(" on conflict ({}) do nothing", keys.join(",")));
        } else {
            text.push_str(&format!(
                " on conflict ({}) do update set {}",
                keys.join(","),
                updates.join(",")
            ));
        }
    }

    Ok(Statement {
        text,
        params: writer.into_params(),
    })
}

/// Render one upsert per record, in input order.
pub fn build_upsert_batch<D: Dialect, R: Record>(
    dialect: &D,
    schema: &Schema,
    records: &[R],
    options: UpsertOptions,
) -> StoreResult<Vec<Statement>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    if schema.record() != R::NAME {
        return Err(StoreError::BatchInput(format!(
            "schema for `{}` cannot build `{}` records",
            schema.record(),
            R::NAME
        )));
    }

    let statements = records
        .iter()
        .map(|record| build_upsert(dialect, schema, record, options))
        .collect::<StoreResult<Vec<_>>>()?;

    debug!(
        table = schema.table(),
        dialect = dialect.name(),
        statements = statements.len(),
        "Built upsert batch"
    );
    Ok(statements)
}

/// `select {projection} from {table} where {column} = ?`
pub fn select_where_eq<D: Dialect>(
    dialect: &D,
    table: &str,
    projection: &str,
    column: &str,
    value: Value,
) -> Statement {
    let mut writer = ParamWriter::new(dialect);
    let placeholder = writer.bind(value);
    Statement {
        text: format!(
            "select {} from {} where {} = {}",
            projection, table, column, placeholder
        ),
        params: writer.into_params(),
    }
}

/// `select {projection} from {table} where id in (...)`
pub fn select_by_ids<D: Dialect>(
    dialect: &D,
    table: &str,
    projection: &str,
    ids: &[String],
) -> Statement {
    let mut writer = ParamWriter::new(dialect);
    let placeholders = ids
        .iter()
        .map(|id| writer.bind(Value::Text(id.clone())))
        .collect::<Vec<_>>();
    Statement {
        text: format!(
            "select {} from {} where id in ({})",
            projection,
            table,
            placeholders.join(",")
        ),
        params: writer.into_params(),
    }
}
