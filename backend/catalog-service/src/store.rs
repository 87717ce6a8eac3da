//! Typed reads and writes shared by the catalog service and the sync repository.

use std::sync::Arc;

use catalog_store::{
    build_projection, build_upsert, build_upsert_batch, map_rows, select_by_ids,
    select_where_eq, Backend, Dialect, FilterTree, PageRequest, Record, RecordMeta,
    SchemaRegistry, SearchQuery, Statement, StoreConfig, UpsertOptions, Value,
};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::ServiceResult;
use crate::models::{catalog_registry, ListResult, PageParams};

/// Create the catalog tables on PostgreSQL.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running catalog migrations");
    sqlx::migrate!("./migrations").run(pool).await
}

/// A backend plus the derived schemas of every catalog record.
pub struct CatalogStore<B> {
    backend: Arc<B>,
    registry: Arc<SchemaRegistry>,
    config: StoreConfig,
}

impl<B> Clone for CatalogStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            registry: self.registry.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: Backend> CatalogStore<B> {
    pub fn new(backend: Arc<B>, config: StoreConfig) -> ServiceResult<Self> {
        Ok(Self {
            backend,
            registry: Arc::new(catalog_registry()?),
            config,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn meta<R: Record>(&self) -> ServiceResult<&RecordMeta> {
        Ok(self.registry.get::<R>()?)
    }

    pub async fn fetch<R: Record>(&self, statement: &Statement) -> ServiceResult<Vec<R>> {
        let meta = self.meta::<R>()?;
        let rows = self.backend.query(statement, &meta.fields).await?;
        Ok(map_rows(rows, &meta.fields)?)
    }

    pub async fn find_one<R: Record>(&self, id: &str, fields: &[String]) -> ServiceResult<Option<R>> {
        let meta = self.meta::<R>()?;
        let projection = build_projection(&meta.fields, fields, &["id"])?;
        let statement = select_where_eq(
            self.backend.dialect(),
            meta.schema.table(),
            &projection,
            "id",
            Value::Text(id.to_string()),
        );
        Ok(self.fetch::<R>(&statement).await?.into_iter().next())
    }

    pub async fn find_many<R: Record>(&self, ids: &[String], fields: &[String]) -> ServiceResult<Vec<R>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let meta = self.meta::<R>()?;
        let projection = build_projection(&meta.fields, fields, &["id"])?;
        let statement = select_by_ids(self.backend.dialect(), meta.schema.table(), &projection, ids);
        self.fetch::<R>(&statement).await
    }

    /// One page of `R` matching `tree`.
    ///
    /// Columns the tree filters or sorts on are added to a non-empty
    /// projection so the index can evaluate them.
    pub async fn search<R: Record>(
        &self,
        tree: &FilterTree,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<R>> {
        let meta = self.meta::<R>()?;
        let required: Vec<&str> = std::iter::once("id")
            .chain(tree.referenced_fields())
            .collect();
        let projection = build_projection(&meta.fields, fields, &required)?;
        let statement = self.backend.dialect().render_search(&SearchQuery {
            table: meta.schema.table(),
            fields: &meta.fields,
            projection: &projection,
            tree,
        })?;

        let limit = self.config.page_size(page.max);
        let result = self
            .backend
            .query_page(
                &statement,
                &meta.fields,
                PageRequest {
                    token: &page.next_page_token,
                    size: limit,
                },
            )
            .await?;
        let list = map_rows(result.rows, &meta.fields)?;
        debug!(table = meta.schema.table(), rows = list.len(), "Search page");
        Ok(ListResult::new(list, limit, result.next_token))
    }

    pub async fn upsert<R: Record>(&self, record: &R) -> ServiceResult<u64> {
        let meta = self.meta::<R>()?;
        let statement = build_upsert(
            self.backend.dialect(),
            &meta.schema,
            record,
            UpsertOptions::default(),
        )?;
        Ok(self.backend.execute(&statement).await?)
    }

    pub async fn upsert_all<R: Record>(&self, records: &[R]) -> ServiceResult<u64> {
        let meta = self.meta::<R>()?;
        let statements = build_upsert_batch(
            self.backend.dialect(),
            &meta.schema,
            records,
            UpsertOptions::default(),
        )?;
        Ok(self.backend.execute_all(&statements).await?)
    }
}
