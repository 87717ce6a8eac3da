//! # Catalog Store
//!
//! Backend-agnostic persistence and query translation for the tube catalog.
//! One core serves two stores: PostgreSQL (offset paging, SQL predicates) and
//! a column-family store with a Lucene index per table (native paging, JSON
//! filter documents).
//!
//! ## Pieces
//!
//! - [`Schema`]: column/key metadata derived once per [`Record`] type from its
//!   [`impl_record!`] description.
//! - [`build_upsert`] / [`build_upsert_batch`]: upserts rendered for a
//!   [`Dialect`]. Safe literals are inlined, everything else is bound.
//! - [`BatchExecutor`]: a single transaction on PostgreSQL, chunked unlogged
//!   batches on the columnar store.
//! - [`scan_into`]: result rows back into typed records.
//! - [`CursorCodec`]: `"{skip}|{last_id}"` and hex page tokens.
//! - [`SearchFilter`] → [`FilterTree`] → backend query text.
//!
//! ## Usage Example
//!
//! ```rust
//! use catalog_store::{
//!     build_upsert, impl_record, Postgres, Schema, SearchFilter, SearchTarget, UpsertOptions,
//! };
//!
//! #[derive(Debug, Default)]
//! struct Playlist {
//!     id: String,
//!     title: String,
//!     item_count: i32,
//! }
//!
//! impl_record!(Playlist => "playlist" {
//!     id: "id" [key],
//!     title: "title",
//!     item_count: "itemcount",
//! });
//!
//! let schema = Schema::derive::<Playlist>().unwrap();
//! let playlist = Playlist { id: "PL1".into(), title: "Mix".into(), item_count: 3 };
//! let stmt = build_upsert(&Postgres, &schema, &playlist, UpsertOptions::default()).unwrap();
//! assert_eq!(
//!     stmt.text,
//!     "insert into playlist(id,title,itemcount) values ($1,$2,3) \
//!      on conflict (id) do update set title=$3,itemcount=3"
//! );
//!
//! let filter = SearchFilter { q: Some("jazz".into()), ..Default::default() };
//! let tree = filter.to_filter_tree(SearchTarget::Playlist);
//! assert_eq!(tree.should().len(), 10);
//! ```

pub mod backend;
pub mod config;
pub mod cursor;
pub mod dialect;
mod error;
pub mod executor;
pub mod filter;
pub mod record;
pub mod row;
pub mod schema;
pub mod search;
pub mod session;
pub mod statement;
pub mod value;

pub use backend::{Backend, CqlBackend, Page, PageRequest, PgBackend};
pub use config::{create_pool, DatabaseConfig, StoreConfig, DEFAULT_CHUNK_SIZE};
pub use cursor::{CursorCodec, NativeCursor, OffsetCursor, OffsetState};
pub use dialect::{Cassandra, Dialect, Postgres, UpsertStyle};
pub use error::{SchemaError, StoreError, StoreResult};
pub use executor::{BatchExecutor, ChunkedBatchExecutor, PgBatchExecutor};
pub use filter::{FilterTree, FilterTreeBuilder, Predicate, SortField};
pub use record::Record;
pub use row::{map_rows, scan_into, FieldIndexTable, Row};
pub use schema::{Column, RecordMeta, Schema, SchemaRegistry};
pub use search::{
    build_projection, render_lucene, render_sql, text_query, validate_tree, DurationBucket,
    SearchFilter, SearchQuery, SearchTarget,
};
pub use session::{BatchEntry, CqlSession, PagedRows, UnloggedBatch};
pub use statement::{
    build_upsert, build_upsert_batch, select_by_ids, select_where_eq, ParamWriter, Statement,
    UpsertOptions,
};
pub use value::{
    format_timestamp, json_list_from_value, json_list_to_value, render_literal, FieldKind,
    FieldValue, ListElement, Value, TIMESTAMP_FORMAT,
};
