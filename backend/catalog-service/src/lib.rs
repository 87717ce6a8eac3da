//! # Catalog Service
//!
//! Channel, playlist, video and category reads plus the sync-side writes,
//! running on either catalog backend through [`catalog_store::Backend`].

pub mod category;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use category::{CategoryClient, StaticCategoryClient};
pub use config::{BackendKind, CatalogConfig};
pub use error::{ServiceError, ServiceResult};
pub use models::{
    catalog_registry, Categories, Channel, ChannelSync, DataCategory, ListResult, PageParams,
    Playlist, PlaylistVideoIndex, SearchItem, Video,
};
pub use service::CatalogService;
pub use store::{run_migrations, CatalogStore};
pub use sync::SyncRepository;
