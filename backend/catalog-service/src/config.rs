use catalog_store::{DatabaseConfig, StoreConfig};
use serde::Deserialize;
use std::fmt;

use crate::error::{ServiceError, ServiceResult};

/// Which store the catalog reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Postgres,
    Cassandra,
}

#[derive(Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub catalog_backend: BackendKind,
    /// Region used for category lookups when the caller names none
    #[serde(default = "default_region")]
    pub catalog_default_region: String,
    #[serde(default)]
    pub catalog_log_json: bool,
    #[serde(skip)]
    pub store: StoreConfig,
}

fn default_region() -> String {
    "US".to_string()
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("database_url", &"[REDACTED]")
            .field("catalog_backend", &self.catalog_backend)
            .field("catalog_default_region", &self.catalog_default_region)
            .field("catalog_log_json", &self.catalog_log_json)
            .field("store", &self.store)
            .finish()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            catalog_backend: BackendKind::default(),
            catalog_default_region: default_region(),
            catalog_log_json: false,
            store: StoreConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();

        let mut config: CatalogConfig =
            envy::from_env().map_err(|e| ServiceError::Config(e.to_string()))?;
        config.store = StoreConfig::from_env();
        Ok(config)
    }

    /// Pool settings for the relational backend.
    pub fn database(&self) -> ServiceResult<DatabaseConfig> {
        if self.database_url.trim().is_empty() {
            return Err(ServiceError::Config(
                "DATABASE_URL environment variable not set".to_string(),
            ));
        }
        Ok(DatabaseConfig::with_url(self.database_url.clone()))
    }
}
