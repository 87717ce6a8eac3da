use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::models::DataCategory;

/// Source of video categories for a region, consulted when none are cached.
#[async_trait]
pub trait CategoryClient: Send + Sync {
    async fn get_categories(&self, region_code: &str) -> ServiceResult<Vec<DataCategory>>;
}

/// Serves a fixed list for every region.
#[derive(Debug, Clone, Default)]
pub struct StaticCategoryClient {
    categories: Vec<DataCategory>,
}

impl StaticCategoryClient {
    pub fn new(categories: Vec<DataCategory>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl CategoryClient for StaticCategoryClient {
    async fn get_categories(&self, _region_code: &str) -> ServiceResult<Vec<DataCategory>> {
        Ok(self.categories.clone())
    }
}
