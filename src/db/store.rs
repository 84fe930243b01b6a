use async_trait::async_trait;

use crate::converter::ConvertedImage;
use crate::db::model::ImageRecord;
use crate::db::repo::{self, Pool};
use crate::error::StoreError;

/// Storage operations the conversion job depends on.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Images whose converted name is still unset.
    async fn fetch_pending_images(&self) -> Result<Vec<ImageRecord>, StoreError>;

    /// Record a converted file for one image; `NotFound` if no row matched.
    async fn apply_conversion_result(&self, converted: &ConvertedImage) -> Result<(), StoreError>;
}

/// `ImageStore` backed by the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteImageStore {
    pool: Pool,
}

impl SqliteImageStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn fetch_pending_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        repo::fetch_pending_images(&self.pool).await
    }

    async fn apply_conversion_result(&self, converted: &ConvertedImage) -> Result<(), StoreError> {
        repo::apply_conversion_result(&self.pool, converted).await
    }
}
