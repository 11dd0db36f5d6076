use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CatalogService, CreateCatalogService},
};

#[async_trait]
pub trait CatalogServiceRepo: Send + Sync {
    async fn create(&self, input: CreateCatalogService) -> DbResult<CatalogService>;
    /// Excludes soft-deleted services.
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<CatalogService>>;
}
