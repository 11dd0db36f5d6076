use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateOrganization, Organization},
};

/// Organizations are referential data here: usage statistics only need to
/// resolve a roster through them.
#[async_trait]
pub trait OrganizationRepo: Send + Sync {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Organization>>;
}
