use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateUser, User},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, input: CreateUser) -> DbResult<User>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>>;
    /// Number of non-deleted users on the organization's roster, regardless
    /// of whether they have ever logged usage.
    async fn count_org_members(&self, org_id: Uuid) -> DbResult<i64>;
}
