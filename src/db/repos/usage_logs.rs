use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{
        CreateUsageLog, RecentActivityRow, ServiceUsageRow, ServiceUsageSlotRow, UsageDuration,
        UsageLog, UsageScope,
    },
};

/// Storage for usage logs and the aggregate queries over them.
///
/// Every aggregate takes the same [`UsageScope`] and excludes soft-deleted
/// logs, so facets computed for one request describe the same population.
#[async_trait]
pub trait UsageLogRepo: Send + Sync {
    /// Insert a new log with zero duration.
    ///
    /// Returns [`DbError::Validation`](crate::db::DbError::Validation) when the
    /// user or service does not exist.
    async fn create(&self, input: CreateUsageLog) -> DbResult<UsageLog>;

    /// Fetch a log by id, including archived logs.
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<UsageLog>>;

    /// Atomically add `delta` to a log's stored duration.
    ///
    /// The increment is a single relative update so concurrent heartbeats on
    /// the same log never lose writes. Returns
    /// [`DbError::NotFound`](crate::db::DbError::NotFound) when the log does
    /// not exist or is archived.
    async fn add_duration(&self, id: Uuid, delta: UsageDuration) -> DbResult<()>;

    /// Permanently remove a log. Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> DbResult<bool>;

    /// Mark a log as archived. Returns whether a live row was archived.
    async fn soft_delete(&self, id: Uuid) -> DbResult<bool>;

    /// Distinct users with at least one log in scope.
    async fn count_active_users(&self, scope: &UsageScope) -> DbResult<i64>;

    /// Sum of stored durations in scope.
    async fn total_duration(&self, scope: &UsageScope) -> DbResult<UsageDuration>;

    /// One row per service with logs in scope, ordered by service name.
    async fn service_rollups(&self, scope: &UsageScope) -> DbResult<Vec<ServiceUsageRow>>;

    /// Most recent logs in scope, newest first.
    async fn recent_activity(
        &self,
        scope: &UsageScope,
        limit: i64,
    ) -> DbResult<Vec<RecentActivityRow>>;

    /// One row per ([`TIME_SERIES_SLOT_SECONDS`] UTC slot, service name) pair
    /// with logs in scope, ordered by slot then service name. Calendar days
    /// are assigned by the caller, which knows the reporting zone.
    ///
    /// [`TIME_SERIES_SLOT_SECONDS`]: crate::models::TIME_SERIES_SLOT_SECONDS
    async fn service_usage_slots(&self, scope: &UsageScope)
    -> DbResult<Vec<ServiceUsageSlotRow>>;
}
