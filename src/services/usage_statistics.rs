use std::sync::Arc;

use super::UsageResult;
use crate::{
    config::StatisticsConfig,
    db::DbPool,
    models::{ReportTimeZone, UsageFilter, UsageScope, UsageStatisticsReport, fold_time_series},
};

/// Builds usage statistics reports.
#[derive(Clone)]
pub struct UsageStatisticsService {
    db: Arc<DbPool>,
    recent_activity_limit: i64,
    zone: ReportTimeZone,
}

impl UsageStatisticsService {
    pub fn new(db: Arc<DbPool>, config: &StatisticsConfig) -> Self {
        Self {
            db,
            recent_activity_limit: i64::from(config.recent_activity_limit),
            zone: config.report_time_zone(),
        }
    }

    /// Resolve `filter` and compute a report over it.
    ///
    /// Date-only bounds are calendar days in the configured zone. Malformed
    /// dates are rejected before any query runs.
    #[tracing::instrument(skip(self))]
    pub async fn compute_statistics(
        &self,
        filter: &UsageFilter,
    ) -> UsageResult<UsageStatisticsReport> {
        let scope = UsageScope::resolve(filter, &self.zone)?;
        self.compute(&scope).await
    }

    /// Compute every facet of the report under one scope.
    ///
    /// Facets run concurrently and share no snapshot. The first failure
    /// aborts the whole report.
    pub async fn compute(&self, scope: &UsageScope) -> UsageResult<UsageStatisticsReport> {
        let logs = self.db.usage_logs();
        let users = self.db.users();

        let roster = async {
            match scope.organization_id {
                Some(org_id) => users.count_org_members(org_id).await,
                None => Ok(0),
            }
        };

        let (total_users, total_org_users, total_duration, services, recent, slots) = tokio::try_join!(
            logs.count_active_users(scope),
            roster,
            logs.total_duration(scope),
            logs.service_rollups(scope),
            logs.recent_activity(scope, self.recent_activity_limit),
            logs.service_usage_slots(scope),
        )?;

        let time_series_data = fold_time_series(slots, &self.zone);

        tracing::debug!(
            total_users,
            services = services.len(),
            days = time_series_data.len(),
            zone = %self.zone,
            "Usage statistics computed"
        );

        Ok(UsageStatisticsReport {
            total_users,
            total_org_users,
            total_duration: total_duration.whole_seconds(),
            service_stats: services.into_iter().map(Into::into).collect(),
            recent_activity: recent.into_iter().map(Into::into).collect(),
            time_series_data,
        })
    }
}
