use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CatalogService, ReportTimeZone, UsageDuration};

/// One usage session: a single user's use of a single catalog service.
///
/// `duration` only ever grows through relative increments. A log with
/// `deleted_at` set is archived and invisible to statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub duration: UsageDuration,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UsageLog {
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CreateUsageLog {
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of starting a session: the service as it looked at start time and
/// the id of the new log.
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub service: CatalogService,
    pub log_id: Uuid,
}

// ==================== Store rows ====================
// Flat aggregation results as returned by the store, still in nanoseconds.

#[derive(Debug, Clone)]
pub struct ServiceUsageRow {
    pub service_id: Uuid,
    pub service_name: String,
    pub total_users: i64,
    pub total_duration: UsageDuration,
}

#[derive(Debug, Clone)]
pub struct RecentActivityRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub service_id: Uuid,
    pub service_name: String,
    pub duration: UsageDuration,
    pub created_at: DateTime<Utc>,
}

/// Width of the UTC slots the time series is grouped into by the store.
///
/// Every zone offset in use is a multiple of 15 minutes, so a slot never
/// straddles a local midnight and maps to exactly one calendar day.
pub const TIME_SERIES_SLOT_SECONDS: i64 = 15 * 60;

#[derive(Debug, Clone)]
pub struct ServiceUsageSlotRow {
    /// Start of the UTC slot
    pub slot_start: DateTime<Utc>,
    pub service_name: String,
    pub total_duration: UsageDuration,
    pub access_count: i64,
}

// ==================== Report ====================

/// Aggregated usage statistics for a scope. Derived on demand, never stored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageStatisticsReport {
    /// Distinct users with at least one log in scope
    pub total_users: i64,
    /// All users of the scoped organization, active or not (0 without an organization filter)
    pub total_org_users: i64,
    /// Seconds, truncated
    pub total_duration: i64,
    pub service_stats: Vec<ServiceUsageStats>,
    /// Most recent first
    pub recent_activity: Vec<RecentActivityItem>,
    /// Sorted by date ascending
    pub time_series_data: Vec<TimeSeriesDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceUsageStats {
    pub service_id: Uuid,
    pub service_name: String,
    pub total_users: i64,
    pub total_seconds: i64,
    /// Seconds per distinct user
    pub avg_duration: f64,
}

impl From<ServiceUsageRow> for ServiceUsageStats {
    fn from(row: ServiceUsageRow) -> Self {
        let total_seconds = row.total_duration.whole_seconds();
        let avg_duration = if row.total_users > 0 {
            total_seconds as f64 / row.total_users as f64
        } else {
            0.0
        };
        Self {
            service_id: row.service_id,
            service_name: row.service_name,
            total_users: row.total_users,
            total_seconds,
            avg_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentActivityItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub service_id: Uuid,
    pub service_name: String,
    /// Seconds, with fractional part
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

impl From<RecentActivityRow> for RecentActivityItem {
    fn from(row: RecentActivityRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_email: row.user_email,
            service_id: row.service_id,
            service_name: row.service_name,
            duration: row.duration.as_secs_f64(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesDataPoint {
    pub date: NaiveDate,
    /// Keyed by service name
    pub services: BTreeMap<String, TimeSeriesService>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSeriesService {
    pub total_seconds: i64,
    pub access_count: i64,
}

/// Fold (slot, service) rows into one point per calendar date in `zone`.
///
/// All slots of a day for the same service are summed before flooring.
pub fn fold_time_series(
    rows: impl IntoIterator<Item = ServiceUsageSlotRow>,
    zone: &ReportTimeZone,
) -> Vec<TimeSeriesDataPoint> {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, (UsageDuration, i64)>> = BTreeMap::new();

    for row in rows {
        let bucket = by_date
            .entry(zone.date_of(row.slot_start))
            .or_default()
            .entry(row.service_name)
            .or_insert((UsageDuration::ZERO, 0));
        bucket.0 = UsageDuration::from_nanos(bucket.0.as_nanos() + row.total_duration.as_nanos());
        bucket.1 += row.access_count;
    }

    by_date
        .into_iter()
        .map(|(date, services)| TimeSeriesDataPoint {
            date,
            services: services
                .into_iter()
                .map(|(name, (duration, access_count))| {
                    (
                        name,
                        TimeSeriesService {
                            total_seconds: duration.floor_seconds(),
                            access_count,
                        },
                    )
                })
                .collect(),
        })
        .collect()
}
