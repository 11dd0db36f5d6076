use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::ReportTimeZone;

/// Largest accepted `recent_activity_limit`.
pub const MAX_RECENT_ACTIVITY_LIMIT: u32 = 100;

/// Statistics report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct StatisticsConfig {
    /// Number of entries in the recent-activity feed.
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: u32,

    /// IANA zone (e.g. `Europe/Berlin`) whose calendar days date-only filters
    /// and the time series use. Defaults to the server's local zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "json-schema", schemars(with = "Option<String>"))]
    pub timezone: Option<Tz>,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            recent_activity_limit: default_recent_activity_limit(),
            timezone: None,
        }
    }
}

impl StatisticsConfig {
    pub fn report_time_zone(&self) -> ReportTimeZone {
        self.timezone.map_or(ReportTimeZone::Local, ReportTimeZone::Named)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_RECENT_ACTIVITY_LIMIT).contains(&self.recent_activity_limit) {
            return Err(ConfigError::Validation(format!(
                "statistics.recent_activity_limit must be between 1 and {}, got {}",
                MAX_RECENT_ACTIVITY_LIMIT, self.recent_activity_limit
            )));
        }
        Ok(())
    }
}

fn default_recent_activity_limit() -> u32 {
    10
}
