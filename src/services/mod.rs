mod error;
#[cfg(all(test, feature = "database-sqlite"))]
mod test_support;
mod usage_sessions;
mod usage_statistics;

use std::sync::Arc;

pub use error::{UsageError, UsageResult};
pub use usage_sessions::UsageSessionService;
pub use usage_statistics::UsageStatisticsService;

use crate::{config::StatisticsConfig, db::DbPool};

/// Container for all engine services
#[derive(Clone)]
pub struct Services {
    pub sessions: UsageSessionService,
    pub statistics: UsageStatisticsService,
}

impl Services {
    pub fn new(db: Arc<DbPool>, statistics: &StatisticsConfig) -> Self {
        Self {
            sessions: UsageSessionService::new(db.clone()),
            statistics: UsageStatisticsService::new(db, statistics),
        }
    }
}
