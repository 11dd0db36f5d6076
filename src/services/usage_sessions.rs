use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{UsageError, UsageResult};
use crate::{
    db::DbPool,
    models::{CreateUsageLog, StartedSession, UsageDuration, UsageLog},
};

/// Opens, extends and closes usage sessions.
#[derive(Clone)]
pub struct UsageSessionService {
    db: Arc<DbPool>,
}

impl UsageSessionService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Open a new session for `user_id` on `service_id`.
    ///
    /// Every call creates a fresh log, even when the same user already has an
    /// open session on the same service.
    #[tracing::instrument(skip(self))]
    pub async fn start_session(
        &self,
        user_id: Uuid,
        service_id: Uuid,
    ) -> UsageResult<StartedSession> {
        let service = self
            .db
            .catalog_services()
            .get_by_id(service_id)
            .await?
            .ok_or(UsageError::NotFound)?;

        let log = self
            .db
            .usage_logs()
            .create(CreateUsageLog {
                user_id,
                service_id,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(log_id = %log.id, service = %service.name, "Usage session started");

        Ok(StartedSession {
            service,
            log_id: log.id,
        })
    }

    /// Add `delta_seconds` to a session's accumulated duration.
    #[tracing::instrument(skip(self))]
    pub async fn heartbeat(&self, log_id: Uuid, delta_seconds: i64) -> UsageResult<()> {
        let delta = UsageDuration::from_seconds(delta_seconds).ok_or_else(|| {
            UsageError::BadRequest(format!(
                "Heartbeat delta of {} seconds is out of range",
                delta_seconds
            ))
        })?;
        if delta.is_negative() {
            tracing::warn!(delta_seconds, "Negative heartbeat delta decreases session duration");
        }

        self.db.usage_logs().add_duration(log_id, delta).await?;
        tracing::debug!("Heartbeat recorded");
        Ok(())
    }

    /// Permanently delete a session.
    #[tracing::instrument(skip(self))]
    pub async fn remove_session(&self, log_id: Uuid) -> UsageResult<()> {
        if !self.db.usage_logs().delete(log_id).await? {
            return Err(UsageError::NotFound);
        }
        tracing::info!("Usage session removed");
        Ok(())
    }

    /// Hide a session from statistics while keeping the record.
    #[tracing::instrument(skip(self))]
    pub async fn archive_session(&self, log_id: Uuid) -> UsageResult<()> {
        if !self.db.usage_logs().soft_delete(log_id).await? {
            return Err(UsageError::NotFound);
        }
        tracing::info!("Usage session archived");
        Ok(())
    }

    /// Look up a session by id, archived or not.
    pub async fn get_session(&self, log_id: Uuid) -> UsageResult<UsageLog> {
        self.db
            .usage_logs()
            .get_by_id(log_id)
            .await?
            .ok_or(UsageError::NotFound)
    }
}
