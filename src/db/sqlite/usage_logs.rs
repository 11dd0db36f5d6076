use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::{
    common::{map_insert_error, parse_uuid},
    scope::push_scope,
};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UsageLogRepo,
    },
    models::{
        CreateUsageLog, RecentActivityRow, ServiceUsageRow, ServiceUsageSlotRow,
        TIME_SERIES_SLOT_SECONDS, UsageDuration, UsageLog, UsageScope,
    },
};

pub struct SqliteUsageLogRepo {
    pool: SqlitePool,
}

impl SqliteUsageLogRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_log(row: &SqliteRow) -> DbResult<UsageLog> {
        Ok(UsageLog {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            service_id: parse_uuid(&row.get::<String, _>("service_id"))?,
            duration: UsageDuration::from_nanos(row.get("duration_ns")),
            created_at: row.get("created_at"),
            deleted_at: row.get("deleted_at"),
        })
    }

    async fn is_live(&self, id: Uuid) -> DbResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM usage_logs WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }
}

#[async_trait]
impl UsageLogRepo for SqliteUsageLogRepo {
    async fn create(&self, input: CreateUsageLog) -> DbResult<UsageLog> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO usage_logs (id, user_id, service_id, duration_ns, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.user_id.to_string())
        .bind(input.service_id.to_string())
        .bind(input.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Usage log", Some("user or service")))?;

        Ok(UsageLog {
            id,
            user_id: input.user_id,
            service_id: input.service_id,
            duration: UsageDuration::ZERO,
            created_at: input.created_at,
            deleted_at: None,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<UsageLog>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, service_id, duration_ns, created_at, deleted_at
            FROM usage_logs
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_log).transpose()
    }

    async fn add_duration(&self, id: Uuid, delta: UsageDuration) -> DbResult<()> {
        let nanos = delta.as_nanos();

        // SQLite silently promotes an overflowing integer sum to REAL, so the
        // bound is checked in the same statement as the increment.
        let (guard, limit) = if nanos >= 0 {
            ("duration_ns <= ?", i64::MAX - nanos)
        } else {
            ("duration_ns >= ?", i64::MIN - nanos)
        };

        let result = sqlx::query(&format!(
            r#"
            UPDATE usage_logs
            SET duration_ns = duration_ns + ?
            WHERE id = ? AND deleted_at IS NULL AND {guard}
            "#
        ))
        .bind(nanos)
        .bind(id.to_string())
        .bind(limit)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        if self.is_live(id).await? {
            return Err(DbError::Validation(
                "Accumulated duration would overflow".to_string(),
            ));
        }
        Err(DbError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM usage_logs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE usage_logs SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_active_users(&self, scope: &UsageScope) -> DbResult<i64> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(DISTINCT ul.user_id) as count FROM usage_logs ul");
        push_scope(&mut qb, scope);

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn total_duration(&self, scope: &UsageScope) -> DbResult<UsageDuration> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COALESCE(SUM(ul.duration_ns), 0) as total FROM usage_logs ul");
        push_scope(&mut qb, scope);

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(UsageDuration::from_nanos(row.get("total")))
    }

    async fn service_rollups(&self, scope: &UsageScope) -> DbResult<Vec<ServiceUsageRow>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                s.id as service_id,
                s.name as service_name,
                COUNT(DISTINCT ul.user_id) as total_users,
                COALESCE(SUM(ul.duration_ns), 0) as total_ns
            FROM usage_logs ul
            INNER JOIN services s ON s.id = ul.service_id
            "#,
        );
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY s.id, s.name ORDER BY s.name ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(ServiceUsageRow {
                    service_id: parse_uuid(&row.get::<String, _>("service_id"))?,
                    service_name: row.get("service_name"),
                    total_users: row.get("total_users"),
                    total_duration: UsageDuration::from_nanos(row.get("total_ns")),
                })
            })
            .collect()
    }

    async fn recent_activity(
        &self,
        scope: &UsageScope,
        limit: i64,
    ) -> DbResult<Vec<RecentActivityRow>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                ul.id, ul.user_id, u.email as user_email,
                ul.service_id, s.name as service_name,
                ul.duration_ns, ul.created_at
            FROM usage_logs ul
            INNER JOIN users u ON u.id = ul.user_id
            INNER JOIN services s ON s.id = ul.service_id
            "#,
        );
        push_scope(&mut qb, scope);
        qb.push(" ORDER BY ul.created_at DESC, ul.id DESC LIMIT ")
            .push_bind(limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(RecentActivityRow {
                    id: parse_uuid(&row.get::<String, _>("id"))?,
                    user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
                    user_email: row.get("user_email"),
                    service_id: parse_uuid(&row.get::<String, _>("service_id"))?,
                    service_name: row.get("service_name"),
                    duration: UsageDuration::from_nanos(row.get("duration_ns")),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn service_usage_slots(&self, scope: &UsageScope) -> DbResult<Vec<ServiceUsageSlotRow>> {
        // strftime('%s') normalizes the stored offset to epoch seconds
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            r#"
            SELECT
                CAST(strftime('%s', ul.created_at) AS INTEGER) / {slot} * {slot} as slot_epoch,
                s.name as service_name,
                COALESCE(SUM(ul.duration_ns), 0) as total_ns,
                COUNT(*) as access_count
            FROM usage_logs ul
            INNER JOIN services s ON s.id = ul.service_id
            "#,
            slot = TIME_SERIES_SLOT_SECONDS,
        ));
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY slot_epoch, s.name ORDER BY slot_epoch ASC, s.name ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(ServiceUsageSlotRow {
                    slot_start: slot_start(row.get("slot_epoch"))?,
                    service_name: row.get("service_name"),
                    total_duration: UsageDuration::from_nanos(row.get("total_ns")),
                    access_count: row.get("access_count"),
                })
            })
            .collect()
    }
}

fn slot_start(epoch: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp(epoch, 0)
        .ok_or_else(|| DbError::Internal(format!("Time series slot out of range: {}", epoch)))
}
