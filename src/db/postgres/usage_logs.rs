use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use super::{common::map_insert_error, scope::push_scope};
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

/// SQLSTATE for numeric_value_out_of_range.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

pub struct PostgresUsageLogRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresUsageLogRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_log(row: &PgRow) -> UsageLog {
        UsageLog {
            id: row.get("id"),
            user_id: row.get("user_id"),
            service_id: row.get("service_id"),
            duration: UsageDuration::from_nanos(row.get("duration_ns")),
            created_at: row.get("created_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
}

#[async_trait]
impl UsageLogRepo for PostgresUsageLogRepo {
    async fn create(&self, input: CreateUsageLog) -> DbResult<UsageLog> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO usage_logs (id, user_id, service_id, duration_ns, created_at)
            VALUES ($1, $2, $3, 0, $4)
            RETURNING id, user_id, service_id, duration_ns, created_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(input.user_id)
        .bind(input.service_id)
        .bind(input.created_at)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| map_insert_error(e, "Usage log", &["user", "service"]))?;

        Ok(Self::parse_log(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<UsageLog>> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id, service_id, duration_ns, created_at, deleted_at
            FROM usage_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.as_ref().map(Self::parse_log))
    }

    async fn add_duration(&self, id: Uuid, delta: UsageDuration) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE usage_logs
            SET duration_ns = duration_ns + $1
            WHERE id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(delta.as_nanos())
        .bind(id)
        .execute(&self.write_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) =>
            {
                DbError::Validation("Accumulated duration would overflow".to_string())
            }
            _ => DbError::from(e),
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM usage_logs WHERE id = $1")
            .bind(id)
            .execute(&self.write_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE usage_logs SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.write_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_active_users(&self, scope: &UsageScope) -> DbResult<i64> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(DISTINCT ul.user_id)::BIGINT as count FROM usage_logs ul",
        );
        push_scope(&mut qb, scope);

        let row = qb.build().fetch_one(&self.read_pool).await?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn total_duration(&self, scope: &UsageScope) -> DbResult<UsageDuration> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COALESCE(SUM(ul.duration_ns), 0)::BIGINT as total FROM usage_logs ul",
        );
        push_scope(&mut qb, scope);

        let row = qb.build().fetch_one(&self.read_pool).await?;
        Ok(UsageDuration::from_nanos(row.get("total")))
    }

    async fn service_rollups(&self, scope: &UsageScope) -> DbResult<Vec<ServiceUsageRow>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                s.id as service_id,
                s.name as service_name,
                COUNT(DISTINCT ul.user_id)::BIGINT as total_users,
                COALESCE(SUM(ul.duration_ns), 0)::BIGINT as total_ns
            FROM usage_logs ul
            INNER JOIN services s ON s.id = ul.service_id
            "#,
        );
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY s.id, s.name ORDER BY s.name ASC");

        let rows = qb.build().fetch_all(&self.read_pool).await?;
        Ok(rows
            .iter()
            .map(|row| ServiceUsageRow {
                service_id: row.get("service_id"),
                service_name: row.get("service_name"),
                total_users: row.get("total_users"),
                total_duration: UsageDuration::from_nanos(row.get("total_ns")),
            })
            .collect())
    }

    async fn recent_activity(
        &self,
        scope: &UsageScope,
        limit: i64,
    ) -> DbResult<Vec<RecentActivityRow>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
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

        let rows = qb.build().fetch_all(&self.read_pool).await?;
        Ok(rows
            .iter()
            .map(|row| RecentActivityRow {
                id: row.get("id"),
                user_id: row.get("user_id"),
                user_email: row.get("user_email"),
                service_id: row.get("service_id"),
                service_name: row.get("service_name"),
                duration: UsageDuration::from_nanos(row.get("duration_ns")),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn service_usage_slots(&self, scope: &UsageScope) -> DbResult<Vec<ServiceUsageSlotRow>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            r#"
            SELECT
                (FLOOR(EXTRACT(EPOCH FROM ul.created_at) / {slot}) * {slot})::BIGINT as slot_epoch,
                s.name as service_name,
                COALESCE(SUM(ul.duration_ns), 0)::BIGINT as total_ns,
                COUNT(*)::BIGINT as access_count
            FROM usage_logs ul
            INNER JOIN services s ON s.id = ul.service_id
            "#,
            slot = TIME_SERIES_SLOT_SECONDS,
        ));
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY 1, s.name ORDER BY 1 ASC, s.name ASC");

        let rows = qb.build().fetch_all(&self.read_pool).await?;
        rows.iter()
            .map(|row| {
                let epoch: i64 = row.get("slot_epoch");
                let slot_start = DateTime::from_timestamp(epoch, 0).ok_or_else(|| {
                    DbError::Internal(format!("Time series slot out of range: {}", epoch))
                })?;
                Ok(ServiceUsageSlotRow {
                    slot_start,
                    service_name: row.get("service_name"),
                    total_duration: UsageDuration::from_nanos(row.get("total_ns")),
                    access_count: row.get("access_count"),
                })
            })
            .collect()
    }
}
