use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{map_insert_error, parse_uuid};
use crate::{
    db::{error::DbResult, repos::UserRepo},
    models::{CreateUser, User},
};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_user(row: &SqliteRow) -> DbResult<User> {
        Ok(User {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            organization_id: parse_uuid(&row.get::<String, _>("organization_id"))?,
            email: row.get("email"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, input: CreateUser) -> DbResult<User> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, organization_id, email, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.organization_id.to_string())
        .bind(&input.email)
        .bind(&input.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                &format!("User with email '{}'", input.email),
                Some("organization"),
            )
        })?;

        Ok(User {
            id,
            organization_id: input.organization_id,
            email: input.email,
            name: input.name,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, email, name, created_at, updated_at
            FROM users
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_user).transpose()
    }

    async fn count_org_members(&self, org_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM users WHERE organization_id = ? AND deleted_at IS NULL",
        )
        .bind(org_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count"))
    }
}
