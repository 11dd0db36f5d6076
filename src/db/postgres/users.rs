use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::common::map_insert_error;
use crate::{
    db::{error::DbResult, repos::UserRepo},
    models::{CreateUser, User},
};

pub struct PostgresUserRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_user(row: &PgRow) -> User {
        User {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            email: row.get("email"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl UserRepo for PostgresUserRepo {
    async fn create(&self, input: CreateUser) -> DbResult<User> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, organization_id, email, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, email, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.organization_id)
        .bind(&input.email)
        .bind(&input.name)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                &format!("User with email '{}'", input.email),
                &["organization"],
            )
        })?;

        Ok(Self::parse_user(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let result = sqlx::query(
            r#"
            SELECT id, organization_id, email, name, created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.as_ref().map(Self::parse_user))
    }

    async fn count_org_members(&self, org_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*)::BIGINT as count FROM users WHERE organization_id = $1 AND deleted_at IS NULL",
        )
        .bind(org_id)
        .fetch_one(&self.read_pool)
        .await?;
        Ok(row.get::<i64, _>("count"))
    }
}
