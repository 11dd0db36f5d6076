use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{map_insert_error, parse_uuid};
use crate::{
    db::{error::DbResult, repos::OrganizationRepo},
    models::{CreateOrganization, Organization},
};

pub struct SqliteOrganizationRepo {
    pool: SqlitePool,
}

impl SqliteOrganizationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_organization(row: &SqliteRow) -> DbResult<Organization> {
        Ok(Organization {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            slug: row.get("slug"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl OrganizationRepo for SqliteOrganizationRepo {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO organizations (id, slug, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&input.slug)
        .bind(&input.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                &format!("Organization with slug '{}'", input.slug),
                None,
            )
        })?;

        Ok(Organization {
            id,
            slug: input.slug,
            name: input.name,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Organization>> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, name, created_at, updated_at
            FROM organizations
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_organization).transpose()
    }
}
