use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::common::map_insert_error;
use crate::{
    db::{error::DbResult, repos::OrganizationRepo},
    models::{CreateOrganization, Organization},
};

pub struct PostgresOrganizationRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresOrganizationRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_organization(row: &PgRow) -> Organization {
        Organization {
            id: row.get("id"),
            slug: row.get("slug"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl OrganizationRepo for PostgresOrganizationRepo {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization> {
        let row = sqlx::query(
            r#"
            INSERT INTO organizations (id, slug, name)
            VALUES ($1, $2, $3)
            RETURNING id, slug, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.slug)
        .bind(&input.name)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| {
            map_insert_error(e, &format!("Organization with slug '{}'", input.slug), &[])
        })?;

        Ok(Self::parse_organization(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Organization>> {
        let row = sqlx::query(
            "SELECT id, slug, name, created_at, updated_at FROM organizations WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_organization))
    }
}
