use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::common::map_insert_error;
use crate::{
    db::{error::DbResult, repos::CatalogServiceRepo},
    models::{CatalogService, CreateCatalogService},
};

pub struct PostgresCatalogServiceRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresCatalogServiceRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_service(row: &PgRow) -> CatalogService {
        CatalogService {
            id: row.get("id"),
            name: row.get("name"),
            marketing_name: row.get("marketing_name"),
            description: row.get("description"),
            app_url: row.get("app_url"),
            icon_url: row.get("icon_url"),
            status: row.get("status"),
            version: row.get("version"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl CatalogServiceRepo for PostgresCatalogServiceRepo {
    async fn create(&self, input: CreateCatalogService) -> DbResult<CatalogService> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO services (
                id, name, marketing_name, description, app_url, icon_url, status, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, marketing_name, description, app_url, icon_url,
                      status, version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.marketing_name)
        .bind(&input.description)
        .bind(&input.app_url)
        .bind(&input.icon_url)
        .bind(&input.status)
        .bind(&input.version)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("Service named '{}'", input.name), &[]))?;

        Ok(Self::parse_service(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<CatalogService>> {
        let result = sqlx::query(
            r#"
            SELECT id, name, marketing_name, description, app_url, icon_url,
                   status, version, created_at, updated_at
            FROM services
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.as_ref().map(Self::parse_service))
    }
}
