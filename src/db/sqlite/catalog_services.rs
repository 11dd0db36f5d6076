use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{map_insert_error, parse_uuid};
use crate::{
    db::{error::DbResult, repos::CatalogServiceRepo},
    models::{CatalogService, CreateCatalogService},
};

pub struct SqliteCatalogServiceRepo {
    pool: SqlitePool,
}

impl SqliteCatalogServiceRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_service(row: &SqliteRow) -> DbResult<CatalogService> {
        Ok(CatalogService {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            name: row.get("name"),
            marketing_name: row.get("marketing_name"),
            description: row.get("description"),
            app_url: row.get("app_url"),
            icon_url: row.get("icon_url"),
            status: row.get("status"),
            version: row.get("version"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl CatalogServiceRepo for SqliteCatalogServiceRepo {
    async fn create(&self, input: CreateCatalogService) -> DbResult<CatalogService> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO services (
                id, name, marketing_name, description, app_url, icon_url,
                status, version, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.name)
        .bind(&input.marketing_name)
        .bind(&input.description)
        .bind(&input.app_url)
        .bind(&input.icon_url)
        .bind(&input.status)
        .bind(&input.version)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("Service named '{}'", input.name), None))?;

        Ok(CatalogService {
            id,
            name: input.name,
            marketing_name: input.marketing_name,
            description: input.description,
            app_url: input.app_url,
            icon_url: input.icon_url,
            status: input.status,
            version: input.version,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<CatalogService>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, marketing_name, description, app_url, icon_url,
                   status, version, created_at, updated_at
            FROM services
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_service).transpose()
    }
}
