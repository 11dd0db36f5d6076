//! In-memory SQLite fixture shared by the engine tests.

use std::{path::Path, sync::Arc};

use chrono_tz::Tz;
use uuid::Uuid;

use super::{UsageSessionService, UsageStatisticsService};
use crate::{
    config::StatisticsConfig,
    db::{
        DbPool,
        tests::harness::{migrated_file_db, migrated_sqlite_pool},
    },
    models::{CatalogService, CreateCatalogService, CreateOrganization, CreateUser},
};

pub struct Fixture {
    pub db: Arc<DbPool>,
    pub sessions: UsageSessionService,
    pub statistics: UsageStatisticsService,
    /// Organization that [`Fixture::user`] adds members to.
    pub org_id: Uuid,
}

impl Fixture {
    /// Reports in UTC so calendar days do not depend on the host zone.
    pub async fn new() -> Self {
        Self::with_config(StatisticsConfig {
            timezone: Some(Tz::UTC),
            ..Default::default()
        })
        .await
    }

    pub async fn with_recent_activity_limit(limit: u32) -> Self {
        Self::with_config(StatisticsConfig {
            recent_activity_limit: limit,
            timezone: Some(Tz::UTC),
        })
        .await
    }

    pub async fn with_config(config: StatisticsConfig) -> Self {
        let db = DbPool::from_sqlite(migrated_sqlite_pool().await);
        Self::on(db, config).await
    }

    /// Fixture over a WAL database file in `dir` with a multi-connection pool,
    /// so concurrent writes really interleave.
    pub async fn file_backed(dir: &Path) -> Self {
        Self::on(
            migrated_file_db(dir).await,
            StatisticsConfig {
                timezone: Some(Tz::UTC),
                ..Default::default()
            },
        )
        .await
    }

    async fn on(db: DbPool, config: StatisticsConfig) -> Self {
        let db = Arc::new(db);

        let org_id = db
            .organizations()
            .create(CreateOrganization {
                slug: "acme".to_string(),
                name: "Acme".to_string(),
            })
            .await
            .expect("Failed to create fixture org")
            .id;

        Self {
            sessions: UsageSessionService::new(db.clone()),
            statistics: UsageStatisticsService::new(db.clone(), &config),
            db,
            org_id,
        }
    }

    pub async fn org(&self, slug: &str) -> Uuid {
        self.db
            .organizations()
            .create(CreateOrganization {
                slug: slug.to_string(),
                name: slug.to_string(),
            })
            .await
            .expect("Failed to create org")
            .id
    }

    pub async fn user(&self, email: &str) -> Uuid {
        self.user_in(self.org_id, email).await
    }

    pub async fn user_in(&self, org_id: Uuid, email: &str) -> Uuid {
        self.db
            .users()
            .create(CreateUser {
                organization_id: org_id,
                email: email.to_string(),
                name: None,
            })
            .await
            .expect("Failed to create user")
            .id
    }

    pub async fn service(&self, name: &str) -> CatalogService {
        self.db
            .catalog_services()
            .create(CreateCatalogService {
                name: name.to_string(),
                marketing_name: format!("{} for Teams", name),
                description: format!("The {} service", name),
                app_url: format!("https://{}.example.com", name),
                icon_url: Some(format!("https://cdn.example.com/{}.svg", name)),
                status: "active".to_string(),
                version: "2.1.0".to_string(),
            })
            .await
            .expect("Failed to create service")
    }

    /// Create a user and a service and open one session between them.
    pub async fn started_session(&self, email: &str, service_name: &str) -> Uuid {
        let user = self.user(email).await;
        let service = self.service(service_name).await;
        self.sessions
            .start_session(user, service.id)
            .await
            .expect("Failed to start session")
            .log_id
    }
}
