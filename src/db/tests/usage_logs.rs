//! Shared tests for UsageLogRepo implementations
//!
//! Tests take a context holding every repo a usage log depends on, so fixtures
//! (organizations, users, services) are created through the same backend.

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use uuid::Uuid;

use crate::{
    db::{
        error::DbError,
        repos::{CatalogServiceRepo, OrganizationRepo, UsageLogRepo, UserRepo},
    },
    models::{
        CreateCatalogService, CreateOrganization, CreateUsageLog, CreateUser, ReportTimeZone,
        UsageDuration, UsageFilter, UsageScope, fold_time_series,
    },
};

// ============================================================================
// Test Context
// ============================================================================

pub struct UsageLogTestContext<'a> {
    pub usage_repo: &'a dyn UsageLogRepo,
    pub org_repo: &'a dyn OrganizationRepo,
    pub user_repo: &'a dyn UserRepo,
    pub service_repo: &'a dyn CatalogServiceRepo,
}

impl UsageLogTestContext<'_> {
    pub async fn create_test_org(&self, slug: &str) -> Uuid {
        self.org_repo
            .create(CreateOrganization {
                slug: slug.to_string(),
                name: format!("Org {}", slug),
            })
            .await
            .expect("Failed to create test org")
            .id
    }

    pub async fn create_test_user(&self, org_id: Uuid, email: &str) -> Uuid {
        self.user_repo
            .create(CreateUser {
                organization_id: org_id,
                email: email.to_string(),
                name: None,
            })
            .await
            .expect("Failed to create test user")
            .id
    }

    pub async fn create_test_service(&self, name: &str) -> Uuid {
        self.service_repo
            .create(CreateCatalogService {
                name: name.to_string(),
                marketing_name: name.to_uppercase(),
                description: String::new(),
                app_url: format!("https://{}.example.com", name),
                icon_url: None,
                status: "active".to_string(),
                version: "1.0".to_string(),
            })
            .await
            .expect("Failed to create test service")
            .id
    }

    pub async fn create_log_at(
        &self,
        user_id: Uuid,
        service_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        self.usage_repo
            .create(CreateUsageLog {
                user_id,
                service_id,
                created_at,
            })
            .await
            .expect("Failed to create usage log")
            .id
    }

    pub async fn create_log_with_seconds(
        &self,
        user_id: Uuid,
        service_id: Uuid,
        created_at: DateTime<Utc>,
        seconds: i64,
    ) -> Uuid {
        let id = self.create_log_at(user_id, service_id, created_at).await;
        self.usage_repo
            .add_duration(id, secs(seconds))
            .await
            .expect("Failed to add duration");
        id
    }
}

// ============================================================================
// Test Input Helpers
// ============================================================================

fn secs(seconds: i64) -> UsageDuration {
    UsageDuration::from_seconds(seconds).expect("seconds fit in nanos")
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
}

fn scope(filter: UsageFilter) -> UsageScope {
    scope_in(filter, &ReportTimeZone::UTC)
}

fn scope_in(filter: UsageFilter, zone: &ReportTimeZone) -> UsageScope {
    UsageScope::resolve(&filter, zone).expect("valid filter")
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

pub async fn test_create_starts_at_zero(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;

    let id = ctx.create_log_at(user, service, at(1, 9)).await;
    let log = ctx
        .usage_repo
        .get_by_id(id)
        .await
        .expect("Failed to get log")
        .expect("Log should exist");

    assert_eq!(log.user_id, user);
    assert_eq!(log.service_id, service);
    assert_eq!(log.duration, UsageDuration::ZERO);
    assert_eq!(log.created_at, at(1, 9));
    assert!(!log.is_archived());
}

pub async fn test_create_with_unknown_user_fails(ctx: &UsageLogTestContext<'_>) {
    let service = ctx.create_test_service("maps").await;
    let result = ctx
        .usage_repo
        .create(CreateUsageLog {
            user_id: Uuid::new_v4(),
            service_id: service,
            created_at: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(DbError::Validation(_))));
}

pub async fn test_add_duration_accumulates(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_at(user, service, at(1, 9)).await;

    ctx.usage_repo.add_duration(id, secs(30)).await.unwrap();
    ctx.usage_repo.add_duration(id, secs(45)).await.unwrap();

    let log = ctx.usage_repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(log.duration, secs(75));
}

pub async fn test_add_duration_zero_is_noop(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_with_seconds(user, service, at(1, 9), 10).await;

    ctx.usage_repo
        .add_duration(id, UsageDuration::ZERO)
        .await
        .expect("Zero delta should succeed");

    let log = ctx.usage_repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(log.duration, secs(10));
}

pub async fn test_add_duration_not_found(ctx: &UsageLogTestContext<'_>) {
    let result = ctx.usage_repo.add_duration(Uuid::new_v4(), secs(5)).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_add_duration_to_archived_log_fails(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_with_seconds(user, service, at(1, 9), 10).await;

    assert!(ctx.usage_repo.soft_delete(id).await.unwrap());
    let result = ctx.usage_repo.add_duration(id, secs(5)).await;
    assert!(matches!(result, Err(DbError::NotFound)));

    let log = ctx.usage_repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(log.duration, secs(10));
}

pub async fn test_add_duration_overflow_is_rejected(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_at(user, service, at(1, 9)).await;

    ctx.usage_repo
        .add_duration(id, UsageDuration::from_nanos(i64::MAX - 1))
        .await
        .unwrap();
    let result = ctx
        .usage_repo
        .add_duration(id, UsageDuration::from_nanos(2))
        .await;
    assert!(matches!(result, Err(DbError::Validation(_))));

    let log = ctx.usage_repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(log.duration.as_nanos(), i64::MAX - 1);
}

pub async fn test_concurrent_add_duration_loses_no_updates(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_at(user, service, at(1, 9)).await;

    let results = join_all((0..20).map(|_| ctx.usage_repo.add_duration(id, secs(1)))).await;
    assert!(results.iter().all(Result::is_ok));

    let log = ctx.usage_repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(log.duration, secs(20));
}

pub async fn test_delete_removes_log(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_with_seconds(user, service, at(1, 9), 10).await;

    assert!(ctx.usage_repo.delete(id).await.unwrap());
    assert!(ctx.usage_repo.get_by_id(id).await.unwrap().is_none());
    assert!(!ctx.usage_repo.delete(id).await.unwrap());
}

pub async fn test_soft_delete_keeps_row(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let user = ctx.create_test_user(org, "alice@example.com").await;
    let service = ctx.create_test_service("maps").await;
    let id = ctx.create_log_with_seconds(user, service, at(1, 9), 10).await;

    assert!(ctx.usage_repo.soft_delete(id).await.unwrap());
    assert!(!ctx.usage_repo.soft_delete(id).await.unwrap());

    let log = ctx.usage_repo.get_by_id(id).await.unwrap().unwrap();
    assert!(log.is_archived());
}

// ============================================================================
// Aggregate Tests
// ============================================================================

pub async fn test_aggregates_empty(ctx: &UsageLogTestContext<'_>) {
    let all = UsageScope::all();
    assert_eq!(ctx.usage_repo.count_active_users(&all).await.unwrap(), 0);
    assert_eq!(
        ctx.usage_repo.total_duration(&all).await.unwrap(),
        UsageDuration::ZERO
    );
    assert!(ctx.usage_repo.service_rollups(&all).await.unwrap().is_empty());
    assert!(
        ctx.usage_repo
            .recent_activity(&all, 10)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        ctx.usage_repo
            .service_usage_slots(&all)
            .await
            .unwrap()
            .is_empty()
    );
}

pub async fn test_aggregates_scoped_to_organization(ctx: &UsageLogTestContext<'_>) {
    let acme = ctx.create_test_org("acme").await;
    let globex = ctx.create_test_org("globex").await;
    let alice = ctx.create_test_user(acme, "alice@acme.com").await;
    let bob = ctx.create_test_user(acme, "bob@acme.com").await;
    let carol = ctx.create_test_user(globex, "carol@globex.com").await;
    let maps = ctx.create_test_service("maps").await;

    ctx.create_log_with_seconds(alice, maps, at(1, 9), 10).await;
    ctx.create_log_with_seconds(alice, maps, at(1, 10), 5).await;
    ctx.create_log_with_seconds(bob, maps, at(2, 9), 20).await;
    ctx.create_log_with_seconds(carol, maps, at(2, 9), 100).await;

    let acme_scope = scope(UsageFilter::for_organization(acme));
    assert_eq!(
        ctx.usage_repo.count_active_users(&acme_scope).await.unwrap(),
        2
    );
    assert_eq!(
        ctx.usage_repo.total_duration(&acme_scope).await.unwrap(),
        secs(35)
    );

    let all = UsageScope::all();
    assert_eq!(ctx.usage_repo.count_active_users(&all).await.unwrap(), 3);
    assert_eq!(
        ctx.usage_repo.total_duration(&all).await.unwrap(),
        secs(135)
    );
}

pub async fn test_aggregates_exclude_archived_logs(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let alice = ctx.create_test_user(org, "alice@acme.com").await;
    let bob = ctx.create_test_user(org, "bob@acme.com").await;
    let maps = ctx.create_test_service("maps").await;

    ctx.create_log_with_seconds(alice, maps, at(1, 9), 10).await;
    let archived = ctx.create_log_with_seconds(bob, maps, at(1, 10), 50).await;
    ctx.usage_repo.soft_delete(archived).await.unwrap();

    let all = UsageScope::all();
    assert_eq!(ctx.usage_repo.count_active_users(&all).await.unwrap(), 1);
    assert_eq!(ctx.usage_repo.total_duration(&all).await.unwrap(), secs(10));

    let rollups = ctx.usage_repo.service_rollups(&all).await.unwrap();
    assert_eq!(rollups.len(), 1);
    assert_eq!(rollups[0].total_users, 1);
    assert_eq!(rollups[0].total_duration, secs(10));

    let recent = ctx.usage_repo.recent_activity(&all, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_ne!(recent[0].id, archived);

    let slots = ctx.usage_repo.service_usage_slots(&all).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].access_count, 1);
}

pub async fn test_service_rollups(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let alice = ctx.create_test_user(org, "alice@acme.com").await;
    let bob = ctx.create_test_user(org, "bob@acme.com").await;
    let maps = ctx.create_test_service("maps").await;
    let mail = ctx.create_test_service("mail").await;

    ctx.create_log_with_seconds(alice, maps, at(1, 9), 10).await;
    ctx.create_log_with_seconds(alice, maps, at(1, 10), 20).await;
    ctx.create_log_with_seconds(bob, maps, at(1, 11), 30).await;
    ctx.create_log_with_seconds(bob, mail, at(1, 12), 7).await;

    let all = UsageScope::all();
    let rollups = ctx.usage_repo.service_rollups(&all).await.unwrap();

    // Ordered by service name
    assert_eq!(rollups.len(), 2);
    assert_eq!(rollups[0].service_name, "mail");
    assert_eq!(rollups[0].service_id, mail);
    assert_eq!(rollups[0].total_users, 1);
    assert_eq!(rollups[0].total_duration, secs(7));
    assert_eq!(rollups[1].service_name, "maps");
    assert_eq!(rollups[1].total_users, 2);
    assert_eq!(rollups[1].total_duration, secs(60));

    let per_service: i64 = rollups.iter().map(|r| r.total_duration.as_nanos()).sum();
    let total = ctx.usage_repo.total_duration(&all).await.unwrap();
    assert_eq!(per_service, total.as_nanos());
}

pub async fn test_recent_activity_newest_first_with_limit(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let alice = ctx.create_test_user(org, "alice@acme.com").await;
    let maps = ctx.create_test_service("maps").await;

    let oldest = ctx.create_log_with_seconds(alice, maps, at(1, 9), 1).await;
    let middle = ctx.create_log_with_seconds(alice, maps, at(2, 9), 2).await;
    let newest = ctx.create_log_with_seconds(alice, maps, at(3, 9), 3).await;

    let all = UsageScope::all();
    let recent = ctx.usage_repo.recent_activity(&all, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, newest);
    assert_eq!(recent[1].id, middle);
    assert_eq!(recent[0].user_email, "alice@acme.com");
    assert_eq!(recent[0].service_name, "maps");
    assert_eq!(recent[0].duration, secs(3));
    assert_eq!(recent[0].created_at, at(3, 9));

    let recent = ctx.usage_repo.recent_activity(&all, 10).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[2].id, oldest);
}

pub async fn test_service_usage_slots(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let alice = ctx.create_test_user(org, "alice@acme.com").await;
    let bob = ctx.create_test_user(org, "bob@acme.com").await;
    let maps = ctx.create_test_service("maps").await;
    let mail = ctx.create_test_service("mail").await;

    let nine_oh_five = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).unwrap();
    ctx.create_log_with_seconds(alice, maps, at(1, 9), 10).await;
    ctx.create_log_with_seconds(bob, maps, nine_oh_five, 15).await;
    ctx.create_log_with_seconds(alice, mail, at(1, 9), 4).await;
    ctx.create_log_with_seconds(alice, maps, at(1, 23), 8).await;

    let rows = ctx
        .usage_repo
        .service_usage_slots(&UsageScope::all())
        .await
        .unwrap();

    // 09:00 and 09:05 share a slot
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].slot_start, at(1, 9));
    assert_eq!(rows[0].service_name, "mail");
    assert_eq!(rows[0].access_count, 1);
    assert_eq!(rows[1].slot_start, at(1, 9));
    assert_eq!(rows[1].service_name, "maps");
    assert_eq!(rows[1].total_duration, secs(25));
    assert_eq!(rows[1].access_count, 2);
    assert_eq!(rows[2].slot_start, at(1, 23));
    assert_eq!(rows[2].total_duration, secs(8));
}

pub async fn test_time_series_days_follow_zone(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let alice = ctx.create_test_user(org, "alice@acme.com").await;
    let maps = ctx.create_test_service("maps").await;

    ctx.create_log_with_seconds(alice, maps, at(9, 12), 3).await;
    // 22:00 on the 9th in Sao Paulo, already the 10th in UTC
    ctx.create_log_with_seconds(alice, maps, at(10, 1), 5).await;

    let sao_paulo = ReportTimeZone::parse("America/Sao_Paulo").unwrap();
    let ninth = scope_in(
        UsageFilter::default()
            .with_start_date("2025-03-09")
            .with_end_date("2025-03-09"),
        &sao_paulo,
    );
    assert_eq!(ctx.usage_repo.total_duration(&ninth).await.unwrap(), secs(8));

    let slots = ctx.usage_repo.service_usage_slots(&ninth).await.unwrap();
    let points = fold_time_series(slots, &sao_paulo);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].date, at(9, 0).date_naive());
    assert_eq!(points[0].services["maps"].total_seconds, 8);

    let utc_points = fold_time_series(
        ctx.usage_repo
            .service_usage_slots(&UsageScope::all())
            .await
            .unwrap(),
        &ReportTimeZone::UTC,
    );
    assert_eq!(utc_points.len(), 2);
}

pub async fn test_date_bounds_are_inclusive(ctx: &UsageLogTestContext<'_>) {
    let org = ctx.create_test_org("acme").await;
    let alice = ctx.create_test_user(org, "alice@acme.com").await;
    let maps = ctx.create_test_service("maps").await;

    ctx.create_log_with_seconds(alice, maps, at(9, 23), 1).await;
    // Exactly midnight on the start date
    ctx.create_log_with_seconds(alice, maps, at(10, 0), 2).await;
    ctx.create_log_with_seconds(alice, maps, at(11, 23), 4).await;
    ctx.create_log_with_seconds(alice, maps, at(12, 0), 8).await;

    let window = scope(
        UsageFilter::default()
            .with_start_date("2025-03-10")
            .with_end_date("2025-03-11"),
    );
    assert_eq!(
        ctx.usage_repo.total_duration(&window).await.unwrap(),
        secs(6)
    );

    let from_only = scope(UsageFilter::default().with_start_date("2025-03-10"));
    assert_eq!(
        ctx.usage_repo.total_duration(&from_only).await.unwrap(),
        secs(14)
    );

    let until_instant = scope(UsageFilter::default().with_end_date("2025-03-10T00:00:00Z"));
    assert_eq!(
        ctx.usage_repo.total_duration(&until_instant).await.unwrap(),
        secs(3)
    );
}

// ============================================================================
// SQLite Tests
// ============================================================================

#[cfg(feature = "database-sqlite")]
mod sqlite_tests {
    use super::UsageLogTestContext;
    use crate::db::{
        sqlite::{
            SqliteCatalogServiceRepo, SqliteOrganizationRepo, SqliteUsageLogRepo, SqliteUserRepo,
        },
        tests::harness::migrated_sqlite_pool,
    };

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let pool = migrated_sqlite_pool().await;
                let usage_repo = SqliteUsageLogRepo::new(pool.clone());
                let org_repo = SqliteOrganizationRepo::new(pool.clone());
                let user_repo = SqliteUserRepo::new(pool.clone());
                let service_repo = SqliteCatalogServiceRepo::new(pool);
                let ctx = UsageLogTestContext {
                    usage_repo: &usage_repo,
                    org_repo: &org_repo,
                    user_repo: &user_repo,
                    service_repo: &service_repo,
                };
                super::$name(&ctx).await;
            }
        };
    }

    // Lifecycle
    sqlite_test!(test_create_starts_at_zero);
    sqlite_test!(test_create_with_unknown_user_fails);
    sqlite_test!(test_add_duration_accumulates);
    sqlite_test!(test_add_duration_zero_is_noop);
    sqlite_test!(test_add_duration_not_found);
    sqlite_test!(test_add_duration_to_archived_log_fails);
    sqlite_test!(test_add_duration_overflow_is_rejected);
    sqlite_test!(test_concurrent_add_duration_loses_no_updates);
    sqlite_test!(test_delete_removes_log);
    sqlite_test!(test_soft_delete_keeps_row);

    // Aggregates
    sqlite_test!(test_aggregates_empty);
    sqlite_test!(test_aggregates_scoped_to_organization);
    sqlite_test!(test_aggregates_exclude_archived_logs);
    sqlite_test!(test_service_rollups);
    sqlite_test!(test_recent_activity_newest_first_with_limit);
    sqlite_test!(test_service_usage_slots);
    sqlite_test!(test_time_series_days_follow_zone);
    sqlite_test!(test_date_bounds_are_inclusive);
}

// ============================================================================
// PostgreSQL Tests
// ============================================================================

#[cfg(feature = "database-postgres")]
mod postgres_tests {
    use super::UsageLogTestContext;
    use crate::db::{
        postgres::{
            PostgresCatalogServiceRepo, PostgresOrganizationRepo, PostgresUsageLogRepo,
            PostgresUserRepo,
        },
        tests::harness::postgres::migrated_postgres_pool,
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = migrated_postgres_pool().await;
                let usage_repo = PostgresUsageLogRepo::new(pool.clone(), None);
                let org_repo = PostgresOrganizationRepo::new(pool.clone(), None);
                let user_repo = PostgresUserRepo::new(pool.clone(), None);
                let service_repo = PostgresCatalogServiceRepo::new(pool, None);
                let ctx = UsageLogTestContext {
                    usage_repo: &usage_repo,
                    org_repo: &org_repo,
                    user_repo: &user_repo,
                    service_repo: &service_repo,
                };
                super::$name(&ctx).await;
            }
        };
    }

    // Lifecycle
    postgres_test!(test_create_starts_at_zero);
    postgres_test!(test_create_with_unknown_user_fails);
    postgres_test!(test_add_duration_accumulates);
    postgres_test!(test_add_duration_zero_is_noop);
    postgres_test!(test_add_duration_not_found);
    postgres_test!(test_add_duration_to_archived_log_fails);
    postgres_test!(test_add_duration_overflow_is_rejected);
    postgres_test!(test_concurrent_add_duration_loses_no_updates);
    postgres_test!(test_delete_removes_log);
    postgres_test!(test_soft_delete_keeps_row);

    // Aggregates
    postgres_test!(test_aggregates_empty);
    postgres_test!(test_aggregates_scoped_to_organization);
    postgres_test!(test_aggregates_exclude_archived_logs);
    postgres_test!(test_service_rollups);
    postgres_test!(test_recent_activity_newest_first_with_limit);
    postgres_test!(test_service_usage_slots);
    postgres_test!(test_time_series_days_follow_zone);
    postgres_test!(test_date_bounds_are_inclusive);
}
