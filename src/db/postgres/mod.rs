mod catalog_services;
mod common;
mod organizations;
mod scope;
mod usage_logs;
mod users;

pub use catalog_services::PostgresCatalogServiceRepo;
pub use organizations::PostgresOrganizationRepo;
pub use usage_logs::PostgresUsageLogRepo;
pub use users::PostgresUserRepo;
