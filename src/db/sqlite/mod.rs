mod catalog_services;
mod common;
mod organizations;
mod scope;
mod usage_logs;
mod users;

pub use catalog_services::SqliteCatalogServiceRepo;
pub use organizations::SqliteOrganizationRepo;
pub use usage_logs::SqliteUsageLogRepo;
pub use users::SqliteUserRepo;
