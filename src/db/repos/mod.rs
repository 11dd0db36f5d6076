mod catalog_services;
mod organizations;
mod usage_logs;
mod users;

pub use catalog_services::*;
pub use organizations::*;
pub use usage_logs::*;
pub use users::*;
